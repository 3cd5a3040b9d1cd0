//! Playback queue.
//!
//! [`PlaybackQueue`] holds the active playlist, the current track and the
//! playing/shuffle/repeat flags. Navigation wraps around the playlist in
//! both directions. Enabling shuffle draws one random permutation of the
//! playlist which stays stable until the flag flips again or the playlist
//! is replaced, so "previous" retraces the shuffled order instead of
//! re-rolling it.
//!
//! The queue is pure state; actual audio output is the embedding shell's
//! job, driven by the emitted playback events.

pub mod queue;

pub use queue::PlaybackQueue;
