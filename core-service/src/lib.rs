//! Service facade.
//!
//! [`MusicService`] wires the individual core crates together behind one
//! entry point: it builds the shared event bus and backend connector from
//! a validated [`CoreConfig`](core_runtime::config::CoreConfig), owns the
//! session manager, favorites synchronizer, catalog state and playback
//! queue, and sequences the cross-component flows (login reloads
//! favorites, logout clears them first).
//!
//! With the `desktop-shims` feature enabled, [`bootstrap_desktop`] builds
//! a ready-to-run service on top of the SQLite store and reqwest client
//! from `bridge-desktop`.

pub mod service;

pub use service::MusicService;

#[cfg(feature = "desktop-shims")]
pub use service::bootstrap_desktop;
