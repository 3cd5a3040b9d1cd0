//! Workspace umbrella crate.
//!
//! Host applications can depend on `ssc-workspace` with the default
//! `desktop-shims` feature and get the fully wired desktop service, or
//! depend on the individual crates (`core-service`, `core-auth`, ...) and
//! assemble their own stack.

#[cfg(feature = "desktop-shims")]
pub use core_service::{bootstrap_desktop, MusicService};
