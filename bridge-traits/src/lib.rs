//! Platform abstraction traits for the streaming service core.
//!
//! Host applications provide implementations of these ports (HTTP transport,
//! durable key/value storage) so the core crates stay platform-agnostic and
//! fully testable with in-memory fakes.

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::LocalStore;
