//! Desktop bridge implementations.
//!
//! Provides native implementations of the `bridge-traits` ports:
//! - `ReqwestHttpClient`: HTTP transport via reqwest
//! - `SqliteLocalStore`: durable key/value storage via SQLite

pub mod http;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use storage::SqliteLocalStore;
