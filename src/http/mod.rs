//! JSON-over-HTTP boundary for the family tree

pub mod handler;
pub mod server;

pub use handler::{ApiError, SharedFamily};
pub use server::{router, HttpServer};
