//! # redactlog-core
//!
//! The handler contract shared by redactlog middleware and the servers that
//! host it: a [`Request`] whose body can be read and replayed, a writer-style
//! [`ResponseWriter`], the [`Handler`] trait, and a hyper adapter.
//!
//! Most users want the `redactlog` crate, which builds the logging middleware
//! on top of these types.

mod error;
mod handler;
mod request;
mod response;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use error::{BoxError, Error, Result};
pub use handler::{handler_fn, BoxFuture, Handler, HandlerFn};
pub use request::{BoxBody, Request, DEFAULT_BODY_LIMIT};
pub use response::{Response, ResponseRecorder, ResponseWriter};
pub use server::{dispatch, serve, HandlerService};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
