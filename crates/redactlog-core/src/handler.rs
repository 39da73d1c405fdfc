//! Handler trait and utilities

use crate::request::Request;
use crate::response::ResponseWriter;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed, sendable future borrowed for `'a`
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait representing an async request handler
///
/// A handler consumes the request and writes its answer into the
/// [`ResponseWriter`] it is given. Middleware implements this trait too, so a
/// wrapped handler has exactly the same signature as the one it wraps.
pub trait Handler: Send + Sync + 'static {
    /// Serve one request
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()> {
        (**self).serve(req, res)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()> {
        (**self).serve(req, res)
    }
}

/// Handler built from a closure, see [`handler_fn`]
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Create a handler from a closure returning a boxed future
///
/// # Example
///
/// ```rust,ignore
/// use redactlog_core::{handler_fn, ResponseWriter};
///
/// let hello = handler_fn(|_req, res: &mut dyn ResponseWriter| {
///     Box::pin(async move {
///         let _ = res.write_all(b"Hello, World!");
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(Request, &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(Request, &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()> {
        (self.f)(req, res)
    }
}
