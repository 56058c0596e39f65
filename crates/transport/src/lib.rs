//! Transport abstraction for outbound HTTP calls
//!
//! Defines the `Transport` trait that decouples the session client from the
//! wire. `HttpTransport` is the reqwest-backed implementation used in
//! production; tests substitute in-memory transports that record call order
//! and script responses.
//!
//! A transport only moves bytes: it never interprets status codes, never
//! retries, and never touches session state. Everything above "send this
//! descriptor, give me the response or tell me there was none" belongs to the
//! caller.

pub mod error;
pub mod http;
pub mod request;

pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use request::{RequestAttempt, TransportResponse};

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by `Transport::send`.
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

/// A primitive capable of issuing a request descriptor and returning the raw
/// response.
///
/// Implementations must:
/// - resolve relative paths against their own base address
/// - attach ambient credentials (cookies or equivalent) automatically
/// - apply their own per-request timeout, reporting expiry as an error
/// - accept the same descriptor more than once (replay)
///
/// Any received response, whatever its status, is `Ok`. `Err` means no
/// response was received at all.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "http", "mock")
    fn id(&self) -> &str;

    /// Where `path` ends up, in a form two paths can be compared by.
    ///
    /// Two paths that resolve to the same string address the same endpoint.
    /// The default ignores leading slashes; transports with a base address
    /// return the full URL.
    fn resolve(&self, path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }

    /// Issue the request and wait for the complete response.
    ///
    /// The returned future may do nothing until first polled. Callers that
    /// need requests to leave in a given order poll them in that order.
    fn send(&self, attempt: RequestAttempt) -> SendFuture<'_>;
}
