//! Session-aware request client
//!
//! Wraps every outbound call with default headers and normalizes the outcome
//! into `Network`, `Auth` or `Server` errors. When the backend reports an
//! expired session (401) the client renews it transparently: concurrent
//! expiries share a single renewal call, the failed requests wait in a FIFO
//! queue, and they are replayed in arrival order once the renewal succeeds.
//!
//! Request lifecycle:
//! 1. `Decorator` fills in `content-type`/`accept` and configured defaults
//! 2. The request goes out through the `Transport`
//! 3. 2xx passes through; 403 and other failures are normalized and returned
//! 4. A first 401 marks the attempt retried and queues it on the `RefreshGate`
//! 5. The first queued caller launches the renewal; later ones just wait
//! 6. Renewal success replays the queue in order; renewal failure rejects the
//!    whole queue and tells the `SessionStore` to invalidate the session once

pub mod client;
pub mod decorate;
pub mod error;
pub mod message;
pub mod metrics;
pub mod refresh;
pub mod session;

pub use client::{ClientConfig, DEFAULT_REFRESH_PATH, SessionClient};
pub use decorate::{Decorator, DefaultHeader};
pub use error::{Error, Result};
pub use message::extract_message;
pub use session::{SessionState, SessionStatus, SessionStore};
