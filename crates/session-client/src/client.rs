//! Session-aware client: decoration, normalization and renewal
//!
//! Every call goes through `execute`. The outcome of each transport exchange
//! is classified into one of three dispositions:
//!
//! | Outcome                                   | Disposition                     |
//! |-------------------------------------------|---------------------------------|
//! | 2xx                                       | return the response             |
//! | no response                               | `Error::Network`                |
//! | 401 on the renewal call                   | `Error::Auth`, never recurses   |
//! | 401 on an attempt already replayed once   | `Error::Server { status: 401 }` |
//! | 401 otherwise                             | queue behind a renewal          |
//! | 403                                       | `Error::Auth`                   |
//! | anything else                             | `Error::Server`                 |
//!
//! Renewal runs in its own task so a caller that gives up does not strand the
//! others waiting in the queue.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use transport::{RequestAttempt, Transport, TransportResponse};

use crate::decorate::{Decorator, DefaultHeader};
use crate::error::{Error, Result};
use crate::message::extract_message;
use crate::metrics;
use crate::refresh::{PendingRequest, RefreshGate};
use crate::session::SessionStore;

/// Path of the session renewal endpoint unless configured otherwise.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Client settings independent of the transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Renewal endpoint, relative to the transport base address
    pub refresh_path: String,
    /// Extra headers added to every request when absent
    pub default_headers: Vec<DefaultHeader>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            default_headers: Vec::new(),
        }
    }
}

/// HTTP client that renews an expired session transparently.
///
/// Cheap to clone; clones share the transport, the session store and the
/// renewal state, so expiries seen through any clone join the same renewal.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    decorator: Decorator,
    gate: RefreshGate,
    refresh_path: String,
    /// `refresh_path` as the transport resolves it
    renewal_target: String,
}

/// What to do with a finished exchange.
enum Disposition {
    Complete(Result<TransportResponse>),
    /// Renewable 401; carries the error to surface if renewal is not possible
    Renew(Error),
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        config: ClientConfig,
    ) -> Self {
        info!(
            transport = transport.id(),
            refresh_path = %config.refresh_path,
            default_headers = config.default_headers.len(),
            "session client initialized"
        );
        let renewal_target = resolved_route(transport.as_ref(), &config.refresh_path);
        Self {
            inner: Arc::new(Inner {
                renewal_target,
                transport,
                session,
                decorator: Decorator::new(&config.default_headers),
                gate: RefreshGate::new(),
                refresh_path: config.refresh_path,
            }),
        }
    }

    /// Issue a request, renewing the session on expiry.
    ///
    /// Resolves to the 2xx response, or to a normalized error. A request that
    /// hits an expired session is retried at most once, after the renewal.
    #[instrument(skip_all, fields(request_id = %attempt.id, method = %attempt.method, path = %attempt.path))]
    pub async fn execute(&self, mut attempt: RequestAttempt) -> Result<TransportResponse> {
        self.inner.decorator.apply(&mut attempt);
        let method = attempt.method.clone();

        let result = match self.inner.dispatch(attempt.clone()).await {
            Disposition::Complete(result) => result,
            Disposition::Renew(_) => self.wait_for_renewal(attempt).await,
        };

        if let Err(e) = &result {
            debug!(error = %e, "request failed");
        }
        metrics::record_request(method.as_str(), metrics::outcome_label(&result));
        result
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(RequestAttempt::get(path)).await?;
        decode(&response)
    }

    /// POST `body` as JSON and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// PUT `body` as JSON and decode the JSON response.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    /// PATCH `body` as JSON and decode the JSON response.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    /// DELETE `path`, discarding any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(RequestAttempt::new(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let attempt = RequestAttempt::new(method, path)
            .with_json(body)
            .map_err(|e| Error::Decode(format!("serializing request body: {e}")))?;
        let response = self.execute(attempt).await?;
        decode(&response)
    }

    /// Queue the attempt behind a renewal and wait for its replay outcome.
    async fn wait_for_renewal(&self, mut attempt: RequestAttempt) -> Result<TransportResponse> {
        attempt.mark_retried();
        let (reply, outcome) = oneshot::channel();

        // Check-and-set and enqueue in one critical section, before any await
        if self.inner.gate.enqueue(PendingRequest { attempt, reply }) {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.renew_and_replay().await });
        } else {
            debug!("session renewal already in flight, queued");
        }

        outcome
            .await
            .unwrap_or_else(|_| Err(Error::Network("session renewal was abandoned".into())))
    }
}

impl Inner {
    /// Whether the attempt addresses the renewal endpoint, however spelled.
    fn is_renewal(&self, attempt: &RequestAttempt) -> bool {
        resolved_route(self.transport.as_ref(), attempt.route()) == self.renewal_target
    }

    /// Send through the transport and classify the outcome.
    ///
    /// Nothing is guaranteed to leave until the returned future is polled;
    /// callers that need an order poll in that order.
    fn dispatch(&self, attempt: RequestAttempt) -> impl Future<Output = Disposition> + Send + '_ {
        let is_renewal = self.is_renewal(&attempt);
        let retried = attempt.is_retried();
        let exchange = self.transport.send(attempt);
        async move { classify(exchange.await, retried, is_renewal) }
    }

    /// Renew the session, then settle every queued request.
    async fn renew_and_replay(&self) {
        info!("session expired, renewing");
        let renewal = self.renew().await;
        let pending = self.gate.settle();
        metrics::record_renewal(renewal.is_ok(), pending.len());

        match renewal {
            Ok(()) => {
                info!(queued = pending.len(), "session renewed, replaying queued requests");
                // join_all polls in arrival order, so replays leave FIFO
                let replays: Vec<_> = pending
                    .into_iter()
                    .map(|PendingRequest { attempt, reply }| {
                        let request_id = attempt.id;
                        let exchange = self.dispatch(attempt);
                        async move {
                            let result = match exchange.await {
                                Disposition::Complete(result) => result,
                                Disposition::Renew(err) => Err(err),
                            };
                            metrics::record_replay(metrics::outcome_label(&result));
                            if reply.send(result).is_err() {
                                debug!(%request_id, "caller went away before replay finished");
                            }
                        }
                    })
                    .collect();
                join_all(replays).await;
            }
            Err(err) => {
                warn!(error = %err, queued = pending.len(), "session renewal failed, rejecting queued requests");
                self.session.invalidate_session();
                metrics::record_invalidation();
                for PendingRequest { attempt, reply } in pending {
                    if reply.send(Err(err.clone())).is_err() {
                        debug!(request_id = %attempt.id, "caller went away before renewal failed");
                    }
                }
            }
        }
    }

    /// One call to the renewal endpoint. Any non-2xx or missing response is a
    /// failure.
    async fn renew(&self) -> Result<()> {
        let mut attempt = RequestAttempt::post(self.refresh_path.as_str());
        self.decorator.apply(&mut attempt);
        match self.dispatch(attempt).await {
            Disposition::Complete(result) => result.map(|_| ()),
            Disposition::Renew(err) => Err(err),
        }
    }
}

fn resolved_route(transport: &dyn Transport, path: &str) -> String {
    transport.resolve(path).trim_end_matches('/').to_string()
}

fn classify(
    exchange: transport::Result<TransportResponse>,
    retried: bool,
    is_renewal: bool,
) -> Disposition {
    let response = match exchange {
        Ok(response) => response,
        Err(e) => return Disposition::Complete(Err(e.into())),
    };

    if response.is_success() {
        return Disposition::Complete(Ok(response));
    }

    let status = response.status;
    let message = extract_message(status.as_u16(), &response.body);
    match status {
        StatusCode::UNAUTHORIZED if is_renewal => Disposition::Complete(Err(Error::Auth(message))),
        StatusCode::UNAUTHORIZED => {
            let err = Error::Server {
                status: status.as_u16(),
                message,
            };
            if retried {
                Disposition::Complete(Err(err))
            } else {
                Disposition::Renew(err)
            }
        }
        StatusCode::FORBIDDEN => Disposition::Complete(Err(Error::Auth(message))),
        _ => Disposition::Complete(Err(Error::Server {
            status: status.as_u16(),
            message,
        })),
    }
}

fn decode<T: DeserializeOwned>(response: &TransportResponse) -> Result<T> {
    response
        .json()
        .map_err(|e| Error::Decode(format!("invalid response body: {e}")))
}
