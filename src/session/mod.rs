#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Owner of the server connection.
//!
//! The wire is a single ordered stream without request identifiers, so the
//! session holds the link behind an async mutex for the whole
//! request/response exchange. Whoever takes the lock first goes on the wire
//! first; callers get no other ordering guarantee.

mod transport;

pub use transport::{Connector, Link, PortFuture, TcpConnector, TcpLink};

use crate::error::TransportError;
use crate::types::{Request, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
        }
    }
}

/// How `repair_connection` paces its attempts. `max_attempts: None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    #[must_use]
    pub const fn forever(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    #[must_use]
    pub const fn allows_attempt(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt <= max,
            None => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(Self::DEFAULT_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            response_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct Session {
    connector: Arc<dyn Connector>,
    link: Mutex<Option<Box<dyn Link>>>,
    state: watch::Sender<SessionState>,
    options: SessionOptions,
}

impl Session {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            connector,
            link: Mutex::new(None),
            state,
            options,
        }
    }

    #[must_use]
    pub fn tcp(addr: impl Into<String>, options: SessionOptions) -> Self {
        Self::new(Arc::new(TcpConnector::new(addr)), options)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Connection status feed for status indicators.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.connector.describe()
    }

    fn set_state(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Idempotent: returns at once when a link is already up.
    ///
    /// # Errors
    /// Returns `TransportError::Timeout` if the connector does not answer within
    /// `connect_timeout`, or the connector's own error.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        if link.is_some() {
            return Ok(());
        }

        let timeout = self.options.connect_timeout;
        let opened = tokio::time::timeout(timeout, self.connector.connect())
            .await
            .map_err(|_| TransportError::Timeout {
                what: "connect".to_string(),
                after: timeout,
            })??;

        *link = Some(opened);
        self.set_state(SessionState::Connected);
        info!(endpoint = %self.connector.describe(), "connected");
        Ok(())
    }

    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if link.take().is_some() {
            debug!(endpoint = %self.connector.describe(), "disconnected");
        }
        self.set_state(SessionState::Disconnected);
    }

    /// Transmits one request and waits for its response. Never re-sends.
    ///
    /// Any failure drops the link: a late response to a timed-out request
    /// would otherwise be paired with the next request.
    ///
    /// # Errors
    /// Returns `TransportError::Disconnected` without touching the wire when
    /// no link is up, or the I/O / timeout failure of the exchange.
    pub async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut link = self.link.lock().await;
        let started = Instant::now();
        let timeout = self.options.response_timeout;

        // Out of the slot while on the wire: a caller cancelled mid-exchange
        // leaves no half-read link behind.
        let Some(mut active) = link.take() else {
            return Err(TransportError::Disconnected);
        };
        let mut in_flight = InFlight {
            session: self,
            armed: true,
        };
        let result = tokio::time::timeout(timeout, active.exchange(request))
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    what: format!("response to {}", request.cmd),
                    after: timeout,
                })
            });
        in_flight.armed = false;

        match result {
            Ok(response) => {
                *link = Some(active);
                debug!(cmd = %request.cmd, rid = %request.rid, ok = response.ok, "exchange complete");
                Ok(response.with_ms(elapsed_ms(started)))
            }
            Err(err) => {
                self.set_state(SessionState::Disconnected);
                warn!(cmd = %request.cmd, rid = %request.rid, error = %err, "connection lost");
                Err(err)
            }
        }
    }

    /// Blocks until connected, sleeping `retry.interval` between failed attempts.
    ///
    /// # Errors
    /// Returns `TransportError::RepairExhausted` only when the policy bounds attempts.
    pub async fn repair_connection(&self) -> Result<(), TransportError> {
        self.repair_connection_with(|_, _| {}).await
    }

    /// Like [`Session::repair_connection`], reporting each failed attempt to `on_failure`.
    ///
    /// # Errors
    /// Returns `TransportError::RepairExhausted` only when the policy bounds attempts.
    pub async fn repair_connection_with<F>(&self, mut on_failure: F) -> Result<(), TransportError>
    where
        F: FnMut(u32, &TransportError) + Send,
    {
        let policy = self.options.retry;
        let mut attempt = 0_u32;
        while !self.is_connected() {
            attempt = attempt.saturating_add(1);
            match self.connect().await {
                Ok(()) => {
                    info!(attempt, "connection restored");
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "reconnect attempt failed");
                    on_failure(attempt, &err);
                    if !policy.allows_attempt(attempt.saturating_add(1)) {
                        return Err(TransportError::RepairExhausted(attempt));
                    }
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
        Ok(())
    }
}

/// Marks the session disconnected if an exchange is dropped before it finishes.
struct InFlight<'a> {
    session: &'a Session,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("exchange cancelled; dropping link");
            self.session.set_state(SessionState::Disconnected);
        }
    }
}

fn elapsed_ms(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).map_or(i64::MAX, |value| value)
}
