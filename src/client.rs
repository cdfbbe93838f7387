#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Entry points for a graphical or background front end.
//!
//! Everything here goes through the same [`Dispatcher`] as the console
//! runners, so a GUI and a script share one session and one identity.

use crate::command::Invocation;
use crate::config::Settings;
use crate::error::{DeskError, Result};
use crate::runtime::{Dispatcher, InputStack, ScriptRunner};
use crate::types::{ExitCode, Identity, Response};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct DeskClient {
    dispatcher: Arc<Dispatcher>,
}

impl DeskClient {
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Sends one command. Server rejections come back as `Ok` with `ok == false`.
    ///
    /// # Errors
    /// Returns local validation failures and transport failures.
    pub async fn call(&self, name: &str, raw: &str) -> Result<Response> {
        self.dispatcher.call(&Invocation::new(name, raw)).await
    }

    async fn call_ok(&self, name: &str, raw: &str) -> Result<Response> {
        let response = self.call(name, raw).await?;
        if response.is_success() {
            return Ok(response);
        }
        let (code, msg) = response.error_detail().map_or_else(
            || (String::new(), response.message().unwrap_or_default().to_string()),
            |detail| (detail.code.clone(), detail.msg.clone()),
        );
        Err(DeskError::Rejected {
            cmd: name.to_string(),
            code,
            msg,
        })
    }

    /// Every record the server holds, as returned by `show`.
    ///
    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn fetch_records(&self) -> Result<Vec<Value>> {
        let response = self.call_ok("show", "").await?;
        Ok(match response.data() {
            Some(Value::Array(records)) => records.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        })
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn add(&self, record: &Value) -> Result<Response> {
        self.call_ok("add", &record.to_string()).await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn add_if_min(&self, record: &Value) -> Result<Response> {
        self.call_ok("add_if_min", &record.to_string()).await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn update(&self, id: i64, record: &Value) -> Result<Response> {
        self.call_ok("update", &format!("{id} {record}")).await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn remove(&self, id: i64) -> Result<Response> {
        self.call_ok("remove_by_id", &id.to_string()).await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn clear(&self) -> Result<Response> {
        self.call_ok("clear", "").await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn sum_of_price(&self) -> Result<Response> {
        self.call_ok("sum_of_price", "").await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity> {
        self.sign_in("login", username, password).await
    }

    /// # Errors
    /// Returns the transport failure or the server's rejection.
    pub async fn register(&self, username: &str, password: &str) -> Result<Identity> {
        self.sign_in("register", username, password).await
    }

    async fn sign_in(&self, name: &str, username: &str, password: &str) -> Result<Identity> {
        self.call_ok(name, &format!("{username} {password}")).await?;
        Ok(self
            .current_identity()
            .unwrap_or_else(|| Identity::new(username, None)))
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.dispatcher.current_identity()
    }

    pub fn logout(&self) {
        self.dispatcher.logout();
    }

    /// Runs a script with no operator behind it: broken input ends in an
    /// emergency shutdown rather than a fallback.
    pub async fn run_script(&self, path: &str) -> ExitCode {
        let mut input = InputStack::empty();
        ScriptRunner::new(Arc::clone(&self.dispatcher))
            .run(path, &mut input)
            .await
    }
}

/// Background refresh of the record list.
pub struct Poller {
    records: watch::Receiver<Vec<Value>>,
    task: JoinHandle<()>,
}

impl Poller {
    /// Issues `show` every `interval`, starting immediately.
    #[must_use]
    pub fn spawn(client: DeskClient, interval: Duration) -> Self {
        let (tx, records) = watch::channel(Vec::new());
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match client.fetch_records().await {
                    Ok(latest) => {
                        debug!(count = latest.len(), "records refreshed");
                        if tx.send(latest).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "record refresh failed"),
                }
            }
        });
        Self { records, task }
    }

    /// Polls at the configured `poll_interval_ms`.
    #[must_use]
    pub fn from_settings(client: DeskClient, settings: &Settings) -> Self {
        Self::spawn(client, settings.poll_interval)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Value>> {
        self.records.clone()
    }

    #[must_use]
    pub fn latest(&self) -> Vec<Value> {
        self.records.borrow().clone()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// What [`ScriptSlot::start`] does when a script is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replace {
    #[default]
    Refuse,
    Interrupt,
}

/// Holds at most one background script.
pub struct ScriptSlot {
    client: DeskClient,
    running: Mutex<Option<JoinHandle<ExitCode>>>,
}

impl ScriptSlot {
    #[must_use]
    pub const fn new(client: DeskClient) -> Self {
        Self {
            client,
            running: Mutex::new(None),
        }
    }

    /// # Errors
    /// Returns `DeskError::Busy` when a script is running and `replace` is `Refuse`.
    pub fn start(&self, path: impl Into<String>, replace: Replace) -> Result<()> {
        let path = path.into();
        let mut running = self
            .running
            .lock()
            .map_err(|_| DeskError::Internal("script slot lock poisoned".to_string()))?;

        if let Some(current) = running.as_ref().filter(|handle| !handle.is_finished()) {
            if replace == Replace::Refuse {
                return Err(DeskError::Busy(format!(
                    "a script is already running; not starting {path}"
                )));
            }
            info!(script = %path, "interrupting running script");
            current.abort();
        }

        let client = self.client.clone();
        *running = Some(tokio::spawn(async move { client.run_script(&path).await }));
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|running| running.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Aborts the running script, if any. Returns whether one was running.
    pub fn interrupt(&self) -> bool {
        let Ok(mut running) = self.running.lock() else {
            return false;
        };
        match running.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Waits for the current script. `None` if nothing ran or it was interrupted.
    pub async fn wait(&self) -> Option<ExitCode> {
        let handle = self.running.lock().ok()?.take()?;
        handle.await.ok()
    }
}
