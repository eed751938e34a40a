//! Prioritized retry queue for outbound email
//!
//! The queue is an owned component: processors receive an
//! `Arc<NotificationQueue>` and the server binary starts and stops its drain
//! loop. All queue state lives behind one mutex that is never held while a
//! message is with the provider.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use core_kernel::{BatchRunner, Clock, EmailId, PortError};
use crate::email::{EmailRequest, EmailStatus, OutboundEmail, QueuedEmail};
use crate::error::NotificationError;
use crate::ports::{EmailSenderPort, SentMessage};

/// Queue tuning
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Items attempted per drain cycle
    pub batch_size: usize,
    /// Attempts before an item is marked failed
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one
    pub retry_delay: Duration,
    /// Upper bound on a single provider call
    pub send_timeout: Duration,
    /// Extra time past `send_timeout` before a `processing` item is reclaimed
    pub reclaim_margin: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 3,
            retry_delay: Duration::from_secs(300),
            send_timeout: Duration::from_secs(30),
            reclaim_margin: Duration::from_secs(30),
        }
    }
}

/// Counts by status; always sums to `total`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub sent: usize,
    pub retry: usize,
    pub failed: usize,
}

impl QueueMetrics {
    pub fn is_consistent(&self) -> bool {
        self.pending + self.processing + self.sent + self.retry + self.failed == self.total
    }
}

/// Outcome of one drain cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    /// Items found abandoned in `processing` and put back in rotation
    pub reclaimed: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<QueuedEmail>,
    next_sequence: u64,
}

impl QueueState {
    /// Returns items left in `processing` by an interrupted cycle to rotation
    ///
    /// The lost attempt counts against the item's budget.
    fn reclaim_stale(&mut self, now: DateTime<Utc>, stale_after: chrono::Duration) -> usize {
        let mut reclaimed = 0;
        for item in self.items.iter_mut() {
            let stale = item.status == EmailStatus::Processing
                && item.last_attempt.map_or(true, |at| at + stale_after <= now);
            if !stale {
                continue;
            }
            item.attempts += 1;
            item.error = Some("delivery interrupted before completion".to_string());
            if item.attempts >= item.max_attempts {
                item.status = EmailStatus::Failed;
                item.retry_at = None;
            } else {
                item.status = EmailStatus::Retry;
                item.retry_at = Some(now);
            }
            warn!(email_id = %item.id, attempts = item.attempts, status = ?item.status, "reclaimed stuck email");
            reclaimed += 1;
        }
        reclaimed
    }

    /// Moves `retry` items whose delay has elapsed back to `pending`
    fn promote_due_retries(&mut self, now: DateTime<Utc>) {
        for item in self.items.iter_mut() {
            if item.status == EmailStatus::Retry
                && item.attempts < item.max_attempts
                && item.retry_at.map_or(true, |at| at <= now)
            {
                item.status = EmailStatus::Pending;
                item.retry_at = None;
            }
        }
    }

    /// Claims up to `limit` pending items, highest priority first, FIFO within a tier
    fn take_batch(&mut self, limit: usize, now: DateTime<Utc>) -> Vec<QueuedEmail> {
        let mut eligible: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.status == EmailStatus::Pending)
            .map(|(idx, _)| idx)
            .collect();

        eligible.sort_by_key(|&idx| (self.items[idx].priority.rank(), self.items[idx].sequence));
        eligible.truncate(limit);

        eligible
            .into_iter()
            .map(|idx| {
                let item = &mut self.items[idx];
                item.status = EmailStatus::Processing;
                item.last_attempt = Some(now);
                item.clone()
            })
            .collect()
    }

    fn find_mut(&mut self, id: EmailId) -> Option<&mut QueuedEmail> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

/// In-memory prioritized email queue
pub struct NotificationQueue {
    state: Mutex<QueueState>,
    sender: Arc<dyn EmailSenderPort>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl NotificationQueue {
    pub fn new(sender: Arc<dyn EmailSenderPort>, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            sender,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Adds an email to the queue
    ///
    /// The template is checked against the supplied variables here so that a
    /// malformed request is rejected at the call site rather than burning
    /// delivery attempts later.
    pub async fn enqueue(&self, request: EmailRequest) -> Result<EmailId, NotificationError> {
        let to = request.to.trim();
        if to.is_empty() || !to.contains('@') {
            return Err(NotificationError::InvalidRecipient(request.to.clone()));
        }
        request.template.validate(&request.variables)?;

        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let item = QueuedEmail::from_request(request, self.config.max_attempts, sequence, now);
        let id = item.id;
        debug!(
            email_id = %id,
            template = item.template.name(),
            priority = ?item.priority,
            "email queued"
        );
        state.items.push(item);
        Ok(id)
    }

    /// Runs one drain cycle
    ///
    /// Items taken by a cycle whose future was dropped are reclaimed by a
    /// later cycle once `send_timeout + reclaim_margin` has passed.
    pub async fn process_batch(&self) -> DrainReport {
        let now = self.clock.now();
        let (batch, reclaimed) = {
            let mut state = self.state.lock().await;
            let reclaimed = state.reclaim_stale(now, self.stale_after());
            state.promote_due_retries(now);
            (state.take_batch(self.config.batch_size, now), reclaimed)
        };

        if batch.is_empty() {
            return DrainReport {
                reclaimed,
                ..Default::default()
            };
        }

        let runner = BatchRunner::new(batch.len(), self.config.send_timeout);
        let ids: Vec<EmailId> = batch.iter().map(|item| item.id).collect();
        let outcomes = runner
            .run(batch, |item| {
                let sender = self.sender.clone();
                async move { deliver(sender.as_ref(), &item, runner).await }
            })
            .await;

        let finished_at = self.clock.now();
        let mut report = DrainReport {
            attempted: ids.len(),
            reclaimed,
            ..Default::default()
        };

        let mut state = self.state.lock().await;
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|panic| Err(PortError::internal(panic.message)));
            let Some(item) = state.find_mut(id) else {
                continue;
            };
            // Reclaimed and possibly re-taken while this cycle was running
            if item.status != EmailStatus::Processing || item.last_attempt != Some(now) {
                debug!(email_id = %id, "outcome dropped, item was reclaimed");
                continue;
            }
            item.attempts += 1;

            match outcome {
                Ok(message) => {
                    item.status = EmailStatus::Sent;
                    item.message_id = Some(message.id);
                    item.error = None;
                    report.sent += 1;
                }
                Err(e) => {
                    item.error = Some(e.to_string());
                    if item.attempts >= item.max_attempts {
                        item.status = EmailStatus::Failed;
                        item.retry_at = None;
                        report.failed += 1;
                        warn!(
                            email_id = %item.id,
                            attempts = item.attempts,
                            error = %e,
                            "email permanently failed"
                        );
                    } else {
                        item.status = EmailStatus::Retry;
                        item.retry_at = Some(finished_at + retry_delay(&self.config));
                        report.retried += 1;
                        debug!(email_id = %item.id, attempts = item.attempts, error = %e, "email scheduled for retry");
                    }
                }
            }
        }

        info!(
            attempted = report.attempted,
            reclaimed = report.reclaimed,
            sent = report.sent,
            retried = report.retried,
            failed = report.failed,
            "email queue drained"
        );
        report
    }

    fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.send_timeout + self.config.reclaim_margin)
            .unwrap_or_else(|_| chrono::Duration::minutes(1))
    }

    /// Resets a failed email to pending with a fresh attempt budget
    pub async fn retry_failed_email(&self, id: EmailId) -> Result<(), NotificationError> {
        let mut state = self.state.lock().await;
        let item = state.find_mut(id).ok_or(NotificationError::EmailNotFound(id))?;
        if item.status != EmailStatus::Failed {
            return Err(NotificationError::NotRetryable { id, status: item.status });
        }
        item.status = EmailStatus::Pending;
        item.attempts = 0;
        item.retry_at = None;
        item.error = None;
        info!(email_id = %id, "failed email reset for retry");
        Ok(())
    }

    /// Removes sent emails, returning how many were pruned
    pub async fn clear_sent_emails(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|item| item.status != EmailStatus::Sent);
        before - state.items.len()
    }

    pub async fn metrics(&self) -> QueueMetrics {
        let state = self.state.lock().await;
        let mut metrics = QueueMetrics {
            total: state.items.len(),
            ..Default::default()
        };
        for item in &state.items {
            match item.status {
                EmailStatus::Pending => metrics.pending += 1,
                EmailStatus::Processing => metrics.processing += 1,
                EmailStatus::Sent => metrics.sent += 1,
                EmailStatus::Retry => metrics.retry += 1,
                EmailStatus::Failed => metrics.failed += 1,
            }
        }
        metrics
    }

    /// Lists queued emails, optionally filtered by status
    pub async fn list(&self, status: Option<EmailStatus>) -> Vec<QueuedEmail> {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .filter(|item| status.map_or(true, |s| item.status == s))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: EmailId) -> Option<QueuedEmail> {
        let state = self.state.lock().await;
        state.items.iter().find(|item| item.id == id).cloned()
    }

    /// Starts the drain loop on its own task
    pub fn start(self: &Arc<Self>, interval: Duration) -> QueueHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let queue = Arc::clone(self);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "email queue loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        queue.process_batch().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("email queue loop stopped");
        });

        QueueHandle { shutdown: shutdown_tx, join }
    }
}

/// Handle to a running drain loop
pub struct QueueHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl QueueHandle {
    /// Signals the loop to stop and waits for the in-flight cycle to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "email queue loop ended abnormally");
        }
    }
}

async fn deliver(
    sender: &dyn EmailSenderPort,
    item: &QueuedEmail,
    runner: BatchRunner,
) -> Result<SentMessage, PortError> {
    let rendered = item
        .template
        .render(&item.variables)
        .map_err(|e| PortError::validation(e.to_string()))?;
    let email = OutboundEmail {
        to: item.to.clone(),
        subject: rendered.subject,
        html: rendered.html,
        text: rendered.text,
    };
    runner.call("email send", sender.send(&email)).await
}

fn retry_delay(config: &QueueConfig) -> chrono::Duration {
    chrono::Duration::from_std(config.retry_delay).unwrap_or_else(|_| chrono::Duration::minutes(5))
}
