// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fans process state changes out to an HTTP callback.
//!
//! The supervision path pushes a [`Notification`] for every status write;
//! this consumer forwards only edges (status actually changed) and never
//! blocks the senders — the channel is unbounded and failures are logged
//! and dropped.

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use goku_core::Notification;

/// Sending half of the notification stream, cloned into every Process.
pub type EventSender = mpsc::UnboundedSender<Notification>;

/// Receiving half, consumed by [`Notifier::run`].
pub type EventReceiver = mpsc::UnboundedReceiver<Notification>;

pub fn notification_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// HTTP notification worker.
pub struct Notifier {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    /// Consume events until the channel closes. A periodic wake keeps the
    /// loop live independent of event arrival.
    pub async fn run(self, mut events: EventReceiver) {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(notification) => self.handle(notification).await,
                    None => break,
                },
                _ = tick.tick() => {}
            }
        }
    }

    async fn handle(&self, notification: Notification) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        if !notification.is_edge() {
            return;
        }

        debug!(
            name = %notification.name,
            uid = %notification.uid,
            endpoint = %endpoint,
            "sending notification"
        );

        if let Err(err) = self.post(endpoint, &notification).await {
            warn!(endpoint = %endpoint, error = %err, "notification post failed");
        }
    }

    /// POST the record as JSON. The response body is ignored.
    async fn post(&self, endpoint: &str, notification: &Notification) -> reqwest::Result<()> {
        self.client
            .post(endpoint)
            .header("User-Agent", user_agent())
            .header("Request-Id", Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .json(notification)
            .send()
            .await?;
        Ok(())
    }
}

/// `goku/<version> (<os>; <arch>)`
pub(crate) fn user_agent() -> String {
    format!(
        "goku/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
