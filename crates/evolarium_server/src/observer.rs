//! Per-observer delivery.
//!
//! Every observer reads the same broadcast of pre-encoded frames. An observer
//! that falls behind (the broadcast reports lag, or a send overruns its
//! budget) is switched to gzip binary frames; once it has taken
//! `recover_after` frames in a row on time it goes back to plain text.

use axum::extract::ws::Message;
use evolarium_net::{NetError, SnapshotFrame};
use futures::{Sink, SinkExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Text,
    Compressed { on_time: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    mode: DeliveryMode,
    recover_after: u32,
}

impl Delivery {
    #[must_use]
    pub fn new(recover_after: u32) -> Self {
        Self {
            mode: DeliveryMode::Text,
            recover_after,
        }
    }

    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        matches!(self.mode, DeliveryMode::Compressed { .. })
    }

    /// The observer is falling behind.
    pub fn degrade(&mut self) {
        self.mode = DeliveryMode::Compressed { on_time: 0 };
    }

    /// A frame went out within budget.
    pub fn delivered(&mut self) {
        if let DeliveryMode::Compressed { on_time } = self.mode {
            let on_time = on_time + 1;
            self.mode = if on_time >= self.recover_after {
                DeliveryMode::Text
            } else {
                DeliveryMode::Compressed { on_time }
            };
        }
    }

    pub fn message(&self, frame: &SnapshotFrame) -> Result<Message, NetError> {
        if self.is_compressed() {
            Ok(Message::Binary(frame.compressed()?.to_vec()))
        } else {
            Ok(Message::Text(frame.text().to_owned()))
        }
    }
}

/// Forwards broadcast frames to one observer until either side goes away.
///
/// Returns the number of frames delivered.
pub async fn forward_frames<S>(
    id: Uuid,
    mut sink: S,
    mut frames: broadcast::Receiver<Arc<SnapshotFrame>>,
    send_budget: Duration,
    recover_after: u32,
) -> u64
where
    S: Sink<Message> + Unpin,
{
    let mut delivery = Delivery::new(recover_after);
    let mut sent = 0;
    loop {
        let frame = match frames.recv().await {
            Ok(frame) => frame,
            Err(RecvError::Lagged(skipped)) => {
                if !delivery.is_compressed() {
                    tracing::info!(observer = %id, skipped, "Observer lagging, compressing");
                }
                delivery.degrade();
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let message = match delivery.message(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(observer = %id, error = %e, "Could not encode frame");
                break;
            }
        };
        match tokio::time::timeout(send_budget, sink.send(message)).await {
            Ok(Ok(())) => {
                sent += 1;
                let was_compressed = delivery.is_compressed();
                delivery.delivered();
                if was_compressed && !delivery.is_compressed() {
                    tracing::info!(observer = %id, "Observer caught up");
                }
            }
            Ok(Err(_)) => {
                tracing::debug!(observer = %id, "Observer send failed");
                break;
            }
            Err(_) => {
                tracing::debug!(observer = %id, tick = frame.tick(), "Send over budget");
                delivery.degrade();
            }
        }
    }
    sent
}
