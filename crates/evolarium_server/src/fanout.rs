use evolarium_core::SchedulerEvent;
use evolarium_core::SchedulerHandle;
use evolarium_net::{NetMessage, SnapshotFrame};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Turns scheduler events into shared wire frames.
///
/// Each snapshot is serialized exactly once here no matter how many
/// observers are connected. A frame that fails to encode is dropped and
/// logged; the stream carries on with the next one.
pub fn spawn_fanout(
    scheduler: &SchedulerHandle,
    frames: broadcast::Sender<Arc<SnapshotFrame>>,
) -> JoinHandle<()> {
    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Fan-out fell behind the scheduler");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let encoded = match event {
                SchedulerEvent::Snapshot(snapshot) => SnapshotFrame::encode(&snapshot),
                SchedulerEvent::TickFailed { tick, message } => {
                    SnapshotFrame::from_message(&NetMessage::TickError { tick, message })
                }
                SchedulerEvent::EpochReset { generation } => {
                    SnapshotFrame::from_message(&NetMessage::EpochReset { generation })
                }
                SchedulerEvent::Started | SchedulerEvent::Stopped => continue,
            };
            match encoded {
                // No observers connected is fine.
                Ok(frame) => {
                    let _ = frames.send(Arc::new(frame));
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode frame"),
            }
        }
        tracing::debug!("Fan-out finished");
    })
}
