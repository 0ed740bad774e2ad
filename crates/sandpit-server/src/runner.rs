//! Runs a controller on its own task.
//!
//! Every input, whether a host selection, a bridge message or a timer,
//! arrives as a [`ControllerEvent`] on one channel, so the controller never
//! sees concurrent calls. After each event the new status is published.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::ExecutionId;
use crate::controller::{ControllerEvent, PreviewController, ReleaseTimer};
use crate::websocket::StatusHub;

/// Sending side of a controller's event channel.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerEvent>,
}

impl ControllerHandle {
    /// Queue an event. Returns `false` once the controller has stopped.
    pub async fn send(&self, event: ControllerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Create the event channel for one controller.
pub fn controller_channel(capacity: usize) -> (ControllerHandle, mpsc::Receiver<ControllerEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ControllerHandle { tx }, rx)
}

/// Release timer backed by tokio sleeps that report back as events.
#[derive(Debug)]
pub struct TokioReleaseTimer {
    events: ControllerHandle,
    pending: HashMap<ExecutionId, JoinHandle<()>>,
}

impl TokioReleaseTimer {
    pub fn new(events: ControllerHandle) -> Self {
        Self {
            events,
            pending: HashMap::new(),
        }
    }
}

impl ReleaseTimer for TokioReleaseTimer {
    fn schedule(&mut self, execution: ExecutionId, delay: Duration) {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.send(ControllerEvent::ReleaseDue(execution)).await;
        });

        if let Some(previous) = self.pending.insert(execution, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, execution: ExecutionId) {
        if let Some(task) = self.pending.remove(&execution) {
            task.abort();
        }
    }
}

impl Drop for TokioReleaseTimer {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}

/// Spawn the task that owns `controller` until a shutdown event arrives.
pub fn spawn_controller(
    mut controller: PreviewController,
    mut events: mpsc::Receiver<ControllerEvent>,
    hub: StatusHub,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        hub.publish_status(controller.view());

        while let Some(event) = events.recv().await {
            let shutdown = matches!(event, ControllerEvent::Shutdown);

            controller.handle(event);
            hub.publish_status(controller.view());

            if shutdown {
                break;
            }
        }

        controller.teardown();
        tracing::debug!("Controller task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::HostBoundary;
    use crate::controller::{PreviewState, ReleasePolicy};
    use crate::handles::HandleStore;
    use crate::websocket::HostMessage;
    use sandpit_sandbox::{SandboxPipeline, SourceArtifact};
    use serde_json::json;

    const CARD: &str = "const Card = () => <div>Card</div>;\nexport default Card;";

    async fn next_status(rx: &mut tokio::sync::broadcast::Receiver<HostMessage>) -> PreviewState {
        loop {
            match rx.recv().await.unwrap() {
                HostMessage::Status { status } => return status.state,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn publishes_status_after_each_event() {
        let hub = StatusHub::new();
        let mut rx = hub.subscribe();
        let store = HandleStore::new();
        let controller = PreviewController::new(
            SandboxPipeline::default(),
            store.clone(),
            Box::new(HostBoundary::new(hub.clone())),
        );

        let (handle, events) = controller_channel(16);
        let task = spawn_controller(controller, events, hub.clone());

        assert_eq!(next_status(&mut rx).await, PreviewState::Idle);

        handle
            .send(ControllerEvent::Select(Some(SourceArtifact::new(CARD, "Card.jsx"))))
            .await;
        assert!(matches!(next_status(&mut rx).await, PreviewState::Executing { .. }));

        handle
            .send(ControllerEvent::Bridge(json!({ "type": "sandbox-success", "execution": 1 })))
            .await;
        assert!(matches!(next_status(&mut rx).await, PreviewState::Success { .. }));

        handle.send(ControllerEvent::Shutdown).await;
        task.await.unwrap();

        assert_eq!(store.stats().live, 0);
        assert!(!handle.send(ControllerEvent::Refresh).await);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_releases_after_timeout() {
        let hub = StatusHub::new();
        let store = HandleStore::new();
        let (handle, events) = controller_channel(16);

        let controller = PreviewController::new(
            SandboxPipeline::default(),
            store.clone(),
            Box::new(HostBoundary::new(hub.clone())),
        )
        .with_release_policy(
            ReleasePolicy::FixedDelay(Duration::from_millis(1000)),
            Box::new(TokioReleaseTimer::new(handle.clone())),
        );
        let task = spawn_controller(controller, events, hub.clone());

        handle
            .send(ControllerEvent::Select(Some(SourceArtifact::new(CARD, "Card.jsx"))))
            .await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.stats().live, 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.stats().live, 0);
        assert_eq!(store.stats().released, 1);

        handle.send(ControllerEvent::Shutdown).await;
        task.await.unwrap();
        assert_eq!(store.stats().released, 1);
    }
}
