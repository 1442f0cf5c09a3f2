//! In-process pub/sub for live job progress.
//!
//! One broadcast channel per job id pushes progress events to SSE observers.
//! Each subscriber gets its own bounded mailbox (a `tokio::sync::broadcast`
//! receiver); when a slow observer overflows its buffer the channel drops the
//! oldest events for that observer only and surfaces the gap as a lag error.
//! Publishing never blocks the producer, and delivery is at-most-once — late
//! subscribers catch up by polling the job store, not by replay.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Thread-safe, cloneable hub with one event channel per job.
///
/// Payloads are `serde_json::Value`; producers serialize their own types.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    /// Default per-observer buffer: 256 events.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish an event for a job, best effort. No-op without subscribers;
    /// never waits on a slow observer.
    pub async fn publish(&self, job_id: Uuid, value: serde_json::Value) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&job_id) {
            // Send errors just mean no active receivers.
            let _ = tx.send(value);
        }
    }

    /// Subscribe to a job's event channel, creating it if needed.
    pub async fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Drop channels with zero subscribers.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let hub = StreamHub::new();
        let job_id = Uuid::new_v4();
        let mut rx = hub.subscribe(job_id).await;

        let value = serde_json::json!({"event_type": "agent_update", "data": {"result_count": 5}});
        hub.publish(job_id, value.clone()).await;

        assert_eq!(rx.recv().await.unwrap(), value);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.publish(Uuid::new_v4(), serde_json::json!({"dropped": true}))
            .await;
    }

    #[tokio::test]
    async fn jobs_are_isolated() {
        let hub = StreamHub::new();
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();
        let mut rx_a = hub.subscribe(job_a).await;
        let mut rx_b = hub.subscribe(job_b).await;

        hub.publish(job_a, serde_json::json!({"for": "a"})).await;

        assert_eq!(rx_a.recv().await.unwrap()["for"], "a");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn slow_observer_drops_oldest_without_blocking_producer() {
        let hub = StreamHub::with_capacity(4);
        let job_id = Uuid::new_v4();
        let mut rx = hub.subscribe(job_id).await;

        for i in 0..10 {
            hub.publish(job_id, serde_json::json!({"seq": i})).await;
        }

        // The observer lagged; it learns how many events it lost, then
        // resumes from the oldest retained event.
        match rx.recv().await {
            Err(RecvError::Lagged(missed)) => assert_eq!(missed, 6),
            other => panic!("expected lag, got {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap()["seq"], 6);
    }

    #[tokio::test]
    async fn receiver_adapts_into_an_async_stream() {
        use futures::StreamExt;
        use tokio_stream::wrappers::BroadcastStream;

        let hub = StreamHub::new();
        let job_id = Uuid::new_v4();
        let rx = hub.subscribe(job_id).await;
        hub.publish(job_id, serde_json::json!({"event_type": "job_started"}))
            .await;

        let mut stream = BroadcastStream::new(rx);
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event["event_type"], "job_started");
    }

    #[tokio::test]
    async fn cleanup_removes_abandoned_channels() {
        let hub = StreamHub::new();
        let rx = hub.subscribe(Uuid::new_v4()).await;
        assert_eq!(hub.channels.read().await.len(), 1);

        drop(rx);
        hub.cleanup().await;
        assert_eq!(hub.channels.read().await.len(), 0);
    }
}
