use std::collections::HashMap;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde_json::Value,
    tokio::sync::{RwLock, mpsc},
};

/// Publish/subscribe transport for channel metadata.
///
/// Topics are flat strings (e.g. `channels/discussion/public`); payloads
/// are JSON. Delivery ordering and durability are backend concerns.
#[async_trait]
pub trait Network: Send + Sync {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;

    /// Subscribe to a topic; returns the receiving end of an unbounded
    /// feed. Dropping the receiver cancels the subscription.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<Value>>;
}

/// In-process pub/sub fan-out, one sender list per topic.
#[derive(Default)]
pub struct MemoryNetwork {
    topics: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        if let Some(subscribers) = self.topics.write().await.get_mut(topic) {
            // Closed receivers are dropped on the way through.
            subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<Value>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
