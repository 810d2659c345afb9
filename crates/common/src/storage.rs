use std::collections::HashMap;

use {anyhow::Result, async_trait::async_trait, serde_json::Value, tokio::sync::RwLock};

/// Opaque persistence capability shared by every channel and selection
/// service. Snapshots are plain JSON values so the backend stays free to
/// store them however it likes.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    async fn store(&self, key: &str, snapshot: Value) -> Result<()>;
}

/// Process-local storage backend. Useful for tests and for embeddings
/// that do not need state to survive a restart.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, snapshot: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), snapshot);
        Ok(())
    }
}
