use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, futures::future, tracing::warn};

/// Anything with an asynchronous start/stop lifecycle.
///
/// Channel services, selection services, and the registry that owns them
/// all implement this. Implementations must tolerate `shutdown` after a
/// failed `initialize`.
#[async_trait]
pub trait Service: Send + Sync {
    /// Stable name used in lifecycle logs and storage keys.
    fn name(&self) -> String;

    async fn initialize(&self) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;
}

/// Lifecycle phase of an aggregate service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
    Stopped,
    Failed,
}

/// Initialize every service concurrently and reduce to a single result.
///
/// All operations run to completion even when one of them fails early;
/// the aggregate succeeds iff every individual operation succeeded.
pub async fn initialize_all(services: &[Arc<dyn Service>]) -> Result<()> {
    let results = future::join_all(services.iter().map(|service| {
        let service = Arc::clone(service);
        async move {
            let outcome = service.initialize().await;
            (service.name(), outcome)
        }
    }))
    .await;
    reduce(results, "initialize")
}

/// Shut every service down concurrently; same aggregation as
/// [`initialize_all`].
pub async fn shutdown_all(services: &[Arc<dyn Service>]) -> Result<()> {
    let results = future::join_all(services.iter().map(|service| {
        let service = Arc::clone(service);
        async move {
            let outcome = service.shutdown().await;
            (service.name(), outcome)
        }
    }))
    .await;
    reduce(results, "shutdown")
}

fn reduce(results: Vec<(String, Result<()>)>, op: &str) -> Result<()> {
    let total = results.len();
    let failed: Vec<String> = results
        .into_iter()
        .filter_map(|(name, outcome)| match outcome {
            Ok(()) => None,
            Err(e) => {
                warn!(service = %name, error = %e, "{op} failed");
                Some(name)
            },
        })
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "{op} failed for {} of {total} services: {}",
            failed.len(),
            failed.join(", ")
        )
    }
}
