use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    haggle_common::{Network, Service, Storage},
    tokio::{sync::RwLock, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    channel::{ChannelDomain, ChannelId, ChatChannel, CommonPublicChannel},
    service::ChannelService,
};

/// Owns the common public channels of one non-privileged domain.
///
/// Seeded eagerly at construction; seed order is the iteration order
/// consumers observe. Grows through [`maybe_add_channel`] and through
/// channels announced on the domain's metadata feed.
///
/// [`maybe_add_channel`]: CommonPublicChannelService::maybe_add_channel
pub struct CommonPublicChannelService {
    domain: ChannelDomain,
    storage: Arc<dyn Storage>,
    network: Arc<dyn Network>,
    channels: Arc<RwLock<Vec<CommonPublicChannel>>>,
    feed_task: RwLock<Option<JoinHandle<()>>>,
}

impl CommonPublicChannelService {
    pub fn new(
        storage: Arc<dyn Storage>,
        network: Arc<dyn Network>,
        domain: ChannelDomain,
        seed_topics: &[&str],
    ) -> Arc<Self> {
        // Seeds are taken as given; deduplicating them is not this
        // service's call.
        let channels = seed_topics
            .iter()
            .map(|topic| CommonPublicChannel::new(domain, *topic))
            .collect();
        Arc::new(Self {
            domain,
            storage,
            network,
            channels: Arc::new(RwLock::new(channels)),
            feed_task: RwLock::new(None),
        })
    }

    fn storage_key(&self) -> String {
        format!("channels.{}.public", self.domain)
    }

    fn feed_topic(&self) -> String {
        format!("channels/{}/public", self.domain)
    }

    pub async fn channels(&self) -> Vec<CommonPublicChannel> {
        self.channels.read().await.clone()
    }

    pub async fn find_channel(&self, topic: &str) -> Option<CommonPublicChannel> {
        self.channels
            .read()
            .await
            .iter()
            .find(|c| c.topic == topic)
            .cloned()
    }

    /// Find or create the channel for `topic`. A newly created channel is
    /// announced on the domain's metadata feed.
    pub async fn maybe_add_channel(&self, topic: &str) -> CommonPublicChannel {
        let channel = {
            let mut channels = self.channels.write().await;
            if let Some(existing) = channels.iter().find(|c| c.topic == topic) {
                return existing.clone();
            }
            let channel = CommonPublicChannel::new(self.domain, topic);
            channels.push(channel.clone());
            channel
        };
        self.announce(&channel).await;
        channel
    }

    async fn announce(&self, channel: &CommonPublicChannel) {
        match serde_json::to_value(channel) {
            Ok(payload) => {
                if let Err(e) = self.network.publish(&self.feed_topic(), payload).await {
                    warn!(channel = %channel.id(), error = %e, "channel announcement failed");
                }
            },
            Err(e) => warn!(channel = %channel.id(), error = %e, "channel not serializable"),
        }
    }

    /// Merge the persisted snapshot behind the seeds, deduplicating by id.
    async fn restore(&self) -> Result<()> {
        let Some(snapshot) = self.storage.load(&self.storage_key()).await? else {
            return Ok(());
        };
        let persisted: Vec<CommonPublicChannel> = serde_json::from_value(snapshot)?;
        let mut channels = self.channels.write().await;
        for channel in persisted {
            if !channels.iter().any(|c| c.id() == channel.id()) {
                channels.push(channel);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Service for CommonPublicChannelService {
    fn name(&self) -> String {
        format!("{}.public", self.domain)
    }

    async fn initialize(&self) -> Result<()> {
        info!(domain = %self.domain, "initialize public channel service");
        self.restore().await?;

        let mut feed = self.network.subscribe(&self.feed_topic()).await?;
        let channels = Arc::clone(&self.channels);
        let domain = self.domain;
        let task = tokio::spawn(async move {
            while let Some(payload) = feed.recv().await {
                match serde_json::from_value::<CommonPublicChannel>(payload) {
                    Ok(channel) if channel.domain == domain => {
                        let mut channels = channels.write().await;
                        if !channels.iter().any(|c| c.id() == channel.id()) {
                            debug!(channel = %channel.id(), "merging announced channel");
                            channels.push(channel);
                        }
                    },
                    Ok(channel) => {
                        warn!(channel = %channel.id(), "announcement for foreign domain")
                    },
                    Err(e) => debug!(error = %e, "ignoring malformed announcement"),
                }
            }
        });
        if let Some(old) = self.feed_task.write().await.replace(task) {
            old.abort();
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!(domain = %self.domain, "shutdown public channel service");
        if let Some(task) = self.feed_task.write().await.take() {
            task.abort();
        }
        let snapshot = serde_json::to_value(&*self.channels.read().await)?;
        self.storage.store(&self.storage_key(), snapshot).await
    }
}

#[async_trait]
impl ChannelService for CommonPublicChannelService {
    fn domain(&self) -> ChannelDomain {
        self.domain
    }

    async fn find_by_id(&self, id: &ChannelId) -> Option<ChatChannel> {
        self.channels
            .read()
            .await
            .iter()
            .find(|c| &c.id() == id)
            .cloned()
            .map(ChatChannel::CommonPublic)
    }
}

#[cfg(test)]
mod tests {
    use {
        haggle_common::{MemoryNetwork, MemoryStorage},
        std::time::Duration,
    };

    use super::*;

    fn service(
        storage: &Arc<MemoryStorage>,
        network: &Arc<MemoryNetwork>,
        seeds: &[&str],
    ) -> Arc<CommonPublicChannelService> {
        CommonPublicChannelService::new(
            Arc::clone(storage) as Arc<dyn Storage>,
            Arc::clone(network) as Arc<dyn Network>,
            ChannelDomain::Discussion,
            seeds,
        )
    }

    #[tokio::test]
    async fn test_seed_order_is_preserved() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());
        let service = service(&storage, &network, &["bisq", "bitcoin", "markets"]);

        let topics: Vec<String> = service
            .channels()
            .await
            .into_iter()
            .map(|c| c.topic)
            .collect();
        assert_eq!(topics, ["bisq", "bitcoin", "markets"]);
    }

    #[tokio::test]
    async fn test_duplicate_seeds_are_kept() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());
        let seeds = ["support", "support", "questions"];

        let first = service(&storage, &network, &seeds);
        let topics: Vec<String> = first
            .channels()
            .await
            .into_iter()
            .map(|c| c.topic)
            .collect();
        assert_eq!(topics, seeds);

        // Still three after a persistence round trip.
        first.initialize().await.unwrap();
        first.shutdown().await.unwrap();
        let second = service(&storage, &network, &seeds);
        second.initialize().await.unwrap();
        let topics: Vec<String> = second
            .channels()
            .await
            .into_iter()
            .map(|c| c.topic)
            .collect();
        assert_eq!(topics, seeds);
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_feed_listener() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());
        let local = service(&storage, &network, &[]);

        local.initialize().await.unwrap();
        local.initialize().await.unwrap();

        let remote = CommonPublicChannel::new(ChannelDomain::Discussion, "mining");
        network
            .publish(
                "channels/discussion/public",
                serde_json::to_value(&remote).unwrap(),
            )
            .await
            .unwrap();

        for _ in 0..100 {
            if local.find_channel("mining").await.is_some() {
                // Only the live listener merged it.
                assert_eq!(local.channels().await.len(), 1);
                local.shutdown().await.unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("announced channel never merged");
    }

    #[tokio::test]
    async fn test_maybe_add_channel_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());
        let service = service(&storage, &network, &["bisq"]);

        let first = service.maybe_add_channel("lightning").await;
        let second = service.maybe_add_channel("lightning").await;
        assert_eq!(first, second);
        assert_eq!(service.channels().await.len(), 2);
    }

    #[tokio::test]
    async fn test_channels_survive_restart() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());

        let first = service(&storage, &network, &["bisq"]);
        first.initialize().await.unwrap();
        first.maybe_add_channel("lightning").await;
        first.shutdown().await.unwrap();

        let second = service(&storage, &network, &["bisq"]);
        second.initialize().await.unwrap();
        let topics: Vec<String> = second
            .channels()
            .await
            .into_iter()
            .map(|c| c.topic)
            .collect();
        assert_eq!(topics, ["bisq", "lightning"]);
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_announced_channel_is_merged() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());

        let local = service(&storage, &network, &[]);
        local.initialize().await.unwrap();

        let remote = CommonPublicChannel::new(ChannelDomain::Discussion, "mining");
        network
            .publish(
                "channels/discussion/public",
                serde_json::to_value(&remote).unwrap(),
            )
            .await
            .unwrap();

        for _ in 0..100 {
            if local.find_channel("mining").await.is_some() {
                local.shutdown().await.unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("announced channel never merged");
    }

    #[tokio::test]
    async fn test_find_by_id_wraps_variant() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(MemoryNetwork::new());
        let service = service(&storage, &network, &["bisq"]);

        let id = ChannelId::common_public(ChannelDomain::Discussion, "bisq");
        let found = service.find_by_id(&id).await.unwrap();
        assert_eq!(found.id(), id);
        assert!(matches!(found, ChatChannel::CommonPublic(_)));
        assert!(!service.contains(&ChannelId::common_public(ChannelDomain::Events, "bisq")).await);
    }
}
