//! The two privileged-domain channel services. Both are singletons: they
//! only ever own trade-domain channels, so ownership dispatch never keys
//! them by domain.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    haggle_common::{
        IdentityService, Network, PowVerifier, ProfileLookup, ProofOfWork, Service, Storage,
        UserProfile,
    },
    tokio::{sync::RwLock, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    channel::{ChannelDomain, ChannelId, ChatChannel, TradePrivateChannel, TradePublicChannel},
    service::{ChannelError, ChannelService},
};

const MARKET_FEED: &str = "channels/trade/market";

/// Owns the public market channels of the trade domain. Never seeded;
/// channels appear as market activity does.
pub struct TradePublicChannelService {
    storage: Arc<dyn Storage>,
    network: Arc<dyn Network>,
    channels: Arc<RwLock<Vec<TradePublicChannel>>>,
    feed_task: RwLock<Option<JoinHandle<()>>>,
}

impl TradePublicChannelService {
    pub fn new(storage: Arc<dyn Storage>, network: Arc<dyn Network>) -> Arc<Self> {
        Arc::new(Self {
            storage,
            network,
            channels: Arc::new(RwLock::new(Vec::new())),
            feed_task: RwLock::new(None),
        })
    }

    pub async fn channels(&self) -> Vec<TradePublicChannel> {
        self.channels.read().await.clone()
    }

    /// Find or create the channel for `market`; new channels are announced
    /// on the market feed.
    pub async fn find_or_create_market_channel(&self, market: &str) -> TradePublicChannel {
        let channel = {
            let mut channels = self.channels.write().await;
            if let Some(existing) = channels.iter().find(|c| c.market == market) {
                return existing.clone();
            }
            let channel = TradePublicChannel::new(market);
            channels.push(channel.clone());
            channel
        };
        match serde_json::to_value(&channel) {
            Ok(payload) => {
                if let Err(e) = self.network.publish(MARKET_FEED, payload).await {
                    warn!(channel = %channel.id(), error = %e, "market announcement failed");
                }
            },
            Err(e) => warn!(channel = %channel.id(), error = %e, "channel not serializable"),
        }
        channel
    }
}

#[async_trait]
impl Service for TradePublicChannelService {
    fn name(&self) -> String {
        "trade.market".to_string()
    }

    async fn initialize(&self) -> Result<()> {
        info!("initialize trade public channel service");
        if let Some(snapshot) = self.storage.load("channels.trade.market").await? {
            let persisted: Vec<TradePublicChannel> = serde_json::from_value(snapshot)?;
            let mut channels = self.channels.write().await;
            for channel in persisted {
                if !channels.iter().any(|c| c.id() == channel.id()) {
                    channels.push(channel);
                }
            }
        }

        let mut feed = self.network.subscribe(MARKET_FEED).await?;
        let channels = Arc::clone(&self.channels);
        let task = tokio::spawn(async move {
            while let Some(payload) = feed.recv().await {
                match serde_json::from_value::<TradePublicChannel>(payload) {
                    Ok(channel) => {
                        let mut channels = channels.write().await;
                        if !channels.iter().any(|c| c.id() == channel.id()) {
                            debug!(channel = %channel.id(), "merging announced market channel");
                            channels.push(channel);
                        }
                    },
                    Err(e) => debug!(error = %e, "ignoring malformed market announcement"),
                }
            }
        });
        if let Some(old) = self.feed_task.write().await.replace(task) {
            old.abort();
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutdown trade public channel service");
        if let Some(task) = self.feed_task.write().await.take() {
            task.abort();
        }
        let snapshot = serde_json::to_value(&*self.channels.read().await)?;
        self.storage.store("channels.trade.market", snapshot).await
    }
}

#[async_trait]
impl ChannelService for TradePublicChannelService {
    fn domain(&self) -> ChannelDomain {
        ChannelDomain::Trade
    }

    async fn find_by_id(&self, id: &ChannelId) -> Option<ChatChannel> {
        self.channels
            .read()
            .await
            .iter()
            .find(|c| &c.id() == id)
            .cloned()
            .map(ChatChannel::TradePublic)
    }
}

/// Owns the private trade-negotiation channels. Creation is gated by a
/// proof-of-work check on top of the usual peer validation.
pub struct TradePrivateChannelService {
    storage: Arc<dyn Storage>,
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileLookup>,
    pow: Arc<dyn PowVerifier>,
    channels: Arc<RwLock<Vec<TradePrivateChannel>>>,
}

impl TradePrivateChannelService {
    pub fn new(
        storage: Arc<dyn Storage>,
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileLookup>,
        pow: Arc<dyn PowVerifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            identity,
            profiles,
            pow,
            channels: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub async fn channels(&self) -> Vec<TradePrivateChannel> {
        self.channels.read().await.clone()
    }

    /// Find or create the negotiation channel for `trade_id` with `peer`.
    /// The proof-of-work check runs first; a duplicate trade id then
    /// yields the existing channel.
    pub async fn maybe_create_channel(
        &self,
        trade_id: &str,
        peer: &UserProfile,
        pow: &ProofOfWork,
    ) -> Result<TradePrivateChannel, ChannelError> {
        if !self.pow.verify(pow).await {
            warn!(trade = trade_id, "proof of work rejected");
            return Err(ChannelError::ProofOfWorkRejected(trade_id.to_string()));
        }
        let me = self.identity.my_profile().await;
        if peer.id.is_empty() || peer.id == me.id || self.profiles.get(&peer.id).await.is_none() {
            return Err(ChannelError::UnknownPeer(peer.id.clone()));
        }

        let id = ChannelId::trade_private(trade_id, &me.id, &peer.id);
        let mut channels = self.channels.write().await;
        if let Some(existing) = channels.iter().find(|c| c.id() == id) {
            return Ok(existing.clone());
        }
        let channel = TradePrivateChannel::new(trade_id, me, peer.clone());
        debug!(channel = %channel.id(), "created trade negotiation channel");
        channels.push(channel.clone());
        Ok(channel)
    }
}

#[async_trait]
impl Service for TradePrivateChannelService {
    fn name(&self) -> String {
        "trade.offer".to_string()
    }

    async fn initialize(&self) -> Result<()> {
        info!("initialize trade private channel service");
        if let Some(snapshot) = self.storage.load("channels.trade.offer").await? {
            let persisted: Vec<TradePrivateChannel> = serde_json::from_value(snapshot)?;
            let mut channels = self.channels.write().await;
            for channel in persisted {
                if !channels.iter().any(|c| c.id() == channel.id()) {
                    channels.push(channel);
                }
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutdown trade private channel service");
        let snapshot = serde_json::to_value(&*self.channels.read().await)?;
        self.storage.store("channels.trade.offer", snapshot).await
    }
}

#[async_trait]
impl ChannelService for TradePrivateChannelService {
    fn domain(&self) -> ChannelDomain {
        ChannelDomain::Trade
    }

    async fn find_by_id(&self, id: &ChannelId) -> Option<ChatChannel> {
        self.channels
            .read()
            .await
            .iter()
            .find(|c| &c.id() == id)
            .cloned()
            .map(ChatChannel::TradePrivate)
    }
}

#[cfg(test)]
mod tests {
    use {
        haggle_common::{MemoryNetwork, MemoryStorage, Sha256PowVerifier, StaticProfileBook},
        std::time::Duration,
    };

    use super::*;

    fn easy_pow() -> ProofOfWork {
        ProofOfWork {
            payload: "offer-1".into(),
            counter: 0,
            difficulty: 0,
        }
    }

    fn hard_pow() -> ProofOfWork {
        ProofOfWork {
            payload: "offer-1".into(),
            counter: 0,
            difficulty: 256,
        }
    }

    async fn private_service() -> Arc<TradePrivateChannelService> {
        let book = Arc::new(StaticProfileBook::new(UserProfile::new("me", "Me")));
        book.add(UserProfile::new("alice", "Alice")).await;
        TradePrivateChannelService::new(
            Arc::new(MemoryStorage::new()),
            Arc::clone(&book) as Arc<dyn IdentityService>,
            book as Arc<dyn ProfileLookup>,
            Arc::new(Sha256PowVerifier),
        )
    }

    #[tokio::test]
    async fn test_market_channel_find_or_create() {
        let service = TradePublicChannelService::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryNetwork::new()),
        );
        let first = service.find_or_create_market_channel("BTC/EUR").await;
        let second = service.find_or_create_market_channel("BTC/EUR").await;
        assert_eq!(first, second);
        assert_eq!(service.channels().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_eager_market_seeds() {
        let service = TradePublicChannelService::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryNetwork::new()),
        );
        service.initialize().await.unwrap();
        assert!(service.channels().await.is_empty());
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_announced_market_channel_is_merged() {
        let network = Arc::new(MemoryNetwork::new());
        let service = TradePublicChannelService::new(
            Arc::new(MemoryStorage::new()),
            Arc::clone(&network) as Arc<dyn Network>,
        );
        service.initialize().await.unwrap();

        network
            .publish(
                MARKET_FEED,
                serde_json::to_value(TradePublicChannel::new("BTC/JPY")).unwrap(),
            )
            .await
            .unwrap();

        for _ in 0..100 {
            if service.channels().await.iter().any(|c| c.market == "BTC/JPY") {
                service.shutdown().await.unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("announced market channel never merged");
    }

    #[tokio::test]
    async fn test_pow_gates_creation() {
        let service = private_service().await;
        let alice = UserProfile::new("alice", "Alice");

        let denied = service
            .maybe_create_channel("offer-1", &alice, &hard_pow())
            .await;
        assert!(matches!(denied, Err(ChannelError::ProofOfWorkRejected(_))));
        assert!(service.channels().await.is_empty());

        let channel = service
            .maybe_create_channel("offer-1", &alice, &easy_pow())
            .await
            .unwrap();
        assert_eq!(channel.trade_id, "offer-1");
    }

    #[tokio::test]
    async fn test_duplicate_trade_id_yields_existing() {
        let service = private_service().await;
        let alice = UserProfile::new("alice", "Alice");

        let first = service
            .maybe_create_channel("offer-1", &alice, &easy_pow())
            .await
            .unwrap();
        let second = service
            .maybe_create_channel("offer-1", &alice, &easy_pow())
            .await
            .unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(service.channels().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_rejected() {
        let service = private_service().await;
        let result = service
            .maybe_create_channel("offer-1", &UserProfile::new("stranger", "S"), &easy_pow())
            .await;
        assert!(matches!(result, Err(ChannelError::UnknownPeer(_))));
    }
}
