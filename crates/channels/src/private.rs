use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    haggle_common::{IdentityService, ProfileLookup, Service, Storage, UserProfile},
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::{
    channel::{ChannelDomain, ChannelId, ChatChannel, TwoPartyPrivateChannel},
    service::ChannelService,
};

/// Owns the 1:1 private channels of one domain, including the trade
/// domain. Channels are created on demand, one per peer.
pub struct TwoPartyPrivateChannelService {
    domain: ChannelDomain,
    storage: Arc<dyn Storage>,
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileLookup>,
    channels: Arc<RwLock<Vec<TwoPartyPrivateChannel>>>,
}

impl TwoPartyPrivateChannelService {
    pub fn new(
        storage: Arc<dyn Storage>,
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileLookup>,
        domain: ChannelDomain,
    ) -> Arc<Self> {
        Arc::new(Self {
            domain,
            storage,
            identity,
            profiles,
            channels: Arc::new(RwLock::new(Vec::new())),
        })
    }

    fn storage_key(&self) -> String {
        format!("channels.{}.private", self.domain)
    }

    pub async fn channels(&self) -> Vec<TwoPartyPrivateChannel> {
        self.channels.read().await.clone()
    }

    /// Find or create the channel for `peer`. Yields `None` for an invalid
    /// peer: empty id, the local user, or a profile the lookup cannot
    /// resolve. Both duplicate and invalid requests are silent no-ops.
    pub async fn maybe_create_channel(&self, peer: &UserProfile) -> Option<TwoPartyPrivateChannel> {
        let me = self.identity.my_profile().await;
        if peer.id.is_empty() || peer.id == me.id {
            debug!(domain = %self.domain, peer = %peer.id, "refusing channel with self or empty peer");
            return None;
        }
        if self.profiles.get(&peer.id).await.is_none() {
            debug!(domain = %self.domain, peer = %peer.id, "peer profile not resolvable");
            return None;
        }

        let id = ChannelId::two_party(self.domain, &me.id, &peer.id);
        let mut channels = self.channels.write().await;
        if let Some(existing) = channels.iter().find(|c| c.id() == id) {
            return Some(existing.clone());
        }
        let channel = TwoPartyPrivateChannel::new(self.domain, me, peer.clone());
        debug!(channel = %channel.id(), "created two-party private channel");
        channels.push(channel.clone());
        Some(channel)
    }
}

#[async_trait]
impl Service for TwoPartyPrivateChannelService {
    fn name(&self) -> String {
        format!("{}.private", self.domain)
    }

    async fn initialize(&self) -> Result<()> {
        info!(domain = %self.domain, "initialize private channel service");
        if let Some(snapshot) = self.storage.load(&self.storage_key()).await? {
            let persisted: Vec<TwoPartyPrivateChannel> = serde_json::from_value(snapshot)?;
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
        info!(domain = %self.domain, "shutdown private channel service");
        let snapshot = serde_json::to_value(&*self.channels.read().await)?;
        self.storage.store(&self.storage_key(), snapshot).await
    }
}

#[async_trait]
impl ChannelService for TwoPartyPrivateChannelService {
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
            .map(ChatChannel::TwoPartyPrivate)
    }
}
