use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    haggle_common::{Service, Storage},
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
};

use crate::{
    channel::{ChannelDomain, ChatChannel},
    service::ChannelService,
};

/// Tracks the active channel of one domain.
///
/// Composed over the domain's owning services so a selection can be
/// validated: a channel no composed source owns is refused. The trade
/// domain's instance is composed over both trade singletons plus the
/// trade two-party service.
pub struct ChannelSelectionService {
    domain: ChannelDomain,
    storage: Arc<dyn Storage>,
    sources: Vec<Arc<dyn ChannelService>>,
    selected: RwLock<Option<ChatChannel>>,
}

impl ChannelSelectionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        domain: ChannelDomain,
        sources: Vec<Arc<dyn ChannelService>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            domain,
            storage,
            sources,
            selected: RwLock::new(None),
        })
    }

    fn storage_key(&self) -> String {
        format!("selection.{}", self.domain)
    }

    pub fn domain(&self) -> ChannelDomain {
        self.domain
    }

    pub async fn selected_channel(&self) -> Option<ChatChannel> {
        self.selected.read().await.clone()
    }

    /// Make `channel` the active channel. Returns `false` and leaves the
    /// selection untouched when no composed source owns the channel.
    pub async fn select_channel(&self, channel: ChatChannel) -> bool {
        if !self.is_selectable(&channel).await {
            warn!(domain = %self.domain, channel = %channel.id(), "refusing selection of unowned channel");
            return false;
        }
        debug!(domain = %self.domain, channel = %channel.id(), "channel selected");
        *self.selected.write().await = Some(channel);
        true
    }

    pub async fn deselect(&self) {
        *self.selected.write().await = None;
    }

    async fn is_selectable(&self, channel: &ChatChannel) -> bool {
        if channel.domain() != self.domain {
            return false;
        }
        let id = channel.id();
        for source in &self.sources {
            if source.contains(&id).await {
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl Service for ChannelSelectionService {
    fn name(&self) -> String {
        format!("{}.selection", self.domain)
    }

    async fn initialize(&self) -> Result<()> {
        info!(domain = %self.domain, "initialize channel selection service");
        // The restored channel was legal when persisted; it is not
        // re-validated here because sibling services restore concurrently
        // and in no particular order.
        if let Some(snapshot) = self.storage.load(&self.storage_key()).await? {
            let restored: Option<ChatChannel> = serde_json::from_value(snapshot)?;
            *self.selected.write().await = restored;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!(domain = %self.domain, "shutdown channel selection service");
        let snapshot = serde_json::to_value(&*self.selected.read().await)?;
        self.storage.store(&self.storage_key(), snapshot).await
    }
}
