use std::{collections::HashMap, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    haggle_channels::{
        ChannelDomain, ChannelSelectionService, ChannelService, ChatChannel,
        CommonPublicChannelService, TradePrivateChannelService, TradePublicChannelService,
        TwoPartyPrivateChannel, TwoPartyPrivateChannelService,
    },
    haggle_common::{
        IdentityService, LifecycleState, Network, PowVerifier, ProfileLookup, Service, Storage,
        UserProfile, service,
    },
    tokio::sync::RwLock,
    tracing::info,
};

use crate::domains::DOMAIN_SPECS;

/// Composition root and facade for all channel-service operations.
///
/// Constructed once from the shared collaborators; the service tables are
/// populated during construction and never mutated afterwards, so reads
/// need no locking. Selection state lives solely in the per-domain
/// selection services and is never cached here.
pub struct ChatService {
    trade_public: Arc<TradePublicChannelService>,
    trade_private: Arc<TradePrivateChannelService>,
    common_public: HashMap<ChannelDomain, Arc<CommonPublicChannelService>>,
    two_party: HashMap<ChannelDomain, Arc<TwoPartyPrivateChannelService>>,
    selection: HashMap<ChannelDomain, Arc<ChannelSelectionService>>,
    state: RwLock<LifecycleState>,
}

impl ChatService {
    pub fn new(
        storage: Arc<dyn Storage>,
        network: Arc<dyn Network>,
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileLookup>,
        pow: Arc<dyn PowVerifier>,
    ) -> Arc<Self> {
        let trade_public =
            TradePublicChannelService::new(Arc::clone(&storage), Arc::clone(&network));
        let trade_private = TradePrivateChannelService::new(
            Arc::clone(&storage),
            Arc::clone(&identity),
            Arc::clone(&profiles),
            Arc::clone(&pow),
        );

        let mut common_public = HashMap::new();
        let mut two_party = HashMap::new();
        let mut selection = HashMap::new();

        for spec in DOMAIN_SPECS {
            let private = TwoPartyPrivateChannelService::new(
                Arc::clone(&storage),
                Arc::clone(&identity),
                Arc::clone(&profiles),
                spec.domain,
            );
            two_party.insert(spec.domain, Arc::clone(&private));

            // Selection services come last: they compose the domain's
            // channel services.
            let sources: Vec<Arc<dyn ChannelService>> = if spec.privileged {
                vec![
                    Arc::clone(&trade_public) as Arc<dyn ChannelService>,
                    Arc::clone(&trade_private) as Arc<dyn ChannelService>,
                    private as Arc<dyn ChannelService>,
                ]
            } else {
                let public = CommonPublicChannelService::new(
                    Arc::clone(&storage),
                    Arc::clone(&network),
                    spec.domain,
                    spec.seed_topics,
                );
                common_public.insert(spec.domain, Arc::clone(&public));
                vec![
                    public as Arc<dyn ChannelService>,
                    private as Arc<dyn ChannelService>,
                ]
            };
            selection.insert(
                spec.domain,
                ChannelSelectionService::new(Arc::clone(&storage), spec.domain, sources),
            );
        }

        Arc::new(Self {
            trade_public,
            trade_private,
            common_public,
            two_party,
            selection,
            state: RwLock::new(LifecycleState::Uninitialized),
        })
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Resolve a channel instance to the single service that owns it.
    ///
    /// The common variants key into the per-domain tables; the trade
    /// variants resolve to their singleton outright, domain unregarded.
    /// A domain missing from a table is a wiring-contract violation.
    pub fn find_channel_service(
        &self,
        channel: Option<&ChatChannel>,
    ) -> Option<Arc<dyn ChannelService>> {
        let channel = channel?;
        let service: Arc<dyn ChannelService> = match channel {
            ChatChannel::CommonPublic(c) => {
                Arc::clone(self.common_public.get(&c.domain).unwrap_or_else(|| {
                    panic!("no public channel service wired for domain {}", c.domain)
                })) as Arc<dyn ChannelService>
            },
            ChatChannel::TwoPartyPrivate(c) => {
                Arc::clone(self.two_party.get(&c.domain).unwrap_or_else(|| {
                    panic!("no private channel service wired for domain {}", c.domain)
                })) as Arc<dyn ChannelService>
            },
            ChatChannel::TradePublic(_) => {
                Arc::clone(&self.trade_public) as Arc<dyn ChannelService>
            },
            ChatChannel::TradePrivate(_) => {
                Arc::clone(&self.trade_private) as Arc<dyn ChannelService>
            },
        };
        Some(service)
    }

    /// Find or create the 1:1 channel with `peer` in `domain` and, if one
    /// is produced, make it the domain's selected channel. An invalid peer
    /// changes nothing. Create and select are two steps, not one
    /// transaction.
    pub async fn create_and_select_two_party_private_channel(
        &self,
        domain: ChannelDomain,
        peer: &UserProfile,
    ) -> Option<TwoPartyPrivateChannel> {
        let service = self.two_party.get(&domain).unwrap_or_else(|| {
            panic!("no private channel service wired for domain {domain}")
        });
        let channel = service.maybe_create_channel(peer).await?;
        self.selection_service(domain)
            .select_channel(ChatChannel::TwoPartyPrivate(channel.clone()))
            .await;
        Some(channel)
    }

    /// Total over every configured domain; an unconfigured domain is a
    /// caller contract violation.
    pub fn selection_service(&self, domain: ChannelDomain) -> Arc<ChannelSelectionService> {
        Arc::clone(
            self.selection
                .get(&domain)
                .unwrap_or_else(|| panic!("no selection service wired for domain {domain}")),
        )
    }

    /// Narrowing accessor for the privileged domain's selection service.
    pub fn trade_selection_service(&self) -> Arc<ChannelSelectionService> {
        self.selection_service(ChannelDomain::Trade)
    }

    pub fn trade_public_channel_service(&self) -> &Arc<TradePublicChannelService> {
        &self.trade_public
    }

    pub fn trade_private_channel_service(&self) -> &Arc<TradePrivateChannelService> {
        &self.trade_private
    }

    pub fn common_public_channel_services(
        &self,
    ) -> &HashMap<ChannelDomain, Arc<CommonPublicChannelService>> {
        &self.common_public
    }

    pub fn two_party_private_channel_services(
        &self,
    ) -> &HashMap<ChannelDomain, Arc<TwoPartyPrivateChannelService>> {
        &self.two_party
    }

    pub fn selection_services(&self) -> &HashMap<ChannelDomain, Arc<ChannelSelectionService>> {
        &self.selection
    }

    fn all_services(&self) -> Vec<Arc<dyn Service>> {
        let mut services: Vec<Arc<dyn Service>> = vec![
            Arc::clone(&self.trade_public) as Arc<dyn Service>,
            Arc::clone(&self.trade_private) as Arc<dyn Service>,
        ];
        services.extend(
            self.common_public
                .values()
                .map(|s| Arc::clone(s) as Arc<dyn Service>),
        );
        services.extend(
            self.two_party
                .values()
                .map(|s| Arc::clone(s) as Arc<dyn Service>),
        );
        services.extend(
            self.selection
                .values()
                .map(|s| Arc::clone(s) as Arc<dyn Service>),
        );
        services
    }
}

#[async_trait]
impl Service for ChatService {
    fn name(&self) -> String {
        "chat".to_string()
    }

    /// Fan `initialize` out to every owned service concurrently. All
    /// sub-operations run to completion; succeeds iff every one of them
    /// succeeded. No partial-success surface.
    async fn initialize(&self) -> Result<()> {
        info!("initialize");
        *self.state.write().await = LifecycleState::Initializing;
        let result = service::initialize_all(&self.all_services()).await;
        *self.state.write().await = if result.is_ok() {
            LifecycleState::Ready
        } else {
            LifecycleState::Failed
        };
        result
    }

    /// Symmetric fan-out tear-down. Safe after a failed `initialize`.
    async fn shutdown(&self) -> Result<()> {
        info!("shutdown");
        *self.state.write().await = LifecycleState::ShuttingDown;
        let result = service::shutdown_all(&self.all_services()).await;
        *self.state.write().await = if result.is_ok() {
            LifecycleState::Stopped
        } else {
            LifecycleState::Failed
        };
        result
    }
}
