use {async_trait::async_trait, haggle_common::Service, thiserror::Error};

use crate::channel::{ChannelDomain, ChannelId, ChatChannel};

/// Common surface of every channel-owning service. The registry hands
/// these out when resolving a channel instance back to its owner.
#[async_trait]
pub trait ChannelService: Service {
    fn domain(&self) -> ChannelDomain;

    async fn find_by_id(&self, id: &ChannelId) -> Option<ChatChannel>;

    async fn contains(&self, id: &ChannelId) -> bool {
        self.find_by_id(id).await.is_some()
    }
}

/// Errors of gated channel creation. Idempotent duplicates and invalid
/// peers of ungated channels are silent no-ops, not errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("proof of work rejected for trade {0}")]
    ProofOfWorkRejected(String),
    #[error("unknown peer {0}")]
    UnknownPeer(String),
}
