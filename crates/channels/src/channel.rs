use std::fmt;

use {
    haggle_common::UserProfile,
    serde::{Deserialize, Serialize},
};

/// Partition of the chat space. `Trade` is the privileged domain with its
/// own specialized channel variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDomain {
    Trade,
    Discussion,
    Events,
    Support,
}

impl ChannelDomain {
    pub const ALL: [ChannelDomain; 4] = [
        ChannelDomain::Trade,
        ChannelDomain::Discussion,
        ChannelDomain::Events,
        ChannelDomain::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelDomain::Trade => "trade",
            ChannelDomain::Discussion => "discussion",
            ChannelDomain::Events => "events",
            ChannelDomain::Support => "support",
        }
    }
}

impl fmt::Display for ChannelDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured channel key: `<domain>:<kind>:<rest>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn common_public(domain: ChannelDomain, topic: &str) -> Self {
        Self(format!("{domain}:pub:{topic}"))
    }

    /// Participant order does not matter: the pair is sorted into the key.
    pub fn two_party(domain: ChannelDomain, a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{domain}:priv:{lo}:{hi}"))
    }

    pub fn trade_public(market: &str) -> Self {
        Self(format!("trade:market:{market}"))
    }

    pub fn trade_private(trade_id: &str, a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("trade:offer:{trade_id}:{lo}:{hi}"))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public topic channel; many per domain, seeded or created dynamically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonPublicChannel {
    pub domain: ChannelDomain,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CommonPublicChannel {
    pub fn new(domain: ChannelDomain, topic: impl Into<String>) -> Self {
        Self {
            domain,
            topic: topic.into(),
            description: None,
        }
    }

    pub fn id(&self) -> ChannelId {
        ChannelId::common_public(self.domain, &self.topic)
    }
}

/// 1:1 conversation between the local user and one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoPartyPrivateChannel {
    pub domain: ChannelDomain,
    pub me: UserProfile,
    pub peer: UserProfile,
}

impl TwoPartyPrivateChannel {
    pub fn new(domain: ChannelDomain, me: UserProfile, peer: UserProfile) -> Self {
        Self { domain, me, peer }
    }

    pub fn id(&self) -> ChannelId {
        ChannelId::two_party(self.domain, &self.me.id, &self.peer.id)
    }
}

/// Market/offer channel of the trade domain; populated from market
/// activity, never seeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePublicChannel {
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TradePublicChannel {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            description: None,
        }
    }

    pub fn id(&self) -> ChannelId {
        ChannelId::trade_public(&self.market)
    }
}

/// Private trade-negotiation channel; creation is proof-of-work gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrivateChannel {
    pub trade_id: String,
    pub me: UserProfile,
    pub peer: UserProfile,
}

impl TradePrivateChannel {
    pub fn new(trade_id: impl Into<String>, me: UserProfile, peer: UserProfile) -> Self {
        Self {
            trade_id: trade_id.into(),
            me,
            peer,
        }
    }

    pub fn id(&self) -> ChannelId {
        ChannelId::trade_private(&self.trade_id, &self.me.id, &self.peer.id)
    }
}

/// A conversation context. Exactly one variant, exactly one domain; the
/// trade variants always belong to [`ChannelDomain::Trade`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatChannel {
    CommonPublic(CommonPublicChannel),
    TwoPartyPrivate(TwoPartyPrivateChannel),
    TradePublic(TradePublicChannel),
    TradePrivate(TradePrivateChannel),
}

impl ChatChannel {
    pub fn id(&self) -> ChannelId {
        match self {
            ChatChannel::CommonPublic(c) => c.id(),
            ChatChannel::TwoPartyPrivate(c) => c.id(),
            ChatChannel::TradePublic(c) => c.id(),
            ChatChannel::TradePrivate(c) => c.id(),
        }
    }

    pub fn domain(&self) -> ChannelDomain {
        match self {
            ChatChannel::CommonPublic(c) => c.domain,
            ChatChannel::TwoPartyPrivate(c) => c.domain,
            ChatChannel::TradePublic(_) | ChatChannel::TradePrivate(_) => ChannelDomain::Trade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_party_id_ignores_participant_order() {
        let a = ChannelId::two_party(ChannelDomain::Discussion, "alice", "bob");
        let b = ChannelId::two_party(ChannelDomain::Discussion, "bob", "alice");
        assert_eq!(a, b);
        assert_eq!(a.0, "discussion:priv:alice:bob");
    }

    #[test]
    fn test_trade_variants_report_trade_domain() {
        let public = ChatChannel::TradePublic(TradePublicChannel::new("BTC/EUR"));
        let private = ChatChannel::TradePrivate(TradePrivateChannel::new(
            "offer-1",
            UserProfile::new("me", "Me"),
            UserProfile::new("peer", "Peer"),
        ));
        assert_eq!(public.domain(), ChannelDomain::Trade);
        assert_eq!(private.domain(), ChannelDomain::Trade);
    }

    #[test]
    fn test_channel_ids_are_domain_scoped() {
        let support = CommonPublicChannel::new(ChannelDomain::Support, "reports");
        let events = CommonPublicChannel::new(ChannelDomain::Events, "reports");
        assert_ne!(support.id(), events.id());
        assert_eq!(support.id().0, "support:pub:reports");
    }

    #[test]
    fn test_serde_tags_variants() {
        let channel = ChatChannel::CommonPublic(CommonPublicChannel::new(
            ChannelDomain::Discussion,
            "bitcoin",
        ));
        let value = serde_json::to_value(&channel).unwrap();
        assert_eq!(value["kind"], "common_public");
        assert_eq!(value["domain"], "discussion");
        let back: ChatChannel = serde_json::from_value(value).unwrap();
        assert_eq!(back, channel);
    }
}
