//! Channel entity model and channel-owning services.
//!
//! A channel belongs to exactly one of four variants and one domain; the
//! (variant, domain) pair determines the single service that owns it.
//! Services share the `Service` lifecycle from `haggle-common` and expose
//! ownership through the `ChannelService` trait.

pub mod channel;
pub mod private;
pub mod public;
pub mod selection;
pub mod service;
pub mod trade;

pub use {
    channel::{
        ChannelDomain, ChannelId, ChatChannel, CommonPublicChannel, TradePrivateChannel,
        TradePublicChannel, TwoPartyPrivateChannel,
    },
    private::TwoPartyPrivateChannelService,
    public::CommonPublicChannelService,
    selection::ChannelSelectionService,
    service::{ChannelError, ChannelService},
    trade::{TradePrivateChannelService, TradePublicChannelService},
};
