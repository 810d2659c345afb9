//! Multi-domain channel registry and lifecycle orchestrator.
//!
//! `ChatService` is the single composition root for all channel-management
//! services: it wires the per-domain public/private/selection services from
//! a declarative domain table, fans lifecycle calls out to every owned
//! service, and resolves any channel instance back to its owning service.

pub mod domains;
pub mod registry;

pub use {
    domains::{DOMAIN_SPECS, DomainSpec},
    registry::ChatService,
};
