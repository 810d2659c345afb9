//! Shared scaffolding for the haggle chat subsystem.
//!
//! Defines the asynchronous `Service` lifecycle trait with its fan-out
//! combinators, and the collaborator capabilities (storage, network,
//! identity/profile lookup, proof-of-work) that channel services consume
//! as opaque trait objects.

pub mod network;
pub mod pow;
pub mod profile;
pub mod service;
pub mod storage;

pub use {
    network::{MemoryNetwork, Network},
    pow::{PowVerifier, ProofOfWork, Sha256PowVerifier},
    profile::{IdentityService, ProfileLookup, StaticProfileBook, UserProfile},
    service::{LifecycleState, Service},
    storage::{MemoryStorage, Storage},
};
