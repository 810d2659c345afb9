use std::collections::HashMap;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
};

/// A displayable chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub nick_name: String,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, nick_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nick_name: nick_name.into(),
        }
    }
}

/// Resolves a participant reference to a displayable profile.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn get(&self, id: &str) -> Option<UserProfile>;
}

/// Supplies the local user's own profile.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn my_profile(&self) -> UserProfile;
}

/// In-memory profile book backing both lookup traits. The local profile
/// is always resolvable.
pub struct StaticProfileBook {
    me: UserProfile,
    known: RwLock<HashMap<String, UserProfile>>,
}

impl StaticProfileBook {
    pub fn new(me: UserProfile) -> Self {
        let mut known = HashMap::new();
        known.insert(me.id.clone(), me.clone());
        Self {
            me,
            known: RwLock::new(known),
        }
    }

    pub async fn add(&self, profile: UserProfile) {
        self.known.write().await.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileLookup for StaticProfileBook {
    async fn get(&self, id: &str) -> Option<UserProfile> {
        self.known.read().await.get(id).cloned()
    }
}

#[async_trait]
impl IdentityService for StaticProfileBook {
    async fn my_profile(&self) -> UserProfile {
        self.me.clone()
    }
}
