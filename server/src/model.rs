use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account as persisted
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    /// Unique, compared exactly as stored
    pub email: String,
    /// Argon2 PHC string, never serialized
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Outbound links shown on a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLinks {
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub stackoverflow: Option<String>,
}

/// The user-editable part of a profile. The handle is never part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    #[serde(flatten)]
    pub links: ProfileLinks,
    #[serde(default)]
    pub biography: String,
}

/// A public profile. `id` and `owner` both equal the owning account's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub handle: String,
    pub owner: Uuid,
    #[serde(flatten)]
    pub links: ProfileLinks,
    pub biography: String,
    /// Account ids following this profile
    pub followers: Vec<Uuid>,
    /// Profile ids the owner follows
    pub following: Vec<Uuid>,
}

impl Profile {
    pub fn is_followed_by(&self, account_id: Uuid) -> bool {
        self.followers.contains(&account_id)
    }
}

/// A profile about to be inserted
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub owner: Uuid,
    pub handle: String,
    pub input: ProfileInput,
}

/// The public-safe projection of an account, also the session token's claims payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub profile: Option<Profile>,
}

impl AccountView {
    pub fn new(account: &Account, profile: Option<Profile>) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            created_at: account.created_at,
            profile,
        }
    }
}

/// A profile looked up by handle, with its owner's name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile: Profile,
}

/// Acknowledgement returned by delete operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub deleted: bool,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Deleted {
    pub fn now() -> Self {
        Self {
            deleted: true,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Which side of the follow edge the actor ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    Following,
    NotFollowing,
}

impl FollowState {
    pub fn is_following(self) -> bool {
        matches!(self, FollowState::Following)
    }
}
