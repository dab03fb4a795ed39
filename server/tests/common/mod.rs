#![allow(dead_code)]

use std::sync::Arc;

use devhub::model::{AccountView, ProfileInput, ProfileLinks};
use devhub::state::{AppState, FollowPolicy, TokenConfig};
use devhub::store::MemoryStore;

pub const TEST_SECRET: &str = "test-signing-secret";
pub const TEST_ISSUER: &str = "devhub-tests";

pub fn app_state(policy: FollowPolicy) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        TokenConfig {
            secret: TEST_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
        },
        policy,
    )
}

pub fn strict_state() -> AppState {
    app_state(FollowPolicy::strict())
}

pub async fn register(state: &AppState, email: &str, first: &str, last: &str) -> AccountView {
    state
        .accounts
        .register(email, first, last, "password1")
        .await
        .expect("registration should succeed")
}

pub fn profile_input(website: &str) -> ProfileInput {
    ProfileInput {
        links: ProfileLinks {
            website: Some(website.to_string()),
            ..Default::default()
        },
        biography: "Writes code.".to_string(),
    }
}
