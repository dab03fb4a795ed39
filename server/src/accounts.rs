use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::handle::generate_handle;
use crate::model::{Account, AccountView, Deleted, NewAccount, Profile};
use crate::password::{hash_password, verify_password};
pub use crate::store::ACCOUNT_NOT_FOUND;
use crate::store::{CredentialStore, EMAIL_IN_USE};
use crate::token::{BearerToken, TokenIssuer};

pub const EMAIL_NOT_IN_USE: &str = "The provided email address is not in use.";
pub const PASSWORD_INVALID: &str = "The provided password is not valid.";

/// Replacement values for an account edit
#[derive(Debug, Clone)]
pub struct AccountChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `None` keeps the current password hash
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedAccount {
    pub account: AccountView,
    pub token: BearerToken,
}

/// Reissues a token after a mutation, failing if the account vanished in between
pub(crate) async fn fresh_token(tokens: &TokenIssuer, account_id: Uuid) -> ServiceResult<BearerToken> {
    tokens
        .issue(account_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))
}

#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
}

impl AccountManager {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Creates an account. Does not log the new account in.
    #[tracing::instrument(skip(self, password), err)]
    pub async fn register(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> ServiceResult<AccountView> {
        if self.store.account_by_email(email).await?.is_some() {
            return Err(ServiceError::conflict(EMAIL_IN_USE));
        }

        let password_hash = hash_password(password).await?;
        let account = self
            .store
            .insert_account(NewAccount {
                email: email.to_string(),
                password_hash,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await?;

        info!("Registered account {}", account.id);
        Ok(AccountView::new(&account, None))
    }

    /// Checks an email/password pair and issues a session token
    #[tracing::instrument(skip(self, password), err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<BearerToken> {
        let account = self
            .store
            .account_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(EMAIL_NOT_IN_USE))?;

        if !verify_password(password, &account.password_hash).await? {
            return Err(ServiceError::UnprocessableCredential(
                PASSWORD_INVALID.to_string(),
            ));
        }

        fresh_token(&self.tokens, account.id).await
    }

    /// Projects an account the auth layer already loaded; no storage access
    pub fn current(&self, account: &Account, profile: Option<Profile>) -> AccountView {
        AccountView::new(account, profile)
    }

    /// Overwrites names, email and (optionally) password. An owned profile gets
    /// its handle regenerated from the new names in the same write.
    #[tracing::instrument(skip(self, changes), err)]
    pub async fn edit(&self, account_id: Uuid, changes: AccountChanges) -> ServiceResult<EditedAccount> {
        let (mut account, profile) = self
            .store
            .account_with_profile(account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))?;

        if changes.email != account.email {
            if let Some(other) = self.store.account_by_email(&changes.email).await? {
                if other.id != account.id {
                    return Err(ServiceError::conflict(EMAIL_IN_USE));
                }
            }
        }

        account.first_name = changes.first_name;
        account.last_name = changes.last_name;
        account.email = changes.email;
        if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
            account.password_hash = hash_password(&password).await?;
        }

        let handle = profile
            .as_ref()
            .map(|_| generate_handle(&account.first_name, &account.last_name));

        if !self.store.save_account(&account, handle.as_deref()).await? {
            return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
        }

        info!("Edited account {}", account_id);

        let token = fresh_token(&self.tokens, account_id).await?;
        let profile = self.store.profile_by_id(account_id).await?;

        Ok(EditedAccount {
            account: AccountView::new(&account, profile),
            token,
        })
    }

    /// Deletes the account together with its profile and follow edges
    #[tracing::instrument(skip(self), err)]
    pub async fn delete(&self, account_id: Uuid) -> ServiceResult<Deleted> {
        if !self.store.delete_account(account_id).await? {
            return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
        }

        info!("Deleted account {}", account_id);
        Ok(Deleted::now())
    }

    /// Issues a token for an identity some other mechanism has already established
    #[tracing::instrument(skip(self), err)]
    pub async fn issue_token_for_external_identity(
        &self,
        account_id: Uuid,
    ) -> ServiceResult<BearerToken> {
        fresh_token(&self.tokens, account_id).await
    }
}
