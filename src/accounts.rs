//! Account registration and artisan verification state
//!
//! Wallet creation happens here, in the same storage transaction that
//! creates the account, so later lookups can assume the wallet exists.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::{ArtisanProfile, Role, UserAccount, VerificationStatus, Wallet};
use crate::store::MarketStore;
use crate::verification::VerificationQueue;
use crate::EscrowResult;

/// Account registration request
#[derive(Debug, Clone)]
pub struct RegisterAccountRequest {
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    /// Display name for artisan profiles; defaults to the username
    pub display_name: Option<String>,
}

/// Account registration and verification write-backs
#[derive(Clone)]
pub struct AccountService {
    store: Arc<MarketStore>,
    verification: VerificationQueue,
}

impl AccountService {
    pub fn new(store: Arc<MarketStore>, verification: VerificationQueue) -> Self {
        Self {
            store,
            verification,
        }
    }

    /// Register an account. The user record, its wallet and (for
    /// artisans) the profile are created in one atomic unit.
    pub async fn register(&self, request: RegisterAccountRequest) -> EscrowResult<UserAccount> {
        if request.username.trim().is_empty() {
            return Err(EscrowError::validation("username cannot be empty"));
        }
        if request.email.trim().is_empty() || !request.email.contains('@') {
            return Err(EscrowError::validation("a valid email is required"));
        }

        let mut store = self.store.write().await;
        if store
            .users
            .values()
            .any(|u| u.username == request.username || u.email == request.email)
        {
            return Err(EscrowError::validation(
                "username or email is already registered",
            ));
        }

        let user = UserAccount::new(
            request.username.clone(),
            request.email,
            request.phone_number,
            request.role,
        );
        store.wallets.insert(user.id, Wallet::new(user.id));
        if request.role == Role::Artisan {
            let display_name = request.display_name.unwrap_or(request.username);
            store
                .profiles
                .insert(user.id, ArtisanProfile::new(user.id, display_name));
        }
        store.users.insert(user.id, user.clone());

        info!(user = %user.id, role = ?user.role, "account registered");
        Ok(user)
    }

    /// Attach an ID photo to an artisan profile and queue the quality
    /// check. The caller gets an immediate acknowledgement; the status is
    /// written back by the verification worker.
    pub async fn submit_id_photo(&self, user_id: Uuid, photo_url: String) -> EscrowResult<()> {
        if photo_url.trim().is_empty() {
            return Err(EscrowError::validation("photo URL cannot be empty"));
        }

        {
            let mut store = self.store.write().await;
            let user = store.user(user_id)?;
            if user.role != Role::Artisan {
                return Err(EscrowError::permission(
                    "only artisans submit identity documents",
                ));
            }

            let profile = store.profile_mut(user_id)?;
            profile.national_id_photo = Some(photo_url);
            profile.verification_status = VerificationStatus::Unverified;
            profile.rejection_reason = None;
            profile.updated_at = Utc::now();
        }

        self.verification.enqueue(user_id).await?;
        info!(user = %user_id, "ID photo submitted, verification queued");
        Ok(())
    }

    /// Settle a profile that passed the automated quality check. This is
    /// the write-back seam used by the back-office review; it only acts on
    /// profiles in `PENDING_REVIEW`.
    pub async fn review_verification(
        &self,
        user_id: Uuid,
        approved: bool,
        reason: Option<String>,
    ) -> EscrowResult<ArtisanProfile> {
        let mut store = self.store.write().await;
        let profile = store.profile_mut(user_id)?;

        if profile.verification_status != VerificationStatus::PendingReview {
            return Err(EscrowError::state_conflict(format!(
                "profile of user {user_id} is not awaiting review"
            )));
        }

        if approved {
            profile.verification_status = VerificationStatus::Verified;
            profile.rejection_reason = None;
        } else {
            profile.verification_status = VerificationStatus::Rejected;
            profile.rejection_reason = reason;
        }
        profile.updated_at = Utc::now();

        info!(user = %user_id, approved, "verification review recorded");
        Ok(profile.clone())
    }

    /// Profile snapshot for an artisan
    pub async fn profile(&self, user_id: Uuid) -> EscrowResult<ArtisanProfile> {
        let store = self.store.read().await;
        Ok(store.profile(user_id)?.clone())
    }
}
