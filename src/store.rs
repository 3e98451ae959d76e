//! Transactional in-memory store for all marketplace state
//!
//! Every collection lives behind a single `RwLock`; holding the write guard
//! is the storage-level transaction. Composite operations take the guard
//! once, re-validate their preconditions inside it, and apply all of their
//! mutations under it, so any two operations touching the same wallet or
//! request serialize against each other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::{
    ArtisanProfile, Offer, OfferStatus, ServiceRequest, Transaction, UserAccount, Wallet,
};
use crate::EscrowResult;

/// Shared store handle. Services hold this behind an `Arc`.
#[derive(Debug, Default)]
pub struct MarketStore {
    inner: RwLock<StoreInner>,
}

/// The guarded state. Fields are crate-private; external callers go
/// through the ledger, marketplace and escrow services.
#[derive(Debug, Default)]
pub struct StoreInner {
    pub(crate) users: HashMap<Uuid, UserAccount>,
    pub(crate) profiles: HashMap<Uuid, ArtisanProfile>,
    pub(crate) wallets: HashMap<Uuid, Wallet>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) requests: HashMap<Uuid, ServiceRequest>,
    pub(crate) offers: HashMap<Uuid, Offer>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read access
    pub async fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().await
    }

    /// Exclusive access; the guard spans one storage transaction
    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().await
    }
}

impl StoreInner {
    pub fn user(&self, id: Uuid) -> EscrowResult<&UserAccount> {
        self.users
            .get(&id)
            .ok_or_else(|| EscrowError::not_found(format!("user {id}")))
    }

    pub fn profile(&self, user_id: Uuid) -> EscrowResult<&ArtisanProfile> {
        self.profiles
            .get(&user_id)
            .ok_or_else(|| EscrowError::not_found(format!("artisan profile for user {user_id}")))
    }

    pub(crate) fn profile_mut(&mut self, user_id: Uuid) -> EscrowResult<&mut ArtisanProfile> {
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| EscrowError::not_found(format!("artisan profile for user {user_id}")))
    }

    pub fn wallet(&self, user_id: Uuid) -> EscrowResult<&Wallet> {
        self.wallets
            .get(&user_id)
            .ok_or_else(|| EscrowError::not_found(format!("wallet for user {user_id}")))
    }

    pub(crate) fn wallet_mut(&mut self, user_id: Uuid) -> EscrowResult<&mut Wallet> {
        self.wallets
            .get_mut(&user_id)
            .ok_or_else(|| EscrowError::not_found(format!("wallet for user {user_id}")))
    }

    pub fn request(&self, id: Uuid) -> EscrowResult<&ServiceRequest> {
        self.requests
            .get(&id)
            .ok_or_else(|| EscrowError::not_found(format!("service request {id}")))
    }

    pub(crate) fn request_mut(&mut self, id: Uuid) -> EscrowResult<&mut ServiceRequest> {
        self.requests
            .get_mut(&id)
            .ok_or_else(|| EscrowError::not_found(format!("service request {id}")))
    }

    pub fn offer(&self, id: Uuid) -> EscrowResult<&Offer> {
        self.offers
            .get(&id)
            .ok_or_else(|| EscrowError::not_found(format!("offer {id}")))
    }

    pub(crate) fn offer_mut(&mut self, id: Uuid) -> EscrowResult<&mut Offer> {
        self.offers
            .get_mut(&id)
            .ok_or_else(|| EscrowError::not_found(format!("offer {id}")))
    }

    /// All offers on a request, newest first
    pub fn offers_for_request(&self, request_id: Uuid) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .offers
            .values()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        offers
    }

    /// The accepted offer on a request, if any. The state machine
    /// guarantees there is at most one.
    pub fn accepted_offer(&self, request_id: Uuid) -> Option<&Offer> {
        self.offers
            .values()
            .find(|o| o.request_id == request_id && o.status == OfferStatus::Accepted)
    }

    pub fn has_offer_from(&self, request_id: Uuid, artisan_id: Uuid) -> bool {
        self.offers
            .values()
            .any(|o| o.request_id == request_id && o.artisan_id == artisan_id)
    }

    /// Reject every pending offer on a request except `accepted_id`.
    /// Returns the number of offers rejected.
    pub(crate) fn reject_other_pending_offers(
        &mut self,
        request_id: Uuid,
        accepted_id: Uuid,
        now: DateTime<Utc>,
    ) -> usize {
        let mut rejected = 0;
        for offer in self.offers.values_mut() {
            if offer.request_id == request_id
                && offer.id != accepted_id
                && offer.status == OfferStatus::Pending
            {
                offer.status = OfferStatus::Rejected;
                offer.updated_at = now;
                rejected += 1;
            }
        }
        rejected
    }

    /// Transaction history for a wallet, newest first
    pub fn transactions_for(&self, user_id: Uuid) -> Vec<Transaction> {
        let mut history: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.wallet_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history
    }

    /// Sum of all recorded amounts for a wallet. Must always equal the
    /// wallet balance.
    pub fn ledger_total(&self, user_id: Uuid) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.wallet_id == user_id)
            .map(|t| t.amount)
            .sum()
    }
}
