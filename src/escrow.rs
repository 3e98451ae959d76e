//! Escrow controller
//!
//! The two composite operations that span the wallet ledger and the
//! request/offer state machine. Each takes the store's write guard once,
//! re-validates every precondition inside it, and only then applies its
//! mutations, so a failure at any point leaves the pre-operation state
//! fully intact and concurrent calls serialize.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::{
    Offer, OfferStatus, RequestStatus, Role, ServiceRequest, Transaction, TransactionKind,
};
use crate::store::MarketStore;
use crate::EscrowResult;

/// Result of a successful offer acceptance
#[derive(Debug, Clone)]
pub struct AcceptOfferOutcome {
    pub offer: Offer,
    pub request: ServiceRequest,
    /// The escrow-hold debit recorded against the client's wallet
    pub hold: Transaction,
    /// Competing pending offers rejected in the same unit
    pub rejected_offers: usize,
}

/// Result of a successful service completion
#[derive(Debug, Clone)]
pub struct CompleteServiceOutcome {
    pub request: ServiceRequest,
    /// The release credit recorded against the artisan's wallet
    pub release: Transaction,
}

/// Orchestrates ledger and state machine as atomic units
#[derive(Clone)]
pub struct EscrowController {
    store: Arc<MarketStore>,
}

impl EscrowController {
    pub fn new(store: Arc<MarketStore>) -> Self {
        Self { store }
    }

    /// Accept an offer: hold the price in escrow, accept the chosen
    /// offer, reject the competing pending offers and move the request to
    /// `IN_PROGRESS`, all in one storage transaction.
    pub async fn accept_offer(
        &self,
        offer_id: Uuid,
        acting_client: Uuid,
    ) -> EscrowResult<AcceptOfferOutcome> {
        let mut store = self.store.write().await;

        // Re-validate everything inside the lock scope; a racing acceptance
        // on the same request already holds or held this guard.
        let offer = store.offer(offer_id)?.clone();
        let actor = store.user(acting_client)?;
        if actor.role != Role::Client {
            return Err(EscrowError::permission("only clients can accept offers"));
        }

        let request = store.request(offer.request_id)?.clone();
        if request.client_id != acting_client {
            return Err(EscrowError::permission(
                "offers can only be accepted by the request owner",
            ));
        }

        offer.validate_transition(OfferStatus::Accepted)?;
        request.validate_transition(RequestStatus::InProgress)?;

        let wallet = store.wallet(acting_client)?;
        if !wallet.has_sufficient_balance(offer.price.value()) {
            return Err(EscrowError::insufficient_funds(
                offer.price.value(),
                wallet.balance,
            ));
        }

        // Every precondition holds; apply the five mutations under the
        // same guard. None of them can fail past this point.
        let hold = store.debit(
            acting_client,
            offer.price,
            TransactionKind::HoldEscrow,
            Some(request.id),
            format!("Escrow hold for offer {}", offer.id),
        )?;

        let now = Utc::now();
        {
            let chosen = store.offer_mut(offer_id)?;
            chosen.status = OfferStatus::Accepted;
            chosen.updated_at = now;
        }
        let rejected_offers = store.reject_other_pending_offers(request.id, offer_id, now);
        let request = {
            let req = store.request_mut(request.id)?;
            req.status = RequestStatus::InProgress;
            req.assigned_artisan_id = Some(offer.artisan_id);
            req.updated_at = now;
            req.clone()
        };
        let offer = store.offer(offer_id)?.clone();

        info!(
            offer = %offer_id,
            request = %request.id,
            price = %offer.price,
            rejected_offers,
            "offer accepted, funds held in escrow"
        );

        Ok(AcceptOfferOutcome {
            offer,
            request,
            hold,
            rejected_offers,
        })
    }

    /// Confirm completion: release the escrowed price to the assigned
    /// artisan and move the request to its terminal `COMPLETED` state,
    /// in one storage transaction.
    pub async fn complete_service(
        &self,
        request_id: Uuid,
        acting_client: Uuid,
    ) -> EscrowResult<CompleteServiceOutcome> {
        let mut store = self.store.write().await;

        let request = store.request(request_id)?.clone();
        let actor = store.user(acting_client)?;
        if actor.role != Role::Client {
            return Err(EscrowError::permission(
                "only clients can confirm completion",
            ));
        }
        if request.client_id != acting_client {
            return Err(EscrowError::permission(
                "completion can only be confirmed by the request owner",
            ));
        }

        request.validate_transition(RequestStatus::Completed)?;

        let accepted = store
            .accepted_offer(request_id)
            .cloned()
            .ok_or_else(|| {
                EscrowError::state_conflict(format!(
                    "request {request_id} has no accepted offer"
                ))
            })?;

        // IN_PROGRESS implies an assignee; anything else is corruption.
        let artisan_id = request.assigned_artisan_id.ok_or_else(|| {
            EscrowError::internal(format!(
                "in-progress request {request_id} has no assigned artisan"
            ))
        })?;

        let release = store.credit(
            artisan_id,
            accepted.price,
            TransactionKind::ReleasePayment,
            Some(request_id),
            format!("Payment release for completed service {request_id}"),
        )?;

        let request = {
            let req = store.request_mut(request_id)?;
            req.status = RequestStatus::Completed;
            req.updated_at = Utc::now();
            req.clone()
        };

        info!(
            request = %request_id,
            artisan = %artisan_id,
            amount = %accepted.price,
            "service completed, escrow released"
        );

        Ok(CompleteServiceOutcome { request, release })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, ArtisanProfile, Category, UserAccount, VerificationStatus, Wallet};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MarketStore>,
        controller: EscrowController,
        client: Uuid,
        artisan: Uuid,
        request: Uuid,
        offer: Uuid,
    }

    async fn seed_user(store: &MarketStore, role: Role, balance: Decimal) -> Uuid {
        let user = UserAccount::new(
            format!("user-{}", Uuid::new_v4()),
            format!("{}@example.com", Uuid::new_v4()),
            None,
            role,
        );
        let id = user.id;
        let mut guard = store.write().await;
        let mut wallet = Wallet::new(id);
        if balance > Decimal::ZERO {
            wallet.balance = balance;
            guard.transactions.push(Transaction::new(
                id,
                balance,
                TransactionKind::Deposit,
                None,
                "seed deposit".into(),
            ));
        }
        guard.wallets.insert(id, wallet);
        if role == Role::Artisan {
            let mut profile = ArtisanProfile::new(id, "artisan".into());
            profile.verification_status = VerificationStatus::Verified;
            guard.profiles.insert(id, profile);
        }
        guard.users.insert(id, user);
        id
    }

    async fn fixture(client_balance: Decimal, price: Decimal) -> Fixture {
        let store = Arc::new(MarketStore::new());
        let client = seed_user(&store, Role::Client, client_balance).await;
        let artisan = seed_user(&store, Role::Artisan, Decimal::ZERO).await;

        let request = ServiceRequest::new(
            client,
            Category::Electrical,
            "rewire the hallway".into(),
            None,
            dec!(100),
            dec!(400),
        );
        let request_id = request.id;
        let offer = Offer::new(
            request_id,
            artisan,
            Amount::new(price).unwrap(),
            String::new(),
        );
        let offer_id = offer.id;
        {
            let mut guard = store.write().await;
            guard.requests.insert(request_id, request);
            guard.offers.insert(offer_id, offer);
        }

        Fixture {
            controller: EscrowController::new(store.clone()),
            store,
            client,
            artisan,
            request: request_id,
            offer: offer_id,
        }
    }

    #[tokio::test]
    async fn accept_offer_holds_funds_and_transitions_state() {
        let fx = fixture(dec!(150), dec!(150)).await;
        let outcome = fx
            .controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap();

        assert_eq!(outcome.offer.status, OfferStatus::Accepted);
        assert_eq!(outcome.request.status, RequestStatus::InProgress);
        assert_eq!(outcome.request.assigned_artisan_id, Some(fx.artisan));
        assert_eq!(outcome.hold.amount, dec!(-150));
        assert_eq!(outcome.hold.kind, TransactionKind::HoldEscrow);
        assert_eq!(outcome.hold.related_request_id, Some(fx.request));

        let guard = fx.store.read().await;
        let wallet = guard.wallet(fx.client).unwrap();
        assert_eq!(wallet.balance, dec!(0));
        assert_eq!(guard.ledger_total(fx.client), wallet.balance);
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_everything_untouched() {
        let fx = fixture(dec!(50), dec!(150)).await;
        let err = fx
            .controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap_err();

        match err {
            EscrowError::InsufficientFunds {
                required,
                available,
            } => {
                assert_eq!(required, dec!(150));
                assert_eq!(available, dec!(50));
            }
            other => panic!("unexpected error: {other}"),
        }

        let guard = fx.store.read().await;
        assert_eq!(guard.offer(fx.offer).unwrap().status, OfferStatus::Pending);
        assert_eq!(guard.request(fx.request).unwrap().status, RequestStatus::Open);
        assert_eq!(guard.wallet(fx.client).unwrap().balance, dec!(50));
        // Only the seed deposit is on record
        assert_eq!(guard.transactions_for(fx.client).len(), 1);
    }

    #[tokio::test]
    async fn accepting_a_settled_offer_is_a_state_conflict() {
        let fx = fixture(dec!(500), dec!(150)).await;
        fx.controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap();

        let err = fx
            .controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::StateConflict(_)));

        // No second debit happened
        let guard = fx.store.read().await;
        assert_eq!(guard.wallet(fx.client).unwrap().balance, dec!(350));
    }

    #[tokio::test]
    async fn only_the_owner_accepts() {
        let fx = fixture(dec!(500), dec!(150)).await;
        let stranger = seed_user(&fx.store, Role::Client, dec!(1000)).await;

        let err = fx
            .controller
            .accept_offer(fx.offer, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::Permission(_)));
    }

    #[tokio::test]
    async fn competing_pending_offers_are_rejected_in_bulk() {
        let fx = fixture(dec!(500), dec!(150)).await;
        let rival = seed_user(&fx.store, Role::Artisan, Decimal::ZERO).await;
        let rival_offer = Offer::new(
            fx.request,
            rival,
            Amount::new(dec!(180)).unwrap(),
            String::new(),
        );
        let rival_offer_id = rival_offer.id;
        fx.store
            .write()
            .await
            .offers
            .insert(rival_offer_id, rival_offer);

        let outcome = fx
            .controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap();
        assert_eq!(outcome.rejected_offers, 1);

        let guard = fx.store.read().await;
        assert_eq!(
            guard.offer(rival_offer_id).unwrap().status,
            OfferStatus::Rejected
        );
    }

    #[tokio::test]
    async fn complete_service_releases_escrow() {
        let fx = fixture(dec!(150), dec!(150)).await;
        fx.controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap();

        let outcome = fx
            .controller
            .complete_service(fx.request, fx.client)
            .await
            .unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Completed);
        assert_eq!(outcome.release.amount, dec!(150));
        assert_eq!(outcome.release.kind, TransactionKind::ReleasePayment);

        let guard = fx.store.read().await;
        let artisan_wallet = guard.wallet(fx.artisan).unwrap();
        assert_eq!(artisan_wallet.balance, dec!(150));
        assert_eq!(guard.ledger_total(fx.artisan), artisan_wallet.balance);
    }

    #[tokio::test]
    async fn completing_an_open_request_is_a_state_conflict() {
        let fx = fixture(dec!(150), dec!(150)).await;
        let err = fx
            .controller
            .complete_service(fx.request, fx.client)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::StateConflict(_)));
    }

    #[tokio::test]
    async fn completing_twice_is_a_state_conflict() {
        let fx = fixture(dec!(150), dec!(150)).await;
        fx.controller
            .accept_offer(fx.offer, fx.client)
            .await
            .unwrap();
        fx.controller
            .complete_service(fx.request, fx.client)
            .await
            .unwrap();

        let err = fx
            .controller
            .complete_service(fx.request, fx.client)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::StateConflict(_)));

        // The artisan was paid exactly once
        let guard = fx.store.read().await;
        assert_eq!(guard.wallet(fx.artisan).unwrap().balance, dec!(150));
    }
}
