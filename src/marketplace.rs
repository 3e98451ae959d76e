//! Request and offer lifecycle outside the escrow transitions
//!
//! Creation and listing of service requests, and offer submission by
//! verified artisans. Role capability is checked once here, at the
//! service boundary; the escrow controller owns every later transition.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::{Amount, Category, Offer, RequestStatus, Role, ServiceRequest};
use crate::pricing::PriceEstimator;
use crate::store::MarketStore;
use crate::EscrowResult;

/// Configuration for the marketplace service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Upper bound for a single offer price in EGP
    pub max_offer_price: Decimal,
    /// Require the artisan profile to be verified before accepting offers
    pub require_verified_artisans: bool,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            max_offer_price: dec!(1_000_000),
            require_verified_artisans: true,
        }
    }
}

/// Service request creation parameters
#[derive(Debug, Clone)]
pub struct CreateRequestParams {
    pub client_id: Uuid,
    pub category: Category,
    pub description: String,
    pub media_url: Option<String>,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
}

/// Offer submission parameters
#[derive(Debug, Clone)]
pub struct SubmitOfferParams {
    pub request_id: Uuid,
    pub artisan_id: Uuid,
    pub price: Decimal,
    pub message: String,
}

/// Listing filter; `None` fields match everything
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub category: Option<Category>,
}

/// Marketplace service for requests and offers
#[derive(Clone)]
pub struct Marketplace {
    config: MarketplaceConfig,
    store: Arc<MarketStore>,
    estimator: PriceEstimator,
}

impl Marketplace {
    pub fn new(config: MarketplaceConfig, store: Arc<MarketStore>) -> Self {
        Self {
            config,
            store,
            estimator: PriceEstimator::new(),
        }
    }

    /// Create a service request. Clients only; the advisory price band is
    /// attached on a best-effort basis.
    pub async fn create_request(
        &self,
        params: CreateRequestParams,
    ) -> EscrowResult<ServiceRequest> {
        self.validate_create_request(&params)?;

        let mut store = self.store.write().await;
        let user = store.user(params.client_id)?;
        if user.role != Role::Client {
            return Err(EscrowError::permission(
                "only clients can create service requests",
            ));
        }

        let mut request = ServiceRequest::new(
            params.client_id,
            params.category,
            params.description,
            params.media_url,
            params.budget_min,
            params.budget_max,
        );

        // Advisory only: a failed estimate never blocks creation.
        match self.estimator.estimate(request.category, &request.description) {
            Ok(band) => request.ai_suggested_price = Some(band.label()),
            Err(err) => warn!(request = %request.id, %err, "price estimation unavailable"),
        }

        store.requests.insert(request.id, request.clone());
        info!(request = %request.id, client = %request.client_id, "service request created");
        Ok(request)
    }

    /// Submit an offer on an open request. Verified artisans only, one
    /// offer per artisan per request.
    pub async fn submit_offer(&self, params: SubmitOfferParams) -> EscrowResult<Offer> {
        let price = Amount::new(params.price)?;
        if params.price > self.config.max_offer_price {
            return Err(EscrowError::validation(format!(
                "offer price {} exceeds the maximum of {} EGP",
                params.price, self.config.max_offer_price
            )));
        }

        let mut store = self.store.write().await;
        let user = store.user(params.artisan_id)?;
        if user.role != Role::Artisan {
            return Err(EscrowError::permission("only artisans can submit offers"));
        }

        if self.config.require_verified_artisans {
            let profile = store.profile(params.artisan_id)?;
            if !profile.is_verified() {
                return Err(EscrowError::permission(
                    "identity verification is required before submitting offers",
                ));
            }
        }

        let request = store.request(params.request_id)?;
        if !request.status.can_accept_offers() {
            return Err(EscrowError::state_conflict(format!(
                "request {} is no longer accepting offers",
                request.id
            )));
        }
        if store.has_offer_from(params.request_id, params.artisan_id) {
            return Err(EscrowError::state_conflict(
                "an offer for this request was already submitted",
            ));
        }

        let offer = Offer::new(params.request_id, params.artisan_id, price, params.message);
        store.offers.insert(offer.id, offer.clone());

        info!(offer = %offer.id, request = %params.request_id, price = %price, "offer submitted");
        Ok(offer)
    }

    /// Cancel an open request. Owner only; pending offers on it are
    /// rejected in the same storage transaction. No funds are involved,
    /// escrow is only held at acceptance.
    pub async fn cancel_request(
        &self,
        request_id: Uuid,
        acting_client: Uuid,
    ) -> EscrowResult<ServiceRequest> {
        let mut store = self.store.write().await;
        let request = store.request(request_id)?;
        if request.client_id != acting_client {
            return Err(EscrowError::permission(
                "requests can only be cancelled by their owner",
            ));
        }
        request.validate_transition(RequestStatus::Cancelled)?;

        let now = chrono::Utc::now();
        let rejected = store.reject_other_pending_offers(request_id, Uuid::nil(), now);
        let request = {
            let req = store.request_mut(request_id)?;
            req.status = RequestStatus::Cancelled;
            req.updated_at = now;
            req.clone()
        };

        info!(request = %request_id, rejected, "service request cancelled");
        Ok(request)
    }

    /// List requests visible to the viewer: clients see their own,
    /// artisans see open requests, admins see everything.
    pub async fn list_requests(
        &self,
        viewer_id: Uuid,
        filter: RequestFilter,
    ) -> EscrowResult<Vec<ServiceRequest>> {
        let store = self.store.read().await;
        let viewer = store.user(viewer_id)?;

        let mut requests: Vec<ServiceRequest> = store
            .requests
            .values()
            .filter(|r| match viewer.role {
                Role::Client => r.client_id == viewer_id,
                Role::Artisan => r.status == RequestStatus::Open,
                Role::Admin => true,
            })
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Fetch one request. Clients can only see their own; a foreign id
    /// reads as absent rather than revealing ownership.
    pub async fn get_request(
        &self,
        viewer_id: Uuid,
        request_id: Uuid,
    ) -> EscrowResult<ServiceRequest> {
        let store = self.store.read().await;
        let viewer = store.user(viewer_id)?;
        let request = store.request(request_id)?;

        if viewer.role == Role::Client && request.client_id != viewer_id {
            return Err(EscrowError::not_found(format!("service request {request_id}")));
        }
        Ok(request.clone())
    }

    /// Offers on a request, newest first. The owning client sees all of
    /// them; an artisan sees only their own.
    pub async fn list_offers(&self, viewer_id: Uuid, request_id: Uuid) -> EscrowResult<Vec<Offer>> {
        let store = self.store.read().await;
        let viewer = store.user(viewer_id)?;
        let request = store.request(request_id)?;

        let offers = store.offers_for_request(request_id);
        if request.client_id == viewer_id || viewer.role == Role::Admin {
            return Ok(offers);
        }
        if viewer.role == Role::Artisan {
            return Ok(offers
                .into_iter()
                .filter(|o| o.artisan_id == viewer_id)
                .collect());
        }
        // A non-owning client reads the request as absent, same as
        // get_request; ownership is not revealed.
        Err(EscrowError::not_found(format!("service request {request_id}")))
    }

    fn validate_create_request(&self, params: &CreateRequestParams) -> EscrowResult<()> {
        if params.description.trim().is_empty() {
            return Err(EscrowError::validation("description cannot be empty"));
        }
        if params.budget_min <= Decimal::ZERO || params.budget_max <= Decimal::ZERO {
            return Err(EscrowError::validation("budgets must be positive"));
        }
        if params.budget_min > params.budget_max {
            return Err(EscrowError::validation(
                "budget_min cannot exceed budget_max",
            ));
        }
        Ok(())
    }
}
