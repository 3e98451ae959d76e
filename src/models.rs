//! Core data models for the marketplace escrow engine
//!
//! This module contains the domain records, the request and offer state
//! machines, and the monetary value types shared by every service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::EscrowError;
use crate::EscrowResult;

/// A strictly positive monetary amount.
///
/// Ledger operations and offer prices only accept `Amount`, so a
/// non-positive figure is rejected before it can reach a wallet.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> EscrowResult<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EscrowError::validation("amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EscrowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account role, checked once at each service boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Artisan,
    Admin,
}

/// A registered account. Credential issuance lives outside the engine;
/// this record carries only what the escrow core needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(username: String, email: String, phone_number: Option<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            phone_number,
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Identity verification status for artisan profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Unverified,
    PendingReview,
    Verified,
    Rejected,
}

/// Artisan profile with identity-verification state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtisanProfile {
    pub user_id: Uuid,
    pub display_name: String,
    pub bio: String,
    pub national_id_photo: Option<String>,
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<String>,
    /// Confidence score from the photo quality check (0.0 to 1.0)
    pub id_confidence_score: f64,
    pub rating_avg: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArtisanProfile {
    pub fn new(user_id: Uuid, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            bio: String::new(),
            national_id_photo: None,
            verification_status: VerificationStatus::Unverified,
            rejection_reason: None,
            id_confidence_score: 0.0,
            rating_avg: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

/// User wallet. One per account, created in the same atomic unit as the
/// account itself. Invariant: `balance` equals the sum of all transaction
/// amounts recorded against this wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_sufficient_balance(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

/// Ledger entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    HoldEscrow,
    ReleasePayment,
    Withdrawal,
    Refund,
}

/// Append-only ledger entry. Never updated or deleted once recorded;
/// the transaction history is the source of audit truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Owning wallet, keyed by the wallet owner's user id
    pub wallet_id: Uuid,
    /// Signed amount: positive for credit, negative for debit
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub related_request_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        wallet_id: Uuid,
        amount: Decimal,
        kind: TransactionKind,
        related_request_id: Option<Uuid>,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            amount,
            kind,
            related_request_id,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Plumbing,
    Carpentry,
    Electrical,
    Painting,
    Cleaning,
    #[serde(rename = "HVAC")]
    Hvac,
    General,
}

/// Service request state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Accepting offers
    Open,
    /// An offer was accepted, funds are held in escrow
    InProgress,
    /// Completion confirmed, escrow released
    Completed,
    /// Explicitly cancelled while still open
    Cancelled,
}

impl RequestStatus {
    /// Check if this is a terminal state (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check if this state allows new or accepted offers
    pub fn can_accept_offers(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// A job posting by a client. Category, description and budgets are fixed
/// at creation; status is advanced only by the escrow controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub category: Category,
    pub description: String,
    pub media_url: Option<String>,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    /// Advisory price band label, e.g. "150-200 EGP"
    pub ai_suggested_price: Option<String>,
    pub status: RequestStatus,
    pub assigned_artisan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn new(
        client_id: Uuid,
        category: Category,
        description: String,
        media_url: Option<String>,
        budget_min: Decimal,
        budget_max: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            category,
            description,
            media_url,
            budget_min,
            budget_max,
            ai_suggested_price: None,
            status: RequestStatus::Open,
            assigned_artisan_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Validate a state transition
    pub fn validate_transition(&self, to: RequestStatus) -> EscrowResult<()> {
        let valid = matches!(
            (self.status, to),
            (RequestStatus::Open, RequestStatus::InProgress)
                | (RequestStatus::Open, RequestStatus::Cancelled)
                | (RequestStatus::InProgress, RequestStatus::Completed)
        );

        if valid {
            Ok(())
        } else {
            Err(EscrowError::state_conflict(format!(
                "request {}: invalid transition {:?} -> {:?}",
                self.id, self.status, to
            )))
        }
    }
}

/// Offer state machine. An offer transitions at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// A bid by one artisan on one request. At most one offer per
/// (request, artisan) pair; at most one accepted offer per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub request_id: Uuid,
    pub artisan_id: Uuid,
    pub price: Amount,
    pub message: String,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(request_id: Uuid, artisan_id: Uuid, price: Amount, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            artisan_id,
            price,
            message,
            status: OfferStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Validate a state transition
    pub fn validate_transition(&self, to: OfferStatus) -> EscrowResult<()> {
        let valid = matches!(
            (self.status, to),
            (OfferStatus::Pending, OfferStatus::Accepted)
                | (OfferStatus::Pending, OfferStatus::Rejected)
        );

        if valid {
            Ok(())
        } else {
            Err(EscrowError::state_conflict(format!(
                "offer {}: invalid transition {:?} -> {:?}",
                self.id, self.status, to
            )))
        }
    }
}
