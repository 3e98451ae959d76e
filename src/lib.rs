//! Escrow transaction engine for a peer-to-peer services marketplace
//!
//! Clients post service requests, verified artisans bid on them, and an
//! escrow controller moves funds between wallets as offers are accepted
//! and services completed. All durable state lives in [`store::MarketStore`];
//! every balance or status mutation goes through the ledger, marketplace
//! and escrow contracts defined here.

pub mod accounts;
pub mod config;
pub mod error;
pub mod escrow;
pub mod ledger;
pub mod marketplace;
pub mod models;
pub mod moderation;
pub mod pricing;
pub mod store;
pub mod verification;

use error::EscrowError;

/// Result type alias for escrow operations
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Install the global tracing subscriber. Safe to call more than once;
/// later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
