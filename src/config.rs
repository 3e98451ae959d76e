//! Engine configuration
//!
//! Layered settings: compiled defaults, an optional `escrow.toml` next to
//! the binary, then `ESCROW_`-prefixed environment variables with `__`
//! separating nesting levels (e.g. `ESCROW_MARKETPLACE__MAX_OFFER_PRICE`).

use serde::Deserialize;

use crate::marketplace::MarketplaceConfig;
use crate::verification::VerificationConfig;
use crate::EscrowResult;

/// Top-level configuration for the engine
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub marketplace: MarketplaceConfig,
    pub verification: VerificationConfig,
}

impl EngineConfig {
    /// Load configuration from file and environment, falling back to
    /// defaults for anything unset.
    pub fn load() -> EscrowResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("escrow").required(false))
            .add_source(
                config::Environment::with_prefix("ESCROW")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
