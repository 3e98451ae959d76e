//! Heuristic price estimation
//!
//! Maps a category to a base price band and scales it by complexity
//! keywords found in the description. Purely advisory: request creation
//! proceeds without a suggestion when no band can be computed.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EscrowError;
use crate::models::Category;
use crate::EscrowResult;

/// Description keywords that scale the base band
const COMPLEXITY_KEYWORDS: &[(&str, Decimal)] = &[
    ("urgent", dec!(1.3)),
    ("emergency", dec!(1.5)),
    ("complex", dec!(1.4)),
    ("simple", dec!(0.8)),
    ("quick", dec!(0.7)),
    ("small", dec!(0.7)),
    ("large", dec!(1.3)),
    ("multiple", dec!(1.2)),
];

/// An estimated price band in EGP
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceBand {
    /// The advisory label stored on a service request
    pub fn label(&self) -> String {
        format!("{}-{} EGP", self.min, self.max)
    }
}

/// Heuristic price estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceEstimator;

impl PriceEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate a price band for a category and description
    pub fn estimate(&self, category: Category, description: &str) -> EscrowResult<PriceBand> {
        if description.trim().is_empty() {
            return Err(EscrowError::validation(
                "cannot estimate a price without a description",
            ));
        }

        let (base_min, base_max) = base_band(category);

        let description = description.to_lowercase();
        let mut multiplier = Decimal::ONE;
        for (keyword, factor) in COMPLEXITY_KEYWORDS {
            if description.contains(keyword) {
                multiplier *= *factor;
            }
        }

        let min = (base_min * multiplier).trunc();
        let mut max = (base_max * multiplier).trunc();
        if min >= max {
            max = min + dec!(50);
        }

        Ok(PriceBand { min, max })
    }
}

/// Base price band per category, in EGP
fn base_band(category: Category) -> (Decimal, Decimal) {
    match category {
        Category::Plumbing => (dec!(100), dec!(500)),
        Category::Carpentry => (dec!(150), dec!(800)),
        Category::Electrical => (dec!(120), dec!(600)),
        Category::Painting => (dec!(80), dec!(400)),
        Category::Cleaning => (dec!(50), dec!(200)),
        Category::Hvac => (dec!(200), dec!(1000)),
        Category::General => (dec!(100), dec!(500)),
    }
}
