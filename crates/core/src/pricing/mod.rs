//! Cost computation for units of a product in a material.
//!
//! Pure and decimal-only: nothing here touches storage or rounds through
//! floating point.

mod engine;

pub use engine::{
    default_rates, merge_rates, CostBreakdown, PriceTable, RateEntry,
    DEFAULT_COMMISSION_RATE,
};

use thiserror::Error;

use crate::case::{Material, ProductType};
use crate::money::MoneyError;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("No rate configured for {product} in {material}")]
    NoRate {
        product: ProductType,
        material: Material,
    },

    #[error("Units must be positive")]
    ZeroUnits,

    #[error("Invalid commission rate: {0}")]
    InvalidCommissionRate(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}
