use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use crate::case::{Material, ProductType};
use crate::money::Money;

/// Sales commission applied when a case has a sales rep (10%).
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Per-unit milling and design rates for a product.
///
/// `material = None` is a wildcard used when no exact product/material entry exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateEntry {
    pub product: ProductType,
    #[serde(default)]
    pub material: Option<Material>,
    pub milling: Money,
    pub design: Money,
}

impl RateEntry {
    fn new(product: ProductType, material: Option<Material>, milling: u64, design: u64) -> Self {
        Self {
            product,
            material,
            milling: Money::from_cents(milling * 100),
            design: Money::from_cents(design * 100),
        }
    }
}

/// Cost of producing a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostBreakdown {
    pub milling: Money,
    pub design: Money,
    pub commission: Money,
    pub total: Money,
}

/// Built-in per-unit rates.
///
/// Every product carries a wildcard entry, so any product/material pair a case
/// can be created with has a price.
pub fn default_rates() -> Vec<RateEntry> {
    use Material::*;
    use ProductType::*;

    vec![
        RateEntry::new(Crown, Some(Zirconia), 45, 15),
        RateEntry::new(Crown, Some(Emax), 55, 15),
        RateEntry::new(Crown, Some(Pmma), 20, 10),
        RateEntry::new(Crown, None, 45, 15),
        RateEntry::new(Bridge, Some(Zirconia), 50, 18),
        RateEntry::new(Bridge, Some(Pmma), 25, 12),
        RateEntry::new(Bridge, None, 50, 18),
        RateEntry::new(Veneer, Some(Emax), 50, 20),
        RateEntry::new(Veneer, None, 50, 20),
        RateEntry::new(Inlay, Some(Emax), 40, 12),
        RateEntry::new(Inlay, Some(Composite), 25, 10),
        RateEntry::new(Inlay, None, 40, 12),
        RateEntry::new(Onlay, Some(Emax), 40, 12),
        RateEntry::new(Onlay, Some(Composite), 25, 10),
        RateEntry::new(Onlay, None, 40, 12),
        RateEntry::new(ImplantCrown, Some(Zirconia), 60, 25),
        RateEntry::new(ImplantCrown, None, 60, 25),
        RateEntry::new(NightGuard, None, 35, 10),
        RateEntry::new(Denture, None, 80, 30),
    ]
}

/// Layer configured rates over the built-in table.
///
/// Products the configuration never mentions keep all their built-in entries.
/// A configured product without its own wildcard keeps the built-in wildcard.
pub fn merge_rates(configured: Vec<RateEntry>) -> Vec<RateEntry> {
    let defaults = default_rates();
    let mut rates = configured;

    for entry in defaults {
        let mentioned = rates.iter().any(|r| r.product == entry.product);
        let has_wildcard = rates
            .iter()
            .any(|r| r.product == entry.product && r.material.is_none());
        if !mentioned || (entry.material.is_none() && !has_wildcard) {
            rates.push(entry);
        }
    }
    rates
}

/// Rate table plus commission rate.
#[derive(Debug, Clone)]
pub struct PriceTable {
    rates: Vec<RateEntry>,
    commission_rate: Decimal,
}

impl PriceTable {
    pub fn new(rates: Vec<RateEntry>, commission_rate: Decimal) -> Result<Self, PricingError> {
        if commission_rate.is_sign_negative() || commission_rate > Decimal::ONE {
            return Err(PricingError::InvalidCommissionRate(
                commission_rate.to_string(),
            ));
        }
        Ok(Self {
            rates,
            commission_rate,
        })
    }

    /// The built-in table with the default commission.
    pub fn standard() -> Self {
        Self {
            rates: default_rates(),
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    pub fn rates(&self) -> &[RateEntry] {
        &self.rates
    }

    fn rate_for(&self, product: ProductType, material: Material) -> Result<&RateEntry, PricingError> {
        self.rates
            .iter()
            .find(|r| r.product == product && r.material == Some(material))
            .or_else(|| {
                self.rates
                    .iter()
                    .find(|r| r.product == product && r.material.is_none())
            })
            .ok_or(PricingError::NoRate { product, material })
    }

    /// Compute the cost breakdown for `units` of a product.
    ///
    /// Commission is charged on milling + design and only when a sales rep is attached.
    pub fn costs(
        &self,
        product: ProductType,
        material: Material,
        units: u32,
        has_sales_rep: bool,
    ) -> Result<CostBreakdown, PricingError> {
        if units == 0 {
            return Err(PricingError::ZeroUnits);
        }

        let rate = self.rate_for(product, material)?;
        let milling = rate.milling.times(units)?;
        let design = rate.design.times(units)?;
        let production = milling.checked_add(design)?;
        let commission = if has_sales_rep {
            production.scaled(self.commission_rate)?
        } else {
            Money::ZERO
        };

        Ok(CostBreakdown {
            milling,
            design,
            commission,
            total: production.checked_add(commission)?,
        })
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::standard()
    }
}
