//! Presale pricing
//!
//! Prices are 18-decimal payment units per whole PreGVT. A purchase of
//! `amount` costs `amount * price / 1e18`.
//!
//! With a stage table the price follows the cumulative amount sold so far:
//! the first stage whose cap is still above the sold counter applies, and
//! once every cap has been passed the last stage's price sticks.

use gvt_core::error::{GvtError, Result};
use gvt_core::math::{self, SCALE};
use gvt_core::types::Amount;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStage {
    /// Cumulative sold amount up to which this price applies
    pub cap: Amount,
    pub price: Amount,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresalePricing {
    flat_price: Amount,
    stages: Vec<PriceStage>,
}

impl PresalePricing {
    pub fn flat(price: Amount) -> Self {
        Self {
            flat_price: price,
            stages: Vec::new(),
        }
    }

    pub fn flat_price(&self) -> Amount {
        self.flat_price
    }

    pub fn stages(&self) -> &[PriceStage] {
        &self.stages
    }

    pub fn set_flat_price(&mut self, price: Amount) -> Result<Amount> {
        if price == 0 {
            return Err(GvtError::InvalidPrice);
        }
        Ok(std::mem::replace(&mut self.flat_price, price))
    }

    /// Replace the stage table. An empty table falls back to the flat price.
    pub fn set_stages(&mut self, stages: Vec<PriceStage>) -> Result<()> {
        validate_stages(&stages)?;
        self.stages = stages;
        Ok(())
    }

    /// Price in force when `sold` tokens have already been sold
    pub fn price_at(&self, sold: Amount) -> Amount {
        match self.stages.iter().find(|stage| sold < stage.cap) {
            Some(stage) => stage.price,
            None => self
                .stages
                .last()
                .map(|stage| stage.price)
                .unwrap_or(self.flat_price),
        }
    }

    /// Payment owed for `amount` at the price in force for `sold`
    pub fn cost(&self, sold: Amount, amount: Amount) -> Result<Amount> {
        payment_for(amount, self.price_at(sold))
    }
}

pub fn payment_for(amount: Amount, price: Amount) -> Result<Amount> {
    math::mul_div(amount, price, SCALE)
}

fn validate_stages(stages: &[PriceStage]) -> Result<()> {
    if stages.iter().any(|stage| stage.price == 0) {
        return Err(GvtError::InvalidPrice);
    }
    if stages.windows(2).any(|pair| pair[1].cap <= pair[0].cap) {
        return Err(GvtError::InvalidPrice);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Amount = SCALE;

    fn staged() -> PresalePricing {
        let mut pricing = PresalePricing::flat(TOKEN / 10);
        pricing
            .set_stages(vec![
                PriceStage { cap: 1_000 * TOKEN, price: TOKEN / 100 },
                PriceStage { cap: 5_000 * TOKEN, price: TOKEN / 50 },
                PriceStage { cap: 10_000 * TOKEN, price: TOKEN / 20 },
            ])
            .unwrap();
        pricing
    }

    #[test]
    fn test_flat_cost() {
        let pricing = PresalePricing::flat(TOKEN / 100);
        assert_eq!(pricing.cost(0, 500 * TOKEN).unwrap(), 5 * TOKEN);
    }

    #[test]
    fn test_stage_lookup() {
        let pricing = staged();
        assert_eq!(pricing.price_at(0), TOKEN / 100);
        assert_eq!(pricing.price_at(999 * TOKEN), TOKEN / 100);
        assert_eq!(pricing.price_at(1_000 * TOKEN), TOKEN / 50);
        assert_eq!(pricing.price_at(9_999 * TOKEN), TOKEN / 20);
        // Past every cap, the last stage sticks
        assert_eq!(pricing.price_at(20_000 * TOKEN), TOKEN / 20);
    }

    #[test]
    fn test_whole_purchase_priced_at_current_stage() {
        let pricing = staged();
        // Crosses the first boundary, still charged at stage one
        assert_eq!(pricing.cost(900 * TOKEN, 200 * TOKEN).unwrap(), 2 * TOKEN);
    }

    #[test]
    fn test_invalid_stage_tables() {
        let mut pricing = PresalePricing::flat(1);
        assert_eq!(
            pricing.set_stages(vec![PriceStage { cap: 10, price: 0 }]),
            Err(GvtError::InvalidPrice)
        );
        assert_eq!(
            pricing.set_stages(vec![
                PriceStage { cap: 10, price: 1 },
                PriceStage { cap: 10, price: 2 },
            ]),
            Err(GvtError::InvalidPrice)
        );
        assert!(pricing.stages().is_empty());
    }

    #[test]
    fn test_zero_flat_price_rejected() {
        let mut pricing = PresalePricing::flat(5);
        assert_eq!(pricing.set_flat_price(0), Err(GvtError::InvalidPrice));
        assert_eq!(pricing.set_flat_price(7).unwrap(), 5);
        assert_eq!(pricing.flat_price(), 7);
    }

    #[test]
    fn test_empty_table_uses_flat_price() {
        let mut pricing = staged();
        pricing.set_stages(Vec::new()).unwrap();
        assert_eq!(pricing.price_at(50_000 * TOKEN), TOKEN / 10);
    }
}
