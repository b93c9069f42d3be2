//! Volatility-scaled position sizing.

use crate::domain::error::ConfluenceError;

pub const DEFAULT_RISK_PERCENT: f64 = 1.0;

/// Risks a fixed percentage of capital per unit of volatility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneyManager {
    risk_percent: f64,
}

impl Default for MoneyManager {
    fn default() -> Self {
        Self {
            risk_percent: DEFAULT_RISK_PERCENT,
        }
    }
}

impl MoneyManager {
    /// `risk_percent` is a percentage of capital, in (0, 100].
    pub fn new(risk_percent: f64) -> Result<Self, ConfluenceError> {
        if !(risk_percent > 0.0 && risk_percent <= 100.0) {
            return Err(ConfluenceError::invalid_input(format!(
                "risk fraction must be in (0, 100] percent, got {}",
                risk_percent
            )));
        }
        Ok(Self { risk_percent })
    }

    pub fn risk_percent(&self) -> f64 {
        self.risk_percent
    }

    /// units = capital * risk / volatility / price
    pub fn position_size(
        &self,
        capital: f64,
        volatility: f64,
        price: f64,
    ) -> Result<f64, ConfluenceError> {
        if !capital.is_finite() {
            return Err(ConfluenceError::invalid_input("capital must be finite"));
        }
        if !(volatility.is_finite() && volatility > 0.0) {
            return Err(ConfluenceError::invalid_input(format!(
                "volatility estimate must be positive, got {}",
                volatility
            )));
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(ConfluenceError::invalid_input(format!(
                "price must be positive, got {}",
                price
            )));
        }

        let risk_amount = capital * self.risk_percent / 100.0;
        Ok(risk_amount / volatility / price)
    }
}
