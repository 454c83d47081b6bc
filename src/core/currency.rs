//! Currency conversion abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The dollar quotes used to bring a USD price into pesos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    /// Contado con liquidación.
    Ccl,
    /// Dólar bolsa.
    Mep,
}

impl Display for RateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateKind::Ccl => "CCL",
                RateKind::Mep => "MEP",
            }
        )
    }
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Sale rate in pesos per dollar.
    async fn get_rate(&self, kind: RateKind) -> Result<f64>;
}
