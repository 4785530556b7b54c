//! Pipeline configuration.
//!
//! Every row count, partition boundary and rate the generators use is a
//! named default here. A JSON file may override any subset of fields.

use crate::error::{SynthError, SynthResult};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SEED: u64 = 42;

pub const INVESTOR_COUNT: usize = 50;
pub const RISK_ASSESSMENT_COUNT: usize = 50;
pub const GOALS_PER_INVESTOR_MIN: i64 = 1;
pub const GOALS_PER_INVESTOR_MAX: i64 = 3;

/// Portfolio management fee as a fraction of invested value (0.88%).
pub const MANAGEMENT_FEE_RATE: f64 = 0.0088;
/// Rebalancing fee as a fraction of the portfolio's invested value (0.2%).
pub const REBALANCING_FEE_RATE: f64 = 0.002;

pub const PERFORMANCE_YEAR: i32 = 2024;
pub const PERFORMANCE_MONTHS: u32 = 12;

pub const ASSET_TARGET: usize = 150;
pub const FUNDS_SLICE: usize = 40;
pub const CASH_SLICE: usize = 20;
pub const BONDS_SLICE: usize = 20;
pub const COMMODITY_SLICE: usize = 20;
pub const STOCKS_SLICE: usize = 50;

pub const MARKET_TRANSACTIONS: usize = 300;
pub const REBALANCING_TRANSACTIONS: usize = 300;
pub const WITHDRAWAL_TOPUP_TRANSACTIONS: usize = 300;
pub const TRANSACTION_YEAR: i32 = 2024;

pub const COMPANY_COUNT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPartitionConfig {
    pub funds: usize,
    pub cash: usize,
    pub bonds: usize,
    pub commodity: usize,
    pub stocks: usize,
}

impl Default for AssetPartitionConfig {
    fn default() -> Self {
        Self {
            funds: FUNDS_SLICE,
            cash: CASH_SLICE,
            bonds: BONDS_SLICE,
            commodity: COMMODITY_SLICE,
            stocks: STOCKS_SLICE,
        }
    }
}

impl AssetPartitionConfig {
    pub fn total(&self) -> usize {
        self.funds + self.cash + self.bonds + self.commodity + self.stocks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPartitionConfig {
    pub market: usize,
    pub rebalancing: usize,
    pub withdrawal_topup: usize,
}

impl Default for TransactionPartitionConfig {
    fn default() -> Self {
        Self {
            market: MARKET_TRANSACTIONS,
            rebalancing: REBALANCING_TRANSACTIONS,
            withdrawal_topup: WITHDRAWAL_TOPUP_TRANSACTIONS,
        }
    }
}

impl TransactionPartitionConfig {
    pub fn total(&self) -> usize {
        self.market + self.rebalancing + self.withdrawal_topup
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub investor_count: usize,
    pub risk_assessment_count: usize,
    pub goals_per_investor: (i64, i64),
    pub management_fee_rate: f64,
    pub rebalancing_fee_rate: f64,
    pub performance_year: i32,
    pub asset_target: usize,
    pub asset_partition: AssetPartitionConfig,
    pub transactions: TransactionPartitionConfig,
    pub transaction_year: i32,
    /// Pin one monthly top-up per month to the first portfolio.
    pub recurring_topup: bool,
    pub company_count: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            investor_count: INVESTOR_COUNT,
            risk_assessment_count: RISK_ASSESSMENT_COUNT,
            goals_per_investor: (GOALS_PER_INVESTOR_MIN, GOALS_PER_INVESTOR_MAX),
            management_fee_rate: MANAGEMENT_FEE_RATE,
            rebalancing_fee_rate: REBALANCING_FEE_RATE,
            performance_year: PERFORMANCE_YEAR,
            asset_target: ASSET_TARGET,
            asset_partition: AssetPartitionConfig::default(),
            transactions: TransactionPartitionConfig::default(),
            transaction_year: TRANSACTION_YEAR,
            recurring_topup: true,
            company_count: COMPANY_COUNT,
        }
    }
}

impl SynthConfig {
    /// Load a JSON override file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SynthConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SynthResult<()> {
        if self.investor_count == 0 {
            return Err(SynthError::InvalidConfig("investor_count must be > 0".into()));
        }
        if self.company_count == 0 {
            return Err(SynthError::InvalidConfig("company_count must be > 0".into()));
        }
        let (lo, hi) = self.goals_per_investor;
        if lo < 1 || lo > hi {
            return Err(SynthError::InvalidConfig(format!(
                "goals_per_investor must satisfy 1 <= min <= max, got ({lo}, {hi})"
            )));
        }
        if self.asset_partition.total() != self.asset_target {
            return Err(SynthError::PartitionMismatch {
                what: "asset_partition",
                expected: self.asset_target,
                actual: self.asset_partition.total(),
            });
        }
        if self.transactions.total() == 0 {
            return Err(SynthError::InvalidConfig("no transactions configured".into()));
        }
        for (field, year) in [
            ("performance_year", self.performance_year),
            ("transaction_year", self.transaction_year),
        ] {
            if NaiveDate::from_ymd_opt(year, 12, 31).is_none() {
                return Err(SynthError::InvalidConfig(format!(
                    "{field} {year} is outside the representable date range"
                )));
            }
        }
        if self.recurring_topup
            && self.transactions.withdrawal_topup < PERFORMANCE_MONTHS as usize
        {
            return Err(SynthError::InvalidConfig(format!(
                "recurring_topup needs at least {PERFORMANCE_MONTHS} withdrawal/topup transactions"
            )));
        }
        Ok(())
    }

    /// Reduced-size config for fast tests. Partitions still sum to the target,
    /// and 2..=3 goals per investor keeps 20..=30 portfolios, so the
    /// 30-asset target is always reachable.
    pub fn default_test() -> Self {
        Self {
            investor_count: 10,
            risk_assessment_count: 12,
            goals_per_investor: (2, 3),
            asset_target: 30,
            asset_partition: AssetPartitionConfig {
                funds: 8,
                cash: 4,
                bonds: 4,
                commodity: 4,
                stocks: 10,
            },
            transactions: TransactionPartitionConfig {
                market: 20,
                rebalancing: 20,
                withdrawal_topup: 20,
            },
            company_count: 5,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_partitions_sum_to_targets() {
        let config = SynthConfig::default();
        assert_eq!(config.asset_partition.total(), 150);
        assert_eq!(config.transactions.total(), 900);
        config.validate().unwrap();
        SynthConfig::default_test().validate().unwrap();
    }

    #[test]
    fn mismatched_partition_is_rejected() {
        let config = SynthConfig {
            asset_target: 151,
            ..SynthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SynthError::PartitionMismatch { expected: 151, actual: 150, .. })
        ));
    }

    #[test]
    fn unrepresentable_years_are_rejected() {
        let config = SynthConfig {
            performance_year: 400_000,
            ..SynthConfig::default_test()
        };
        assert!(matches!(
            config.validate(),
            Err(SynthError::InvalidConfig(msg)) if msg.contains("performance_year")
        ));

        let config = SynthConfig {
            transaction_year: -400_000,
            ..SynthConfig::default_test()
        };
        assert!(matches!(
            config.validate(),
            Err(SynthError::InvalidConfig(msg)) if msg.contains("transaction_year")
        ));
    }

    #[test]
    fn load_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "investor_count": 12, "recurring_topup": false }}"#).unwrap();

        let config = SynthConfig::load(file.path()).unwrap();
        assert_eq!(config.investor_count, 12);
        assert!(!config.recurring_topup);
        assert_eq!(config.asset_target, ASSET_TARGET);
    }
}
