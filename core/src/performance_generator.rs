//! Monthly performance history, twelve rows per portfolio.
//!
//! The annual return is a linear function of gain/loss:
//!   gainloss -2000 → -5%, gainloss +2000 → +15%.
//! The latest row per portfolio is the source of truth for the
//! portfolio's annualised return (see reconciliation.rs).

use crate::{
    config::{SynthConfig, PERFORMANCE_MONTHS},
    goal_generator::PortfolioRecord,
    rng::StageRng,
    table::{Record, Table},
    types::{round_to, timestamp_format, ymd_hms, PortfolioId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const PERFORMANCE_TABLE: &str = "performance";

pub const GAIN_LOSS_MIN: i64 = -2000;
pub const GAIN_LOSS_MAX: i64 = 2000;
pub const ANNUAL_RETURN_FLOOR: f64 = -5.0;
pub const ANNUAL_RETURN_SPAN: f64 = 20.0;
pub const DAILY_CHANGE_BOUND: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    #[serde(rename = "portfolioid")]
    pub portfolio_id: PortfolioId,
    #[serde(with = "timestamp_format")]
    pub datetime: NaiveDateTime,
    #[serde(rename = "investedvalue")]
    pub invested_value: i64,
    #[serde(rename = "annualreturns")]
    pub annual_returns: f64,
    #[serde(rename = "dailychange")]
    pub daily_change: f64,
    #[serde(rename = "gainloss")]
    pub gain_loss: i64,
    #[serde(rename = "marketvalue")]
    pub market_value: i64,
}

impl PerformanceRecord {
    /// Derived columns (annual return, market value) follow from gain/loss.
    pub fn new(
        portfolio_id: PortfolioId,
        datetime: NaiveDateTime,
        invested_value: i64,
        gain_loss: i64,
        daily_change: f64,
    ) -> Self {
        Self {
            portfolio_id,
            datetime,
            invested_value,
            annual_returns: annual_return_for(gain_loss),
            daily_change,
            gain_loss,
            market_value: invested_value + gain_loss,
        }
    }
}

impl Record for PerformanceRecord {
    const HEADER: &'static [&'static str] = &[
        "portfolioid",
        "datetime",
        "investedvalue",
        "annualreturns",
        "dailychange",
        "gainloss",
        "marketvalue",
    ];

    fn key(&self) -> String {
        format!("{}@{}", self.portfolio_id, self.datetime)
    }
}

/// Map gain/loss in [-2000, 2000] linearly onto [-5, 15], 2 decimals.
pub fn annual_return_for(gain_loss: i64) -> f64 {
    let fraction = (gain_loss - GAIN_LOSS_MIN) as f64 / (GAIN_LOSS_MAX - GAIN_LOSS_MIN) as f64;
    round_to(ANNUAL_RETURN_FLOOR + fraction * ANNUAL_RETURN_SPAN, 2)
}

/// A random day (1..=28), hour and minute inside the given month.
fn random_time_in_month(rng: &mut StageRng, year: i32, month: u32) -> NaiveDateTime {
    let day = rng.range_inclusive(1, 28) as u32;
    let hour = rng.range_inclusive(0, 23) as u32;
    let minute = rng.range_inclusive(0, 59) as u32;
    ymd_hms(year, month, day, hour, minute, 0)
}

pub fn generate_performance(
    config: &SynthConfig,
    portfolios: &Table<PortfolioRecord>,
    rng: &mut StageRng,
) -> Table<PerformanceRecord> {
    let mut rows = Vec::with_capacity(portfolios.len() * PERFORMANCE_MONTHS as usize);

    for portfolio in portfolios.iter() {
        for month in 1..=PERFORMANCE_MONTHS {
            let datetime = random_time_in_month(rng, config.performance_year, month);
            let gain_loss = rng.range_inclusive(GAIN_LOSS_MIN, GAIN_LOSS_MAX);
            let daily_change = round_to(rng.uniform(-DAILY_CHANGE_BOUND, DAILY_CHANGE_BOUND), 2);
            rows.push(PerformanceRecord::new(
                portfolio.portfolio_id.clone(),
                datetime,
                portfolio.invested_value,
                gain_loss,
                daily_change,
            ));
        }
    }

    log::info!(
        "stage=performance: {} monthly rows for {} portfolios",
        rows.len(),
        portfolios.len()
    );
    Table::new(PERFORMANCE_TABLE, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_return_maps_gain_loss_linearly() {
        assert_eq!(annual_return_for(-2000), -5.0);
        assert_eq!(annual_return_for(0), 5.0);
        assert_eq!(annual_return_for(1000), 10.0);
        assert_eq!(annual_return_for(2000), 15.0);
        assert_eq!(annual_return_for(200), 6.0);
    }

    #[test]
    fn market_value_is_invested_plus_gain() {
        let row = PerformanceRecord::new(
            "p001".into(),
            ymd_hms(2024, 12, 3, 9, 15, 0),
            100_000,
            -1500,
            1.25,
        );
        assert_eq!(row.market_value, 98_500);
        assert_eq!(row.annual_returns, -2.5);
    }
}
