//! Transactions, their three subtype tables, and the post-trade company roster.
//!
//! Transaction ids are partitioned by range into three kinds:
//!   market | rebalancing | withdrawal/topup
//! (t001–t300, t301–t600, t601–t900 with the default config).

use crate::{
    asset_generator::AssetRecord,
    config::{SynthConfig, TransactionPartitionConfig, PERFORMANCE_MONTHS},
    error::SynthResult,
    goal_generator::{PortfolioRecord, PORTFOLIO_TABLE},
    name_generator::NameGenerator,
    rng::StageRng,
    table::{Record, Table},
    types::{
        round_to, sequential_id, timestamp_format, ymd_hms, AssetId, CompanyId, PortfolioId,
        TransactionId,
    },
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const COMPANY_TABLE: &str = "posttradecompany";
pub const TRANSACTION_TABLE: &str = "transaction";
pub const MARKET_TABLE: &str = "markettransaction";
pub const REBALANCING_TABLE: &str = "rebalancingtransaction";
pub const WITHDRAWAL_TOPUP_TABLE: &str = "withdrawalortopuptransaction";

pub const AMOUNT_MIN: i64 = 500;
pub const AMOUNT_MAX: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Market,
    Rebalancing,
    WithdrawalOrTopup,
}

impl TransactionKind {
    /// Kind of the transaction at zero-based `position` in id order.
    pub fn for_position(partition: &TransactionPartitionConfig, position: usize) -> Option<Self> {
        let rebalancing_start = partition.market;
        let withdrawal_start = rebalancing_start + partition.rebalancing;
        if position < rebalancing_start {
            Some(TransactionKind::Market)
        } else if position < withdrawal_start {
            Some(TransactionKind::Rebalancing)
        } else if position < partition.total() {
            Some(TransactionKind::WithdrawalOrTopup)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopupType {
    Topup,
    Withdrawal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTradeCompanyRecord {
    #[serde(rename = "companyid")]
    pub company_id: CompanyId,
    #[serde(rename = "companyname")]
    pub company_name: String,
    pub region: String,
}

impl Record for PostTradeCompanyRecord {
    const HEADER: &'static [&'static str] = &["companyid", "companyname", "region"];

    fn key(&self) -> String {
        self.company_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "transactionid")]
    pub transaction_id: TransactionId,
    #[serde(rename = "transactionamount")]
    pub transaction_amount: i64,
    #[serde(rename = "transactiondate", with = "timestamp_format")]
    pub transaction_date: NaiveDateTime,
    #[serde(rename = "portfolioid")]
    pub portfolio_id: PortfolioId,
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
}

impl Record for TransactionRecord {
    const HEADER: &'static [&'static str] = &[
        "transactionid",
        "transactionamount",
        "transactiondate",
        "portfolioid",
        "assetid",
    ];

    fn key(&self) -> String {
        self.transaction_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTransactionRecord {
    #[serde(rename = "transactionid")]
    pub transaction_id: TransactionId,
    #[serde(rename = "companyid")]
    pub company_id: CompanyId,
}

impl Record for MarketTransactionRecord {
    const HEADER: &'static [&'static str] = &["transactionid", "companyid"];

    fn key(&self) -> String {
        self.transaction_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingTransactionRecord {
    #[serde(rename = "transactionid")]
    pub transaction_id: TransactionId,
    pub fee: f64,
}

impl Record for RebalancingTransactionRecord {
    const HEADER: &'static [&'static str] = &["transactionid", "fee"];

    fn key(&self) -> String {
        self.transaction_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalOrTopupRecord {
    #[serde(rename = "transactionid")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub topup_type: TopupType,
}

impl Record for WithdrawalOrTopupRecord {
    const HEADER: &'static [&'static str] = &["transactionid", "type"];

    fn key(&self) -> String {
        self.transaction_id.clone()
    }
}

#[derive(Debug, Clone)]
pub struct TransactionDetailTables {
    pub market: Table<MarketTransactionRecord>,
    pub rebalancing: Table<RebalancingTransactionRecord>,
    pub withdrawal_topup: Table<WithdrawalOrTopupRecord>,
}

/// Number of leading withdrawal/topup ids pinned as monthly top-ups.
pub fn pinned_topup_count(config: &SynthConfig) -> usize {
    if config.recurring_topup {
        PERFORMANCE_MONTHS as usize
    } else {
        0
    }
}

pub fn company_id(n: usize) -> CompanyId {
    sequential_id("brk", n)
}

pub fn generate_companies(
    config: &SynthConfig,
    rng: &mut StageRng,
) -> Table<PostTradeCompanyRecord> {
    let companies: Vec<_> = (1..=config.company_count)
        .map(|n| {
            let company_name = NameGenerator::generate_brokerage(rng).to_string();
            let region = NameGenerator::generate_region(rng).to_string();
            PostTradeCompanyRecord {
                company_id: company_id(n),
                company_name,
                region,
            }
        })
        .collect();

    log::info!("stage=company: {} post-trade companies", companies.len());
    Table::new(COMPANY_TABLE, companies)
}

/// A random minute within the transaction year (day offset 0..=364).
fn random_time_in_year(rng: &mut StageRng, year: i32) -> NaiveDateTime {
    let days = rng.range_inclusive(0, 364);
    let hours = rng.range_inclusive(0, 23);
    let minutes = rng.range_inclusive(0, 59);
    ymd_hms(year, 1, 1, 0, 0, 0)
        + Duration::days(days)
        + Duration::hours(hours)
        + Duration::minutes(minutes)
}

pub fn generate_transactions(
    config: &SynthConfig,
    portfolios: &Table<PortfolioRecord>,
    assets: &Table<AssetRecord>,
    rng: &mut StageRng,
) -> Table<TransactionRecord> {
    let partition = &config.transactions;
    let withdrawal_start = partition.market + partition.rebalancing;
    let pinned = pinned_topup_count(config);
    let mut rows = Vec::with_capacity(partition.total());

    for position in 0..partition.total() {
        let transaction_id = sequential_id("t", position + 1);
        let transaction_amount = rng.range_inclusive(AMOUNT_MIN, AMOUNT_MAX);

        let pinned_month = position
            .checked_sub(withdrawal_start)
            .filter(|offset| *offset < pinned)
            .map(|offset| offset as u32 + 1);

        let (transaction_date, portfolio_id) = match pinned_month {
            Some(month) => {
                // Recurring contribution: 1st of each month, first portfolio.
                let hour = rng.range_inclusive(0, 23) as u32;
                let minute = rng.range_inclusive(0, 59) as u32;
                let date = ymd_hms(config.transaction_year, month, 1, hour, minute, 0);
                (date, portfolios.rows()[0].portfolio_id.clone())
            }
            None => {
                let date = random_time_in_year(rng, config.transaction_year);
                (date, rng.pick(portfolios.rows()).portfolio_id.clone())
            }
        };
        let asset_id = rng.pick(assets.rows()).asset_id.clone();

        rows.push(TransactionRecord {
            transaction_id,
            transaction_amount,
            transaction_date,
            portfolio_id,
            asset_id,
        });
    }

    log::info!(
        "stage=transaction: {} transactions \
         (market={} rebalancing={} withdrawal_topup={}, {} pinned top-ups)",
        rows.len(),
        partition.market,
        partition.rebalancing,
        partition.withdrawal_topup,
        pinned
    );
    Table::new(TRANSACTION_TABLE, rows)
}

pub fn generate_transaction_details(
    config: &SynthConfig,
    transactions: &Table<TransactionRecord>,
    portfolios: &Table<PortfolioRecord>,
    companies: &Table<PostTradeCompanyRecord>,
    rng: &mut StageRng,
) -> SynthResult<TransactionDetailTables> {
    let partition = &config.transactions;
    let pinned = pinned_topup_count(config);
    let mut market = Vec::with_capacity(partition.market);
    let mut rebalancing = Vec::with_capacity(partition.rebalancing);
    let mut withdrawal_topup = Vec::with_capacity(partition.withdrawal_topup);

    for (position, txn) in transactions.iter().enumerate() {
        let transaction_id = txn.transaction_id.clone();
        match TransactionKind::for_position(partition, position) {
            Some(TransactionKind::Market) => {
                let company = rng.pick(companies.rows());
                market.push(MarketTransactionRecord {
                    transaction_id,
                    company_id: company.company_id.clone(),
                });
            }
            Some(TransactionKind::Rebalancing) => {
                let portfolio = portfolios.require(PORTFOLIO_TABLE, &txn.portfolio_id)?;
                rebalancing.push(RebalancingTransactionRecord {
                    transaction_id,
                    fee: round_to(portfolio.invested_value as f64 * config.rebalancing_fee_rate, 2),
                });
            }
            Some(TransactionKind::WithdrawalOrTopup) => {
                let topup_type = if withdrawal_topup.len() < pinned || rng.chance(0.5) {
                    TopupType::Topup
                } else {
                    TopupType::Withdrawal
                };
                withdrawal_topup.push(WithdrawalOrTopupRecord {
                    transaction_id,
                    topup_type,
                });
            }
            None => {
                log::warn!("stage=transaction_detail: {transaction_id} is outside every id range");
            }
        }
    }

    log::info!(
        "stage=transaction_detail: market={} rebalancing={} withdrawal_topup={}",
        market.len(),
        rebalancing.len(),
        withdrawal_topup.len()
    );
    Ok(TransactionDetailTables {
        market: Table::new(MARKET_TABLE, market),
        rebalancing: Table::new(REBALANCING_TABLE, rebalancing),
        withdrawal_topup: Table::new(WITHDRAWAL_TOPUP_TABLE, withdrawal_topup),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ranges_split_three_ways() {
        let partition = TransactionPartitionConfig::default();
        let kind = |position| TransactionKind::for_position(&partition, position);
        assert_eq!(kind(0), Some(TransactionKind::Market));
        assert_eq!(kind(299), Some(TransactionKind::Market));
        assert_eq!(kind(300), Some(TransactionKind::Rebalancing));
        assert_eq!(kind(599), Some(TransactionKind::Rebalancing));
        assert_eq!(kind(600), Some(TransactionKind::WithdrawalOrTopup));
        assert_eq!(kind(899), Some(TransactionKind::WithdrawalOrTopup));
        assert_eq!(kind(900), None);
    }

    #[test]
    fn company_ids_are_brk_prefixed() {
        assert_eq!(company_id(1), "brk001");
        assert_eq!(company_id(15), "brk015");
    }

    #[test]
    fn pinned_topups_follow_config() {
        let mut config = SynthConfig::default();
        assert_eq!(pinned_topup_count(&config), 12);
        config.recurring_topup = false;
        assert_eq!(pinned_topup_count(&config), 0);
    }
}
