//! Assets and their subtype tables.
//!
//! Asset rows hit a fixed target independent of the portfolio count:
//! every portfolio holds one asset, and `target - portfolios` of them
//! (picked at random) hold two instead. Asset ids are then cut into
//! contiguous slices, one per subtype, in the order
//!   funds | cash | bonds | commodity | stocks.

use crate::{
    config::{AssetPartitionConfig, SynthConfig},
    error::{SynthError, SynthResult},
    goal_generator::PortfolioRecord,
    name_generator::NameGenerator,
    rng::StageRng,
    table::{Record, Table},
    types::{round_to, sequential_id, ymd, AssetId, PortfolioId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    ops::Range,
};

pub const ASSET_TABLE: &str = "asset";
pub const FUNDS_TABLE: &str = "funds";
pub const CASH_TABLE: &str = "cash";
pub const BOND_HOLDING_TABLE: &str = "bonds1";
pub const BOND_DETAIL_TABLE: &str = "bonds2";
pub const COMMODITY_TABLE: &str = "commodity";
pub const STOCKS_TABLE: &str = "stocks";

/// Allocation ratios are stored to 4 decimals.
const RATIO_PLACES: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Funds,
    Cash,
    Bonds,
    Commodity,
    Stocks,
}

/// Index ranges (into the ordered asset sequence) owned by each subtype.
pub fn class_slices(partition: &AssetPartitionConfig) -> [(AssetClass, Range<usize>); 5] {
    let sizes = [
        (AssetClass::Funds, partition.funds),
        (AssetClass::Cash, partition.cash),
        (AssetClass::Bonds, partition.bonds),
        (AssetClass::Commodity, partition.commodity),
        (AssetClass::Stocks, partition.stocks),
    ];
    let mut start = 0;
    sizes.map(|(class, size)| {
        let range = start..start + size;
        start += size;
        (class, range)
    })
}

// ── Records ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "allocationratio")]
    pub allocation_ratio: f64,
    #[serde(rename = "portfolioid")]
    pub portfolio_id: PortfolioId,
}

impl Record for AssetRecord {
    const HEADER: &'static [&'static str] = &["assetid", "allocationratio", "portfolioid"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "dividendyield")]
    pub dividend_yield: f64,
    #[serde(rename = "expenseratio")]
    pub expense_ratio: f64,
}

impl Record for FundRecord {
    const HEADER: &'static [&'static str] = &["assetid", "dividendyield", "expenseratio"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "cashamount")]
    pub cash_amount: i64,
    pub currency: String,
}

impl Record for CashRecord {
    const HEADER: &'static [&'static str] = &["assetid", "cashamount", "currency"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondHoldingRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "bondname")]
    pub bond_name: String,
    #[serde(rename = "numofbonds")]
    pub num_of_bonds: i64,
}

impl Record for BondHoldingRecord {
    const HEADER: &'static [&'static str] = &["assetid", "bondname", "numofbonds"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

/// Bond fundamentals, keyed by bond name rather than asset id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondDetailRecord {
    #[serde(rename = "bondname")]
    pub bond_name: String,
    #[serde(rename = "interestrate")]
    pub interest_rate: f64,
    #[serde(rename = "dividendyields")]
    pub dividend_yields: f64,
    #[serde(rename = "maturitydate")]
    pub maturity_date: NaiveDate,
}

impl Record for BondDetailRecord {
    const HEADER: &'static [&'static str] =
        &["bondname", "interestrate", "dividendyields", "maturitydate"];

    fn key(&self) -> String {
        self.bond_name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "numcommodity")]
    pub num_commodity: i64,
    #[serde(rename = "commoditytype")]
    pub commodity_type: String,
}

impl Record for CommodityRecord {
    const HEADER: &'static [&'static str] = &["assetid", "numcommodity", "commoditytype"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(rename = "assetid")]
    pub asset_id: AssetId,
    #[serde(rename = "peratio")]
    pub pe_ratio: f64,
    #[serde(rename = "stockname")]
    pub stock_name: String,
    pub ebita: f64,
    #[serde(rename = "numofstocks")]
    pub num_of_stocks: i64,
    pub eps: f64,
}

impl Record for StockRecord {
    const HEADER: &'static [&'static str] =
        &["assetid", "peratio", "stockname", "ebita", "numofstocks", "eps"];

    fn key(&self) -> String {
        self.asset_id.clone()
    }
}

/// Fundamentals shared by every holding of the same stock.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StockSpec {
    pe_ratio: f64,
    ebita: f64,
    eps: f64,
}

#[derive(Debug, Clone)]
pub struct AssetDetailTables {
    pub funds: Table<FundRecord>,
    pub cash: Table<CashRecord>,
    pub bond_holdings: Table<BondHoldingRecord>,
    pub bond_details: Table<BondDetailRecord>,
    pub commodities: Table<CommodityRecord>,
    pub stocks: Table<StockRecord>,
}

// ── Generation ────────────────────────────────────────────────

/// Split [0, 1) into two ratios that sum to exactly 1 after rounding.
fn split_allocation(rng: &mut StageRng) -> (f64, f64) {
    let first = round_to(rng.next_f64(), RATIO_PLACES);
    let second = round_to(1.0 - first, RATIO_PLACES);
    (first, second)
}

pub fn generate_assets(
    config: &SynthConfig,
    portfolios: &Table<PortfolioRecord>,
    rng: &mut StageRng,
) -> SynthResult<Table<AssetRecord>> {
    let target = config.asset_target;
    let count = portfolios.len();
    if target < count || target > count * 2 {
        return Err(SynthError::AssetTargetUnreachable {
            target,
            portfolios: count,
        });
    }

    let doubled: HashSet<usize> = rng.sample_indices(count, target - count).into_iter().collect();
    let mut assets = Vec::with_capacity(target);
    let mut push = |ratio: f64, portfolio_id: &PortfolioId| {
        let asset_id = sequential_id("a", assets.len() + 1);
        assets.push(AssetRecord {
            asset_id,
            allocation_ratio: ratio,
            portfolio_id: portfolio_id.clone(),
        });
    };

    for (i, portfolio) in portfolios.iter().enumerate() {
        if doubled.contains(&i) {
            let (first, second) = split_allocation(rng);
            push(first, &portfolio.portfolio_id);
            push(second, &portfolio.portfolio_id);
        } else {
            push(1.0, &portfolio.portfolio_id);
        }
    }

    log::info!(
        "stage=asset: {} assets across {} portfolios ({} with two)",
        assets.len(),
        count,
        doubled.len()
    );
    Ok(Table::new(ASSET_TABLE, assets))
}

pub fn generate_asset_details(
    config: &SynthConfig,
    assets: &Table<AssetRecord>,
    rng: &mut StageRng,
) -> SynthResult<AssetDetailTables> {
    let partition = &config.asset_partition;
    if partition.total() != assets.len() {
        return Err(SynthError::PartitionMismatch {
            what: "asset_partition",
            expected: assets.len(),
            actual: partition.total(),
        });
    }

    let ids: Vec<&AssetId> = assets.iter().map(|a| &a.asset_id).collect();
    let [
        (_, funds_range),
        (_, cash_range),
        (_, bonds_range),
        (_, commodity_range),
        (_, stocks_range),
    ] = class_slices(partition);

    let funds = ids[funds_range]
        .iter()
        .map(|id| FundRecord {
            asset_id: (*id).clone(),
            dividend_yield: round_to(rng.uniform(0.02, 0.06), 3),
            expense_ratio: round_to(rng.uniform(0.01, 0.03), 3),
        })
        .collect();

    let cash = ids[cash_range]
        .iter()
        .map(|id| CashRecord {
            asset_id: (*id).clone(),
            cash_amount: rng.range_inclusive(1_000, 20_000),
            currency: "usd".to_string(),
        })
        .collect();

    let bond_holdings: Vec<_> = ids[bonds_range]
        .iter()
        .enumerate()
        .map(|(i, id)| BondHoldingRecord {
            asset_id: (*id).clone(),
            bond_name: format!("bond{}", i + 1),
            num_of_bonds: rng.range_inclusive(10, 200),
        })
        .collect();
    let bond_details = generate_bond_details(&bond_holdings, rng);

    let commodities = ids[commodity_range]
        .iter()
        .map(|id| {
            let num_commodity = rng.range_inclusive(1, 100);
            CommodityRecord {
                asset_id: (*id).clone(),
                num_commodity,
                commodity_type: NameGenerator::generate_commodity(rng).to_string(),
            }
        })
        .collect();

    let mut specs: HashMap<&'static str, StockSpec> = HashMap::new();
    let stocks = ids[stocks_range]
        .iter()
        .map(|id| {
            let stock_name = NameGenerator::generate_stock(rng);
            let spec = *specs.entry(stock_name).or_insert_with(|| StockSpec {
                pe_ratio: round_to(rng.uniform(10.0, 35.0), 2),
                ebita: round_to(rng.uniform(1.0, 15.0), 2),
                eps: round_to(rng.uniform(0.5, 5.0), 2),
            });
            StockRecord {
                asset_id: (*id).clone(),
                pe_ratio: spec.pe_ratio,
                stock_name: stock_name.to_string(),
                ebita: spec.ebita,
                num_of_stocks: rng.range_inclusive(50, 1000),
                eps: spec.eps,
            }
        })
        .collect();
    log::debug!("stage=asset_detail: {} distinct stocks memoized", specs.len());

    let tables = AssetDetailTables {
        funds: Table::new(FUNDS_TABLE, funds),
        cash: Table::new(CASH_TABLE, cash),
        bond_holdings: Table::new(BOND_HOLDING_TABLE, bond_holdings),
        bond_details: Table::new(BOND_DETAIL_TABLE, bond_details),
        commodities: Table::new(COMMODITY_TABLE, commodities),
        stocks: Table::new(STOCKS_TABLE, stocks),
    };
    log::info!(
        "stage=asset_detail: funds={} cash={} bonds={} (names={}) commodity={} stocks={}",
        tables.funds.len(),
        tables.cash.len(),
        tables.bond_holdings.len(),
        tables.bond_details.len(),
        tables.commodities.len(),
        tables.stocks.len()
    );
    Ok(tables)
}

/// One fundamentals row per distinct bond name, first occurrence first.
fn generate_bond_details(
    holdings: &[BondHoldingRecord],
    rng: &mut StageRng,
) -> Vec<BondDetailRecord> {
    let mut seen = HashSet::new();
    holdings
        .iter()
        .filter(|h| seen.insert(h.bond_name.as_str()))
        .map(|h| {
            let interest_rate = round_to(rng.uniform(1.0, 6.0), 2);
            let dividend_yields = round_to(rng.uniform(0.01, 0.06), 3);
            let year = 2000 + rng.range_inclusive(28, 35) as i32;
            let day = rng.range_inclusive(1, 28) as u32;
            BondDetailRecord {
                bond_name: h.bond_name.clone(),
                interest_rate,
                dividend_yields,
                maturity_date: ymd(year, 12, day),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StageSlot};

    #[test]
    fn default_slices_are_contiguous() {
        let slices = class_slices(&AssetPartitionConfig::default());
        assert_eq!(slices[0], (AssetClass::Funds, 0..40));
        assert_eq!(slices[1], (AssetClass::Cash, 40..60));
        assert_eq!(slices[2], (AssetClass::Bonds, 60..80));
        assert_eq!(slices[3], (AssetClass::Commodity, 80..100));
        assert_eq!(slices[4], (AssetClass::Stocks, 100..150));
    }

    #[test]
    fn split_allocation_sums_to_one() {
        let mut rng = RngBank::new(9).for_stage(StageSlot::Asset);
        for _ in 0..1000 {
            let (a, b) = split_allocation(&mut rng);
            assert!((a + b - 1.0).abs() < 1e-9, "{a} + {b} != 1");
        }
    }

    #[test]
    fn unreachable_target_is_an_error() {
        let portfolios = Table::new(
            "portfolio",
            vec![PortfolioRecord {
                portfolio_id: "p001".into(),
                annualised_return: None,
                invested_value: 100_000,
                portfolio_fee: 880.0,
                goal_id: "g001".into(),
            }],
        );
        let mut rng = RngBank::new(1).for_stage(StageSlot::Asset);
        let result = generate_assets(&SynthConfig::default(), &portfolios, &mut rng);
        assert!(matches!(
            result,
            Err(SynthError::AssetTargetUnreachable { target: 150, portfolios: 1 })
        ));
    }

    #[test]
    fn bond_details_follow_distinct_names() {
        let holding = |id: &str, name: &str| BondHoldingRecord {
            asset_id: id.into(),
            bond_name: name.into(),
            num_of_bonds: 10,
        };
        let holdings = vec![
            holding("a061", "bond1"),
            holding("a062", "bond2"),
            holding("a063", "bond1"),
        ];
        let mut rng = RngBank::new(1).for_stage(StageSlot::AssetDetail);

        let details = generate_bond_details(&holdings, &mut rng);
        let names: Vec<_> = details.iter().map(|d| d.bond_name.as_str()).collect();
        assert_eq!(names, vec!["bond1", "bond2"]);
    }
}
