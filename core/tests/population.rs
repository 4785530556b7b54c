//! Full-size dataset shape: counts, key formats and partitions.

use advisory_synth_core::{
    asset_generator::{class_slices, AssetClass},
    config::SynthConfig,
    investor_generator::is_valid_phone,
    pipeline::{SynthDataset, SynthPipeline},
    risk_assessment_generator::{Answer, RiskTolerance},
    transaction_generator::TopupType,
};
use std::collections::{BTreeMap, HashMap, HashSet};

fn build(seed: u64) -> SynthDataset {
    SynthPipeline::new(seed, SynthConfig::default())
        .expect("default config is valid")
        .generate()
        .expect("generation")
}

#[test]
fn investors_have_unique_well_formed_phones() {
    let ds = build(42);
    assert_eq!(ds.investors.len(), 50);

    let phones: HashSet<_> = ds.investors.iter().map(|i| i.phone_number.clone()).collect();
    assert_eq!(phones.len(), 50, "phone numbers must be unique");
    for phone in &phones {
        assert!(is_valid_phone(phone), "bad phone {phone}");
    }
}

#[test]
fn every_investor_holds_one_to_three_goals() {
    let ds = build(42);
    let mut per_investor: HashMap<&str, usize> = HashMap::new();
    for goal in ds.goals.iter() {
        *per_investor.entry(goal.phone_number.as_str()).or_default() += 1;
    }
    assert_eq!(per_investor.len(), ds.investors.len());
    assert!(per_investor.values().all(|n| (1..=3).contains(n)));
    assert_eq!(ds.portfolios.len(), ds.goals.len());
}

#[test]
fn rubric_labels_follow_non_a_count() {
    let ds = build(42);
    assert_eq!(ds.assessments.len(), 50);
    for row in ds.rubric.iter() {
        let non_a = row
            .answers()
            .iter()
            .filter(|a| **a != Answer::A)
            .count();
        let expected = match non_a % 3 {
            0 => RiskTolerance::Conservative,
            1 => RiskTolerance::Moderate,
            _ => RiskTolerance::Aggressive,
        };
        assert_eq!(row.risk_tolerance, expected);
    }
}

#[test]
fn twelve_performance_rows_per_portfolio() {
    let ds = build(42);
    let mut per_portfolio: HashMap<&str, usize> = HashMap::new();
    for row in ds.performance.iter() {
        *per_portfolio.entry(row.portfolio_id.as_str()).or_default() += 1;
        assert_eq!(row.market_value, row.invested_value + row.gain_loss);
    }
    assert_eq!(per_portfolio.len(), ds.portfolios.len());
    assert!(per_portfolio.values().all(|n| *n == 12));
}

#[test]
fn assets_hit_target_and_allocations_sum_to_one() {
    let ds = build(42);
    assert_eq!(ds.assets.len(), 150);

    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for asset in ds.assets.iter() {
        *sums.entry(asset.portfolio_id.as_str()).or_default() += asset.allocation_ratio;
    }
    assert_eq!(sums.len(), ds.portfolios.len(), "every portfolio holds an asset");
    for (portfolio, sum) in sums {
        assert!((sum - 1.0).abs() < 1e-6, "{portfolio} sums to {sum}");
    }
}

#[test]
fn funds_slice_assets_appear_only_in_funds() {
    let ds = build(42);
    let config = SynthConfig::default();
    let details = &ds.asset_details;

    let (_, funds_range) = class_slices(&config.asset_partition)
        .into_iter()
        .find(|(class, _)| *class == AssetClass::Funds)
        .expect("funds slice");
    let fund_id = &ds.assets.rows()[funds_range.start].asset_id;

    assert!(details.funds.contains_key(fund_id));
    assert!(!details.cash.contains_key(fund_id));
    assert!(!details.bond_holdings.contains_key(fund_id));
    assert!(!details.commodities.contains_key(fund_id));
    assert!(!details.stocks.contains_key(fund_id));

    assert_eq!(details.funds.len(), 40);
    assert_eq!(details.cash.len(), 20);
    assert_eq!(details.bond_holdings.len(), 20);
    assert_eq!(details.bond_details.len(), 20);
    assert_eq!(details.commodities.len(), 20);
    assert_eq!(details.stocks.len(), 50);
}

#[test]
fn stock_fundamentals_are_consistent_per_name() {
    let ds = build(42);
    let mut seen = HashMap::new();
    for stock in ds.asset_details.stocks.iter() {
        let spec = (stock.pe_ratio, stock.ebita, stock.eps);
        let first = *seen.entry(stock.stock_name.clone()).or_insert(spec);
        assert_eq!(first, spec, "{} fundamentals drifted", stock.stock_name);
    }
}

#[test]
fn transactions_split_three_ways() {
    let ds = build(42);
    let txns = &ds.transaction_details;
    assert_eq!(ds.transactions.len(), 900);
    assert_eq!(txns.market.len(), 300);
    assert_eq!(txns.rebalancing.len(), 300);
    assert_eq!(txns.withdrawal_topup.len(), 300);

    assert!(txns.market.contains_key("t001"));
    assert!(txns.market.contains_key("t300"));
    assert!(txns.rebalancing.contains_key("t301"));
    assert!(txns.withdrawal_topup.contains_key("t601"));
    assert!(txns.withdrawal_topup.contains_key("t900"));
    assert_eq!(ds.companies.len(), 15);
}

#[test]
fn recurring_topups_are_pinned_to_first_portfolio() {
    let ds = build(42);
    let first_portfolio = &ds.portfolios.rows()[0].portfolio_id;

    for (month, n) in (601..613).enumerate() {
        let id = format!("t{n}");
        let txn = ds.transactions.get(&id).expect("pinned transaction");
        assert_eq!(&txn.portfolio_id, first_portfolio);
        assert_eq!(
            txn.transaction_date.format("%m-%d").to_string(),
            format!("{:02}-01", month + 1)
        );
        assert_eq!(
            ds.transaction_details.withdrawal_topup.get(&id).map(|w| w.topup_type),
            Some(TopupType::Topup)
        );
    }
}

#[test]
fn rebalancing_fee_is_two_tenths_percent_of_invested() {
    let ds = build(42);
    for fee in ds.transaction_details.rebalancing.iter() {
        let txn = ds.transactions.get(&fee.transaction_id).expect("parent transaction");
        let portfolio = ds.portfolios.get(&txn.portfolio_id).expect("parent portfolio");
        let expected = (portfolio.invested_value as f64 * 0.002 * 100.0).round() / 100.0;
        assert_eq!(fee.fee, expected);
    }
}
