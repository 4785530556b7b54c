//! Post-generation integrity check over a complete dataset.
//!
//! Checks:
//!   - every foreign key resolves to a parent row
//!   - per-portfolio allocation ratios sum to 1 (within 1e-6)
//!   - the rubric holds each answer combination exactly once, and covers
//!     every questionnaire
//!   - each asset sits in exactly one subtype table
//!   - each transaction sits in exactly one subtype table
//!
//! Violations are reported, never repaired here.

use crate::{
    pipeline::SynthDataset,
    risk_assessment_generator::answer_key,
    table::{Record, Table},
};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityViolation {
    #[error("{table}.{column} = '{key}' has no parent in '{parent}'")]
    MissingParent {
        table: String,
        column: &'static str,
        key: String,
        parent: String,
    },

    #[error("portfolio '{portfolio_id}' allocation ratios sum to {sum}")]
    AllocationSum { portfolio_id: String, sum: f64 },

    #[error("rubric has no row for answers '{answers}'")]
    RubricMissing { answers: String },

    #[error("rubric holds answers '{answers}' {count} times")]
    RubricDuplicate { answers: String, count: usize },

    #[error("'{key}' appears in {count} {kind} subtype tables")]
    SubtypeOverlap {
        kind: &'static str,
        key: String,
        count: usize,
    },

    #[error("'{key}' appears in no {kind} subtype table")]
    SubtypeMissing { kind: &'static str, key: String },
}

fn check_parent<C: Record, P: Record>(
    out: &mut Vec<IntegrityViolation>,
    child: &Table<C>,
    column: &'static str,
    parent: &Table<P>,
    key_of: impl Fn(&C) -> &str,
) {
    for row in child.iter() {
        let key = key_of(row);
        if !parent.contains_key(key) {
            out.push(IntegrityViolation::MissingParent {
                table: child.name().to_string(),
                column,
                key: key.to_string(),
                parent: parent.name().to_string(),
            });
        }
    }
}

/// Every parent key must occur in exactly one of `members`.
fn check_partition<'a>(
    out: &mut Vec<IntegrityViolation>,
    kind: &'static str,
    parents: impl Iterator<Item = String>,
    members: impl Iterator<Item = &'a str>,
) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in members {
        *counts.entry(key).or_default() += 1;
    }
    for key in parents {
        match counts.get(key.as_str()).copied().unwrap_or(0) {
            0 => out.push(IntegrityViolation::SubtypeMissing { kind, key }),
            1 => {}
            count => out.push(IntegrityViolation::SubtypeOverlap { kind, key, count }),
        }
    }
}

fn check_foreign_keys(out: &mut Vec<IntegrityViolation>, ds: &SynthDataset) {
    let assets = &ds.asset_details;
    let txns = &ds.transaction_details;

    check_parent(out, &ds.assessments, "phonenumber", &ds.investors, |r| r.phone_number.as_str());
    check_parent(out, &ds.goals, "phonenumber", &ds.investors, |r| r.phone_number.as_str());
    check_parent(out, &ds.portfolios, "goalid", &ds.goals, |r| r.goal_id.as_str());
    check_parent(out, &ds.performance, "portfolioid", &ds.portfolios, |r| r.portfolio_id.as_str());
    check_parent(out, &ds.assets, "portfolioid", &ds.portfolios, |r| r.portfolio_id.as_str());

    check_parent(out, &assets.funds, "assetid", &ds.assets, |r| r.asset_id.as_str());
    check_parent(out, &assets.cash, "assetid", &ds.assets, |r| r.asset_id.as_str());
    check_parent(out, &assets.bond_holdings, "assetid", &ds.assets, |r| r.asset_id.as_str());
    check_parent(out, &assets.bond_holdings, "bondname", &assets.bond_details, |r| {
        r.bond_name.as_str()
    });
    check_parent(out, &assets.commodities, "assetid", &ds.assets, |r| r.asset_id.as_str());
    check_parent(out, &assets.stocks, "assetid", &ds.assets, |r| r.asset_id.as_str());

    check_parent(out, &ds.transactions, "portfolioid", &ds.portfolios, |r| r.portfolio_id.as_str());
    check_parent(out, &ds.transactions, "assetid", &ds.assets, |r| r.asset_id.as_str());
    check_parent(out, &txns.market, "transactionid", &ds.transactions, |r| {
        r.transaction_id.as_str()
    });
    check_parent(out, &txns.market, "companyid", &ds.companies, |r| r.company_id.as_str());
    check_parent(out, &txns.rebalancing, "transactionid", &ds.transactions, |r| {
        r.transaction_id.as_str()
    });
    check_parent(out, &txns.withdrawal_topup, "transactionid", &ds.transactions, |r| {
        r.transaction_id.as_str()
    });
}

fn check_allocations(out: &mut Vec<IntegrityViolation>, ds: &SynthDataset) {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for asset in ds.assets.iter() {
        *sums.entry(asset.portfolio_id.as_str()).or_default() += asset.allocation_ratio;
    }
    for (portfolio_id, sum) in sums {
        if (sum - 1.0).abs() > ALLOCATION_TOLERANCE {
            out.push(IntegrityViolation::AllocationSum {
                portfolio_id: portfolio_id.to_string(),
                sum,
            });
        }
    }
}

fn check_rubric(out: &mut Vec<IntegrityViolation>, ds: &SynthDataset) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in ds.rubric.iter() {
        *counts.entry(row.key()).or_default() += 1;
    }
    for (answers, count) in &counts {
        if *count > 1 {
            out.push(IntegrityViolation::RubricDuplicate {
                answers: answers.clone(),
                count: *count,
            });
        }
    }

    let mut reported = HashSet::new();
    for ra in ds.assessments.iter() {
        let answers = answer_key(&ra.answers());
        if !counts.contains_key(&answers) && reported.insert(answers.clone()) {
            out.push(IntegrityViolation::RubricMissing { answers });
        }
    }
}

fn check_subtypes(out: &mut Vec<IntegrityViolation>, ds: &SynthDataset) {
    let a = &ds.asset_details;
    let asset_members = a
        .funds
        .iter()
        .map(|r| r.asset_id.as_str())
        .chain(a.cash.iter().map(|r| r.asset_id.as_str()))
        .chain(a.bond_holdings.iter().map(|r| r.asset_id.as_str()))
        .chain(a.commodities.iter().map(|r| r.asset_id.as_str()))
        .chain(a.stocks.iter().map(|r| r.asset_id.as_str()));
    check_partition(out, "asset", ds.assets.keys(), asset_members);

    let t = &ds.transaction_details;
    let txn_members = t
        .market
        .iter()
        .map(|r| r.transaction_id.as_str())
        .chain(t.rebalancing.iter().map(|r| r.transaction_id.as_str()))
        .chain(t.withdrawal_topup.iter().map(|r| r.transaction_id.as_str()));
    check_partition(out, "transaction", ds.transactions.keys(), txn_members);
}

pub fn check_dataset(ds: &SynthDataset) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    check_foreign_keys(&mut violations, ds);
    check_allocations(&mut violations, ds);
    check_rubric(&mut violations, ds);
    check_subtypes(&mut violations, ds);
    violations
}
