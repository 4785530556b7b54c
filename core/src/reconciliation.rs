//! Reconciliation passes: recompute denormalized columns once the
//! tables they depend on are complete.
//!
//! Every pass is a left join: a missing parent row yields an empty
//! column, never an error. Inputs are never mutated; each pass returns
//! a new table under its own output name.
//!
//! Passes:
//!   - portfolio repair:   annualised return ← latest performance row
//!   - risk combination:   questionnaire + rubric label (+ investor)
//!   - company repair:     every non-withdrawal transaction gets a company

use crate::{
    goal_generator::PortfolioRecord,
    investor_generator::{Gender, InvestorRecord},
    error::{SynthError, SynthResult},
    performance_generator::PerformanceRecord,
    risk_assessment_generator::{
        answer_key, Answer, RiskAssessmentRecord, RiskRubricRecord, RiskTolerance,
    },
    rng::StageRng,
    table::{Record, Table},
    transaction_generator::{
        MarketTransactionRecord, PostTradeCompanyRecord, TransactionRecord,
        WithdrawalOrTopupRecord, COMPANY_TABLE,
    },
    types::{timestamp_format, PhoneNumber},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const REPAIRED_PORTFOLIO_TABLE: &str = "repaired_portfolio";
pub const RISK_COMBINED_TABLE: &str = "riskassessment_combined";
pub const RISK_PROFILE_TABLE: &str = "repaired_riskassessment_combined";
pub const REPAIRED_MARKET_TABLE: &str = "repaired_markettransaction";

// ── Portfolio repair ──────────────────────────────────────────

/// Latest annual return per portfolio: stable sort by timestamp, keep the
/// last row of each group (ties go to the later input row).
pub fn latest_annual_returns(performance: &Table<PerformanceRecord>) -> HashMap<&str, f64> {
    let mut ordered: Vec<&PerformanceRecord> = performance.iter().collect();
    ordered.sort_by_key(|row| row.datetime);

    let mut latest = HashMap::new();
    for row in ordered {
        latest.insert(row.portfolio_id.as_str(), row.annual_returns);
    }
    latest
}

pub fn repair_portfolios(
    portfolios: &Table<PortfolioRecord>,
    performance: &Table<PerformanceRecord>,
) -> Table<PortfolioRecord> {
    let latest = latest_annual_returns(performance);
    let mut unmatched = 0usize;

    let repaired: Vec<_> = portfolios
        .iter()
        .map(|p| {
            let annualised_return = latest.get(p.portfolio_id.as_str()).copied();
            if annualised_return.is_none() {
                unmatched += 1;
            }
            PortfolioRecord {
                annualised_return,
                ..p.clone()
            }
        })
        .collect();

    if unmatched > 0 {
        log::warn!("repair=portfolio: {unmatched} portfolios have no performance rows");
    }
    log::info!("repair=portfolio: repaired {} portfolios", repaired.len());
    Table::new(REPAIRED_PORTFOLIO_TABLE, repaired)
}

// ── Risk assessment combination ───────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentCombinedRecord {
    #[serde(rename = "phonenumber")]
    pub phone_number: PhoneNumber,
    #[serde(with = "timestamp_format")]
    pub datetime: NaiveDateTime,
    pub question1: Answer,
    pub question2: Answer,
    pub question3: Answer,
    pub question4: Answer,
    pub question5: Answer,
    #[serde(rename = "risktolerance")]
    pub risk_tolerance: Option<RiskTolerance>,
}

impl Record for RiskAssessmentCombinedRecord {
    const HEADER: &'static [&'static str] = &[
        "phonenumber",
        "datetime",
        "question1",
        "question2",
        "question3",
        "question4",
        "question5",
        "risktolerance",
    ];

    fn key(&self) -> String {
        format!("{}@{}", self.phone_number, self.datetime)
    }
}

/// Combined questionnaire view with investor attributes appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfileRecord {
    #[serde(rename = "phonenumber")]
    pub phone_number: PhoneNumber,
    #[serde(with = "timestamp_format")]
    pub datetime: NaiveDateTime,
    pub question1: Answer,
    pub question2: Answer,
    pub question3: Answer,
    pub question4: Answer,
    pub question5: Answer,
    #[serde(rename = "risktolerance")]
    pub risk_tolerance: Option<RiskTolerance>,
    pub name: Option<String>,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    #[serde(rename = "annualincome")]
    pub annual_income: Option<i64>,
    pub company: Option<String>,
    #[serde(rename = "otherinformation")]
    pub other_information: Option<String>,
}

impl Record for RiskProfileRecord {
    const HEADER: &'static [&'static str] = &[
        "phonenumber",
        "datetime",
        "question1",
        "question2",
        "question3",
        "question4",
        "question5",
        "risktolerance",
        "name",
        "dateofbirth",
        "gender",
        "email",
        "annualincome",
        "company",
        "otherinformation",
    ];

    fn key(&self) -> String {
        format!("{}@{}", self.phone_number, self.datetime)
    }
}

pub fn combine_risk_assessments(
    assessments: &Table<RiskAssessmentRecord>,
    rubric: &Table<RiskRubricRecord>,
) -> Table<RiskAssessmentCombinedRecord> {
    let rows: Vec<_> = assessments
        .iter()
        .map(|ra| RiskAssessmentCombinedRecord {
            phone_number: ra.phone_number.clone(),
            datetime: ra.datetime,
            question1: ra.question1,
            question2: ra.question2,
            question3: ra.question3,
            question4: ra.question4,
            question5: ra.question5,
            risk_tolerance: rubric
                .get(&answer_key(&ra.answers()))
                .map(|r| r.risk_tolerance),
        })
        .collect();

    let unlabelled = rows.iter().filter(|r| r.risk_tolerance.is_none()).count();
    if unlabelled > 0 {
        log::warn!("repair=risk: {unlabelled} questionnaires have no rubric row");
    }
    log::info!("repair=risk: combined {} questionnaires", rows.len());
    Table::new(RISK_COMBINED_TABLE, rows)
}

pub fn attach_investors(
    combined: &Table<RiskAssessmentCombinedRecord>,
    investors: &Table<InvestorRecord>,
) -> Table<RiskProfileRecord> {
    let rows: Vec<_> = combined
        .iter()
        .map(|c| {
            let investor = investors.get(&c.phone_number);
            RiskProfileRecord {
                phone_number: c.phone_number.clone(),
                datetime: c.datetime,
                question1: c.question1,
                question2: c.question2,
                question3: c.question3,
                question4: c.question4,
                question5: c.question5,
                risk_tolerance: c.risk_tolerance,
                name: investor.map(|i| i.name.clone()),
                date_of_birth: investor.map(|i| i.date_of_birth),
                gender: investor.map(|i| i.gender),
                email: investor.map(|i| i.email.clone()),
                annual_income: investor.map(|i| i.annual_income),
                company: investor.map(|i| i.company.clone()),
                other_information: investor.map(|i| i.other_information.clone()),
            }
        })
        .collect();

    log::info!("repair=risk: attached investors to {} questionnaires", rows.len());
    Table::new(RISK_PROFILE_TABLE, rows)
}

// ── Market transaction company repair ─────────────────────────

/// Drop market rows that collide with withdrawal/topup ids, then give every
/// remaining non-withdrawal transaction without a company a random one.
///
/// Fails with `MissingParent` when a transaction needs a company and the
/// company table is empty.
pub fn repair_market_transactions(
    transactions: &Table<TransactionRecord>,
    market: &Table<MarketTransactionRecord>,
    withdrawal_topup: &Table<WithdrawalOrTopupRecord>,
    companies: &Table<PostTradeCompanyRecord>,
    rng: &mut StageRng,
) -> SynthResult<Table<MarketTransactionRecord>> {
    let withdrawal_ids: HashSet<&str> = withdrawal_topup
        .iter()
        .map(|w| w.transaction_id.as_str())
        .collect();

    let mut rows: Vec<_> = market
        .iter()
        .filter(|m| !withdrawal_ids.contains(m.transaction_id.as_str()))
        .cloned()
        .collect();
    let dropped = market.len() - rows.len();

    let mut covered: HashSet<String> = rows.iter().map(|m| m.transaction_id.clone()).collect();
    let mut appended = 0usize;

    for txn in transactions.iter() {
        let id = txn.transaction_id.as_str();
        if withdrawal_ids.contains(id) || covered.contains(id) {
            continue;
        }
        if companies.is_empty() {
            return Err(SynthError::MissingParent {
                table: COMPANY_TABLE,
                key: txn.transaction_id.clone(),
            });
        }
        let company = rng.pick(companies.rows());
        rows.push(MarketTransactionRecord {
            transaction_id: txn.transaction_id.clone(),
            company_id: company.company_id.clone(),
        });
        covered.insert(txn.transaction_id.clone());
        appended += 1;
    }

    log::info!(
        "repair=market: kept {} rows, dropped {dropped}, appended {appended}",
        rows.len() - appended
    );
    Ok(Table::new(REPAIRED_MARKET_TABLE, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rng::{RngBank, StageSlot},
        transaction_generator::TopupType,
        types::ymd_hms,
    };

    fn portfolio(id: &str) -> PortfolioRecord {
        PortfolioRecord {
            portfolio_id: id.into(),
            annualised_return: None,
            invested_value: 100_000,
            portfolio_fee: 880.0,
            goal_id: "g001".into(),
        }
    }

    fn perf(id: &str, month: u32, day: u32, gain_loss: i64) -> PerformanceRecord {
        let at = ymd_hms(2024, month, day, 12, 0, 0);
        PerformanceRecord::new(id.into(), at, 100_000, gain_loss, 0.0)
    }

    #[test]
    fn latest_row_wins_regardless_of_input_order() {
        let portfolios = Table::new("portfolio", vec![portfolio("p001")]);
        let performance = Table::new(
            "performance",
            vec![perf("p001", 12, 20, 1000), perf("p001", 3, 1, -2000), perf("p001", 7, 9, 0)],
        );

        let repaired = repair_portfolios(&portfolios, &performance);
        assert_eq!(repaired.name(), REPAIRED_PORTFOLIO_TABLE);
        assert_eq!(repaired.rows()[0].annualised_return, Some(10.0));
        // Input untouched.
        assert_eq!(portfolios.rows()[0].annualised_return, None);
    }

    #[test]
    fn equal_timestamps_prefer_later_row() {
        let portfolios = Table::new("portfolio", vec![portfolio("p001")]);
        let performance = Table::new(
            "performance",
            vec![perf("p001", 12, 1, 0), perf("p001", 12, 1, 2000)],
        );
        let repaired = repair_portfolios(&portfolios, &performance);
        assert_eq!(repaired.rows()[0].annualised_return, Some(15.0));
    }

    #[test]
    fn portfolio_without_performance_stays_empty() {
        let portfolios = Table::new("portfolio", vec![portfolio("p001"), portfolio("p002")]);
        let performance = Table::new("performance", vec![perf("p001", 1, 1, 0)]);
        let repaired = repair_portfolios(&portfolios, &performance);
        assert_eq!(repaired.get("p001").unwrap().annualised_return, Some(5.0));
        assert_eq!(repaired.get("p002").unwrap().annualised_return, None);
    }

    fn market_row(id: &str) -> MarketTransactionRecord {
        MarketTransactionRecord {
            transaction_id: id.into(),
            company_id: "brk001".into(),
        }
    }

    fn withdrawal_row(id: &str, topup_type: TopupType) -> WithdrawalOrTopupRecord {
        WithdrawalOrTopupRecord {
            transaction_id: id.into(),
            topup_type,
        }
    }

    fn transaction_rows(count: usize) -> Table<TransactionRecord> {
        let txn = |n: usize| TransactionRecord {
            transaction_id: format!("t{n:03}"),
            transaction_amount: 500,
            transaction_date: ymd_hms(2024, 1, 1, 0, 0, 0),
            portfolio_id: "p001".into(),
            asset_id: "a001".into(),
        };
        Table::new("transaction", (1..=count).map(txn).collect())
    }

    #[test]
    fn company_repair_drops_collisions_and_fills_gaps() {
        let transactions = transaction_rows(6);
        let market = Table::new("markettransaction", vec![market_row("t001"), market_row("t005")]);
        let withdrawal = Table::new(
            "withdrawalortopuptransaction",
            vec![
                withdrawal_row("t005", TopupType::Topup),
                withdrawal_row("t006", TopupType::Withdrawal),
            ],
        );
        let companies = Table::new(
            "posttradecompany",
            vec![PostTradeCompanyRecord {
                company_id: "brk001".into(),
                company_name: "ubs".into(),
                region: "europe".into(),
            }],
        );
        let mut rng = RngBank::new(42).for_stage(StageSlot::CompanyRepair);

        let repaired =
            repair_market_transactions(&transactions, &market, &withdrawal, &companies, &mut rng)
                .unwrap();
        let ids: Vec<_> = repaired.iter().map(|m| m.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["t001", "t002", "t003", "t004"]);
    }

    #[test]
    fn company_repair_without_companies_fails() {
        let transactions = transaction_rows(3);
        let market = Table::new("markettransaction", vec![market_row("t001")]);
        let withdrawal = Table::new(
            "withdrawalortopuptransaction",
            vec![withdrawal_row("t003", TopupType::Withdrawal)],
        );
        let companies = Table::new("posttradecompany", Vec::new());
        let mut rng = RngBank::new(42).for_stage(StageSlot::CompanyRepair);

        let result =
            repair_market_transactions(&transactions, &market, &withdrawal, &companies, &mut rng);
        assert!(matches!(
            result,
            Err(SynthError::MissingParent { table: COMPANY_TABLE, ref key }) if key == "t002"
        ));
    }

    #[test]
    fn company_repair_without_gaps_needs_no_companies() {
        let transactions = transaction_rows(2);
        let market = Table::new("markettransaction", vec![market_row("t001")]);
        let withdrawal = Table::new(
            "withdrawalortopuptransaction",
            vec![withdrawal_row("t002", TopupType::Topup)],
        );
        let companies = Table::new("posttradecompany", Vec::new());
        let mut rng = RngBank::new(42).for_stage(StageSlot::CompanyRepair);

        let repaired =
            repair_market_transactions(&transactions, &market, &withdrawal, &companies, &mut rng)
                .unwrap();
        assert_eq!(repaired.len(), 1);
    }
}
