use crate::{
    config::SynthConfig,
    investor_generator::InvestorRecord,
    name_generator::NameGenerator,
    rng::StageRng,
    table::{Record, Table},
    types::{round_to, sequential_id, ymd, GoalId, PhoneNumber, PortfolioId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const GOAL_TABLE: &str = "financialgoal";
pub const PORTFOLIO_TABLE: &str = "portfolio";

pub const TIMELINE_MIN: i64 = 2024;
pub const TIMELINE_MAX: i64 = 2030;
pub const GOAL_AMOUNT_MIN: i64 = 30_000;
pub const GOAL_AMOUNT_MAX: i64 = 1_000_000;
pub const INVESTED_MIN: i64 = 50_000;
pub const INVESTED_MAX: i64 = 450_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialGoalRecord {
    #[serde(rename = "goalid")]
    pub goal_id: GoalId,
    #[serde(rename = "goalname")]
    pub goal_name: String,
    pub timeline: i64,
    #[serde(rename = "amountofmoney")]
    pub amount_of_money: i64,
    #[serde(rename = "phonenumber")]
    pub phone_number: PhoneNumber,
    #[serde(rename = "datecreated")]
    pub date_created: NaiveDate,
}

impl Record for FinancialGoalRecord {
    const HEADER: &'static [&'static str] = &[
        "goalid",
        "goalname",
        "timeline",
        "amountofmoney",
        "phonenumber",
        "datecreated",
    ];

    fn key(&self) -> String {
        self.goal_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    #[serde(rename = "portfolioid")]
    pub portfolio_id: PortfolioId,
    /// Empty until the performance repair pass fills it.
    #[serde(rename = "annualisedreturn")]
    pub annualised_return: Option<f64>,
    #[serde(rename = "investedvalue")]
    pub invested_value: i64,
    #[serde(rename = "portfoliofee")]
    pub portfolio_fee: f64,
    #[serde(rename = "goalid")]
    pub goal_id: GoalId,
}

impl Record for PortfolioRecord {
    const HEADER: &'static [&'static str] = &[
        "portfolioid",
        "annualisedreturn",
        "investedvalue",
        "portfoliofee",
        "goalid",
    ];

    fn key(&self) -> String {
        self.portfolio_id.clone()
    }
}

/// Every goal carries the same creation date.
pub fn goal_creation_date() -> NaiveDate {
    ymd(2023, 6, 1)
}

pub fn management_fee(invested_value: i64, rate: f64) -> f64 {
    round_to(invested_value as f64 * rate, 2)
}

/// 1..=3 goals per investor, numbered globally in investor order.
pub fn generate_goals(
    config: &SynthConfig,
    investors: &Table<InvestorRecord>,
    rng: &mut StageRng,
) -> Table<FinancialGoalRecord> {
    let (min_goals, max_goals) = config.goals_per_investor;
    let mut goals = Vec::new();

    for investor in investors.iter() {
        let count = rng.range_inclusive(min_goals, max_goals);
        for _ in 0..count {
            let goal_name = NameGenerator::generate_goal_name(rng).to_string();
            let timeline = rng.range_inclusive(TIMELINE_MIN, TIMELINE_MAX);
            let amount_of_money = rng.range_inclusive(GOAL_AMOUNT_MIN, GOAL_AMOUNT_MAX);
            goals.push(FinancialGoalRecord {
                goal_id: sequential_id("g", goals.len() + 1),
                goal_name,
                timeline,
                amount_of_money,
                phone_number: investor.phone_number.clone(),
                date_created: goal_creation_date(),
            });
        }
    }

    log::info!(
        "stage=goal: {} goals for {} investors",
        goals.len(),
        investors.len()
    );
    Table::new(GOAL_TABLE, goals)
}

/// Exactly one portfolio per goal.
pub fn generate_portfolios(
    config: &SynthConfig,
    goals: &Table<FinancialGoalRecord>,
    rng: &mut StageRng,
) -> Table<PortfolioRecord> {
    let portfolios: Vec<_> = goals
        .iter()
        .enumerate()
        .map(|(i, goal)| {
            let invested_value = rng.range_inclusive(INVESTED_MIN, INVESTED_MAX);
            PortfolioRecord {
                portfolio_id: sequential_id("p", i + 1),
                annualised_return: None,
                invested_value,
                portfolio_fee: management_fee(invested_value, config.management_fee_rate),
                goal_id: goal.goal_id.clone(),
            }
        })
        .collect();

    log::info!("stage=portfolio: {} portfolios", portfolios.len());
    Table::new(PORTFOLIO_TABLE, portfolios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MANAGEMENT_FEE_RATE,
        investor_generator::generate_investors,
        rng::{RngBank, StageSlot},
    };

    #[test]
    fn fee_is_088_percent_rounded() {
        assert_eq!(management_fee(100_000, MANAGEMENT_FEE_RATE), 880.0);
        assert_eq!(management_fee(123_457, MANAGEMENT_FEE_RATE), 1086.42);
    }

    #[test]
    fn each_goal_gets_one_portfolio() {
        let config = SynthConfig::default();
        let bank = RngBank::new(42);
        let investors = generate_investors(&config, &mut bank.for_stage(StageSlot::Investor));
        let goals = generate_goals(&config, &investors, &mut bank.for_stage(StageSlot::Goal));
        let portfolios =
            generate_portfolios(&config, &goals, &mut bank.for_stage(StageSlot::Portfolio));

        assert_eq!(goals.len(), portfolios.len());
        for (goal, portfolio) in goals.iter().zip(portfolios.iter()) {
            assert_eq!(goal.goal_id, portfolio.goal_id);
            assert!(portfolio.annualised_return.is_none());
            assert!((INVESTED_MIN..=INVESTED_MAX).contains(&portfolio.invested_value));
        }
    }
}
