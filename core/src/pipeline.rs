//! The generation pipeline: every stage, in dependency order.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Investor
//!   2. RiskAssessment1, then the RiskAssessment2 rubric
//!   3. FinancialGoal
//!   4. Portfolio
//!   5. Performance
//!   6. Asset
//!   7. Asset subtypes (funds, cash, bonds1/bonds2, commodity, stocks)
//!   8. PostTradeCompany
//!   9. Transaction
//!  10. Transaction subtypes (market, rebalancing, withdrawal/topup)
//!
//! Reconciliation runs after generation, over committed tables only:
//!   portfolio repair → risk combination → company repair.
//!
//! RULES:
//!   - Each stage reads only tables committed by earlier stages.
//!   - Each stage draws from its own StageRng slot.
//!   - Tables are immutable once committed; repairs produce new views.

use crate::{
    asset_generator::{generate_asset_details, generate_assets, AssetDetailTables, AssetRecord},
    config::SynthConfig,
    error::SynthResult,
    goal_generator::{
        generate_goals, generate_portfolios, FinancialGoalRecord, PortfolioRecord, PORTFOLIO_TABLE,
    },
    integrity::check_dataset,
    investor_generator::{generate_investors, InvestorRecord, INVESTOR_TABLE},
    performance_generator::{generate_performance, PerformanceRecord, PERFORMANCE_TABLE},
    reconciliation::{
        attach_investors, combine_risk_assessments, repair_market_transactions,
        repair_portfolios, RiskAssessmentCombinedRecord, RiskProfileRecord,
    },
    risk_assessment_generator::{
        derive_rubric, generate_assessments, RiskAssessmentRecord, RiskRubricRecord,
        RISK_ASSESSMENT_TABLE, RISK_RUBRIC_TABLE,
    },
    rng::{RngBank, StageSlot},
    sink::{read_table, write_table, TabularSink},
    table::{Record, Table},
    transaction_generator::{
        generate_companies, generate_transaction_details, generate_transactions,
        MarketTransactionRecord, PostTradeCompanyRecord, TransactionDetailTables,
        TransactionRecord, WithdrawalOrTopupRecord, COMPANY_TABLE, MARKET_TABLE,
        TRANSACTION_TABLE, WITHDRAWAL_TOPUP_TABLE,
    },
};
use std::path::Path;

/// Every base table of one run.
#[derive(Debug, Clone)]
pub struct SynthDataset {
    pub investors: Table<InvestorRecord>,
    pub assessments: Table<RiskAssessmentRecord>,
    pub rubric: Table<RiskRubricRecord>,
    pub goals: Table<FinancialGoalRecord>,
    pub portfolios: Table<PortfolioRecord>,
    pub performance: Table<PerformanceRecord>,
    pub assets: Table<AssetRecord>,
    pub asset_details: AssetDetailTables,
    pub companies: Table<PostTradeCompanyRecord>,
    pub transactions: Table<TransactionRecord>,
    pub transaction_details: TransactionDetailTables,
}

/// Row count of one committed table, tagged with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub stage: &'static str,
    pub table: String,
    pub rows: usize,
}

impl TableSummary {
    fn of<R: Record>(slot: StageSlot, table: &Table<R>) -> Self {
        Self {
            stage: slot.name(),
            table: table.name().to_string(),
            rows: table.len(),
        }
    }
}

impl SynthDataset {
    /// Write every base table, in generation order.
    pub fn write_to(&self, sink: &mut dyn TabularSink) -> SynthResult<()> {
        write_table(sink, &self.investors)?;
        write_table(sink, &self.assessments)?;
        write_table(sink, &self.rubric)?;
        write_table(sink, &self.goals)?;
        write_table(sink, &self.portfolios)?;
        write_table(sink, &self.performance)?;
        write_table(sink, &self.assets)?;
        write_table(sink, &self.asset_details.funds)?;
        write_table(sink, &self.asset_details.cash)?;
        write_table(sink, &self.asset_details.bond_holdings)?;
        write_table(sink, &self.asset_details.bond_details)?;
        write_table(sink, &self.asset_details.commodities)?;
        write_table(sink, &self.asset_details.stocks)?;
        write_table(sink, &self.companies)?;
        write_table(sink, &self.transactions)?;
        write_table(sink, &self.transaction_details.market)?;
        write_table(sink, &self.transaction_details.rebalancing)?;
        write_table(sink, &self.transaction_details.withdrawal_topup)?;
        Ok(())
    }

    pub fn summary(&self) -> Vec<TableSummary> {
        let assets = &self.asset_details;
        let txns = &self.transaction_details;
        vec![
            TableSummary::of(StageSlot::Investor, &self.investors),
            TableSummary::of(StageSlot::RiskAssessment, &self.assessments),
            TableSummary::of(StageSlot::RiskAssessment, &self.rubric),
            TableSummary::of(StageSlot::Goal, &self.goals),
            TableSummary::of(StageSlot::Portfolio, &self.portfolios),
            TableSummary::of(StageSlot::Performance, &self.performance),
            TableSummary::of(StageSlot::Asset, &self.assets),
            TableSummary::of(StageSlot::AssetDetail, &assets.funds),
            TableSummary::of(StageSlot::AssetDetail, &assets.cash),
            TableSummary::of(StageSlot::AssetDetail, &assets.bond_holdings),
            TableSummary::of(StageSlot::AssetDetail, &assets.bond_details),
            TableSummary::of(StageSlot::AssetDetail, &assets.commodities),
            TableSummary::of(StageSlot::AssetDetail, &assets.stocks),
            TableSummary::of(StageSlot::Company, &self.companies),
            TableSummary::of(StageSlot::Transaction, &self.transactions),
            TableSummary::of(StageSlot::TransactionDetail, &txns.market),
            TableSummary::of(StageSlot::TransactionDetail, &txns.rebalancing),
            TableSummary::of(StageSlot::TransactionDetail, &txns.withdrawal_topup),
        ]
    }

    pub fn repair_sources(&self) -> RepairSources<'_> {
        RepairSources {
            investors: &self.investors,
            assessments: &self.assessments,
            rubric: &self.rubric,
            portfolios: &self.portfolios,
            performance: &self.performance,
            companies: &self.companies,
            transactions: &self.transactions,
            market: &self.transaction_details.market,
            withdrawal_topup: &self.transaction_details.withdrawal_topup,
        }
    }
}

/// The tables the reconciliation passes read.
#[derive(Debug, Clone, Copy)]
pub struct RepairSources<'a> {
    pub investors: &'a Table<InvestorRecord>,
    pub assessments: &'a Table<RiskAssessmentRecord>,
    pub rubric: &'a Table<RiskRubricRecord>,
    pub portfolios: &'a Table<PortfolioRecord>,
    pub performance: &'a Table<PerformanceRecord>,
    pub companies: &'a Table<PostTradeCompanyRecord>,
    pub transactions: &'a Table<TransactionRecord>,
    pub market: &'a Table<MarketTransactionRecord>,
    pub withdrawal_topup: &'a Table<WithdrawalOrTopupRecord>,
}

/// Reconciliation inputs read back from a previous run's CSV directory.
#[derive(Debug, Clone)]
pub struct PersistedTables {
    pub investors: Table<InvestorRecord>,
    pub assessments: Table<RiskAssessmentRecord>,
    pub rubric: Table<RiskRubricRecord>,
    pub portfolios: Table<PortfolioRecord>,
    pub performance: Table<PerformanceRecord>,
    pub companies: Table<PostTradeCompanyRecord>,
    pub transactions: Table<TransactionRecord>,
    pub market: Table<MarketTransactionRecord>,
    pub withdrawal_topup: Table<WithdrawalOrTopupRecord>,
}

impl PersistedTables {
    pub fn load_csv(dir: &Path) -> SynthResult<Self> {
        let tables = Self {
            investors: read_table(dir, INVESTOR_TABLE)?,
            assessments: read_table(dir, RISK_ASSESSMENT_TABLE)?,
            rubric: read_table(dir, RISK_RUBRIC_TABLE)?,
            portfolios: read_table(dir, PORTFOLIO_TABLE)?,
            performance: read_table(dir, PERFORMANCE_TABLE)?,
            companies: read_table(dir, COMPANY_TABLE)?,
            transactions: read_table(dir, TRANSACTION_TABLE)?,
            market: read_table(dir, MARKET_TABLE)?,
            withdrawal_topup: read_table(dir, WITHDRAWAL_TOPUP_TABLE)?,
        };
        log::info!(
            "repair-only: loaded {} portfolios, {} performance rows, {} transactions from {}",
            tables.portfolios.len(),
            tables.performance.len(),
            tables.transactions.len(),
            dir.display()
        );
        Ok(tables)
    }

    pub fn sources(&self) -> RepairSources<'_> {
        RepairSources {
            investors: &self.investors,
            assessments: &self.assessments,
            rubric: &self.rubric,
            portfolios: &self.portfolios,
            performance: &self.performance,
            companies: &self.companies,
            transactions: &self.transactions,
            market: &self.market,
            withdrawal_topup: &self.withdrawal_topup,
        }
    }
}

/// Derived views produced by the reconciliation passes.
#[derive(Debug, Clone)]
pub struct ReconciledViews {
    pub repaired_portfolios: Table<PortfolioRecord>,
    pub risk_combined: Table<RiskAssessmentCombinedRecord>,
    pub risk_profiles: Table<RiskProfileRecord>,
    pub repaired_market: Table<MarketTransactionRecord>,
}

impl ReconciledViews {
    pub fn write_to(&self, sink: &mut dyn TabularSink) -> SynthResult<()> {
        write_table(sink, &self.repaired_portfolios)?;
        write_table(sink, &self.risk_combined)?;
        write_table(sink, &self.risk_profiles)?;
        write_table(sink, &self.repaired_market)?;
        Ok(())
    }

    pub fn summary(&self) -> Vec<TableSummary> {
        vec![
            TableSummary::of(StageSlot::Performance, &self.repaired_portfolios),
            TableSummary::of(StageSlot::RiskAssessment, &self.risk_combined),
            TableSummary::of(StageSlot::RiskAssessment, &self.risk_profiles),
            TableSummary::of(StageSlot::CompanyRepair, &self.repaired_market),
        ]
    }
}

pub struct SynthPipeline {
    config: SynthConfig,
    rng_bank: RngBank,
}

impl SynthPipeline {
    /// Validates the config up front so no stage starts on a bad partition.
    pub fn new(seed: u64, config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng_bank: RngBank::new(seed),
        })
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    /// Run every generation stage in the documented order.
    pub fn generate(&self) -> SynthResult<SynthDataset> {
        let config = &self.config;
        let bank = &self.rng_bank;
        log::info!("pipeline: generating dataset seed={}", bank.master_seed());

        let investors = generate_investors(config, &mut bank.for_stage(StageSlot::Investor));

        let mut rng = bank.for_stage(StageSlot::RiskAssessment);
        let assessments = generate_assessments(config, &investors, &mut rng);
        let rubric = derive_rubric(&assessments);

        let goals = generate_goals(config, &investors, &mut bank.for_stage(StageSlot::Goal));
        let portfolios =
            generate_portfolios(config, &goals, &mut bank.for_stage(StageSlot::Portfolio));
        let performance =
            generate_performance(config, &portfolios, &mut bank.for_stage(StageSlot::Performance));

        let assets = generate_assets(config, &portfolios, &mut bank.for_stage(StageSlot::Asset))?;
        let asset_details =
            generate_asset_details(config, &assets, &mut bank.for_stage(StageSlot::AssetDetail))?;

        let companies = generate_companies(config, &mut bank.for_stage(StageSlot::Company));
        let transactions = generate_transactions(
            config,
            &portfolios,
            &assets,
            &mut bank.for_stage(StageSlot::Transaction),
        );
        let transaction_details = generate_transaction_details(
            config,
            &transactions,
            &portfolios,
            &companies,
            &mut bank.for_stage(StageSlot::TransactionDetail),
        )?;

        let dataset = SynthDataset {
            investors,
            assessments,
            rubric,
            goals,
            portfolios,
            performance,
            assets,
            asset_details,
            companies,
            transactions,
            transaction_details,
        };

        let violations = check_dataset(&dataset);
        for violation in &violations {
            log::warn!("integrity: {violation}");
        }
        log::info!(
            "pipeline: generated {} tables, {} integrity violations",
            dataset.summary().len(),
            violations.len()
        );
        Ok(dataset)
    }

    /// Run the three reconciliation passes over committed tables.
    pub fn reconcile(&self, sources: RepairSources<'_>) -> SynthResult<ReconciledViews> {
        let repaired_portfolios = repair_portfolios(sources.portfolios, sources.performance);
        let risk_combined = combine_risk_assessments(sources.assessments, sources.rubric);
        let risk_profiles = attach_investors(&risk_combined, sources.investors);
        let repaired_market = repair_market_transactions(
            sources.transactions,
            sources.market,
            sources.withdrawal_topup,
            sources.companies,
            &mut self.rng_bank.for_stage(StageSlot::CompanyRepair),
        )?;

        Ok(ReconciledViews {
            repaired_portfolios,
            risk_combined,
            risk_profiles,
            repaired_market,
        })
    }

    /// Generate, then reconcile.
    pub fn run(&self) -> SynthResult<(SynthDataset, ReconciledViews)> {
        let dataset = self.generate()?;
        let views = self.reconcile(dataset.repair_sources())?;
        Ok((dataset, views))
    }
}
