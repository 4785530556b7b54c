//! Risk questionnaires and the rubric derived from them.
//!
//! riskassessment1 holds raw answers; riskassessment2 maps every answer
//! combination that was actually observed to a tolerance label.

use crate::{
    config::SynthConfig,
    investor_generator::InvestorRecord,
    rng::StageRng,
    table::{Record, Table},
    types::{timestamp_format, ymd_hms, PhoneNumber},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const RISK_ASSESSMENT_TABLE: &str = "riskassessment1";
pub const RISK_RUBRIC_TABLE: &str = "riskassessment2";

/// Questionnaire answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    A,
    B,
    C,
    D,
    E,
}

impl Answer {
    pub const ALL: [Answer; 5] = [Answer::A, Answer::B, Answer::C, Answer::D, Answer::E];
}

pub type AnswerSet = [Answer; 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    /// Count answers other than `a`, then map the count mod 3:
    /// 0 → conservative, 1 → moderate, 2 → aggressive.
    pub fn classify(answers: &AnswerSet) -> Self {
        let non_a = answers.iter().filter(|a| **a != Answer::A).count();
        match non_a % 3 {
            0 => RiskTolerance::Conservative,
            1 => RiskTolerance::Moderate,
            _ => RiskTolerance::Aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentRecord {
    #[serde(rename = "phonenumber")]
    pub phone_number: PhoneNumber,
    #[serde(with = "timestamp_format")]
    pub datetime: NaiveDateTime,
    pub question1: Answer,
    pub question2: Answer,
    pub question3: Answer,
    pub question4: Answer,
    pub question5: Answer,
}

impl RiskAssessmentRecord {
    pub fn answers(&self) -> AnswerSet {
        [
            self.question1,
            self.question2,
            self.question3,
            self.question4,
            self.question5,
        ]
    }
}

impl Record for RiskAssessmentRecord {
    const HEADER: &'static [&'static str] = &[
        "phonenumber",
        "datetime",
        "question1",
        "question2",
        "question3",
        "question4",
        "question5",
    ];

    fn key(&self) -> String {
        format!("{}@{}", self.phone_number, self.datetime)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRubricRecord {
    pub question1: Answer,
    pub question2: Answer,
    pub question3: Answer,
    pub question4: Answer,
    pub question5: Answer,
    #[serde(rename = "risktolerance")]
    pub risk_tolerance: RiskTolerance,
}

impl RiskRubricRecord {
    pub fn from_answers(answers: AnswerSet) -> Self {
        let [question1, question2, question3, question4, question5] = answers;
        Self {
            question1,
            question2,
            question3,
            question4,
            question5,
            risk_tolerance: RiskTolerance::classify(&answers),
        }
    }

    pub fn answers(&self) -> AnswerSet {
        [
            self.question1,
            self.question2,
            self.question3,
            self.question4,
            self.question5,
        ]
    }
}

/// Rubric lookup key for an answer combination, e.g. `a-c-e-b-a`.
pub fn answer_key(answers: &AnswerSet) -> String {
    answers
        .iter()
        .map(|a| match a {
            Answer::A => "a",
            Answer::B => "b",
            Answer::C => "c",
            Answer::D => "d",
            Answer::E => "e",
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl Record for RiskRubricRecord {
    const HEADER: &'static [&'static str] = &[
        "question1",
        "question2",
        "question3",
        "question4",
        "question5",
        "risktolerance",
    ];

    fn key(&self) -> String {
        answer_key(&self.answers())
    }
}

/// First questionnaire timestamp; each following row is one day later.
pub fn assessment_base() -> NaiveDateTime {
    ymd_hms(2023, 6, 1, 10, 0, 0)
}

pub fn generate_assessments(
    config: &SynthConfig,
    investors: &Table<InvestorRecord>,
    rng: &mut StageRng,
) -> Table<RiskAssessmentRecord> {
    let phones: Vec<&PhoneNumber> = investors.iter().map(|i| &i.phone_number).collect();
    let base = assessment_base();

    let rows: Vec<_> = (0..config.risk_assessment_count)
        .map(|i| {
            let phone_number = (*rng.pick(&phones)).clone();
            let [question1, question2, question3, question4, question5] =
                std::array::from_fn(|_| *rng.pick(&Answer::ALL));
            RiskAssessmentRecord {
                phone_number,
                datetime: base + Duration::days(i as i64),
                question1,
                question2,
                question3,
                question4,
                question5,
            }
        })
        .collect();

    log::info!("stage=risk_assessment: generated {} questionnaires", rows.len());
    Table::new(RISK_ASSESSMENT_TABLE, rows)
}

/// One rubric row per distinct answer combination, in first-seen order.
pub fn derive_rubric(assessments: &Table<RiskAssessmentRecord>) -> Table<RiskRubricRecord> {
    let mut seen = HashSet::new();
    let rows: Vec<_> = assessments
        .iter()
        .map(RiskAssessmentRecord::answers)
        .filter(|answers| seen.insert(*answers))
        .map(RiskRubricRecord::from_answers)
        .collect();

    log::info!(
        "stage=risk_assessment: rubric has {} distinct combinations",
        rows.len()
    );
    Table::new(RISK_RUBRIC_TABLE, rows)
}
