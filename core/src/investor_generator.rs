use crate::{
    config::SynthConfig,
    name_generator::NameGenerator,
    rng::StageRng,
    table::{Record, Table},
    types::{ymd, PhoneNumber},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const INVESTOR_TABLE: &str = "investor";

pub const BIRTH_YEAR_MIN: i64 = 1960;
pub const BIRTH_YEAR_MAX: i64 = 2005;
pub const INCOME_MIN: i64 = 30_000;
pub const INCOME_MAX: i64 = 200_000;

/// The seven digits after the prefix are drawn from this range.
const PHONE_SUFFIX_MIN: i64 = 1_000_000;
const PHONE_SUFFIX_MAX: i64 = 9_999_999;
const PHONE_PREFIXES: [char; 2] = ['8', '9'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    M,
    F,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorRecord {
    #[serde(rename = "phonenumber")]
    pub phone_number: PhoneNumber,
    pub name: String,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: String,
    #[serde(rename = "annualincome")]
    pub annual_income: i64,
    pub company: String,
    #[serde(rename = "otherinformation")]
    pub other_information: String,
}

impl Record for InvestorRecord {
    const HEADER: &'static [&'static str] = &[
        "phonenumber",
        "name",
        "dateofbirth",
        "gender",
        "email",
        "annualincome",
        "company",
        "otherinformation",
    ];

    fn key(&self) -> String {
        self.phone_number.clone()
    }
}

/// `true` for 8 ASCII digits led by 8 or 9.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 8
        && phone.chars().all(|c| c.is_ascii_digit())
        && phone.starts_with(PHONE_PREFIXES)
}

/// Draw phone numbers until one is not in `taken`. Returns the number of
/// collisions alongside the fresh phone.
fn unique_phone(rng: &mut StageRng, taken: &HashSet<PhoneNumber>) -> (PhoneNumber, usize) {
    let mut collisions = 0;
    loop {
        let prefix = *rng.pick(&PHONE_PREFIXES);
        let suffix = rng.range_inclusive(PHONE_SUFFIX_MIN, PHONE_SUFFIX_MAX);
        let phone = format!("{prefix}{suffix}");
        if !taken.contains(&phone) {
            return (phone, collisions);
        }
        collisions += 1;
    }
}

pub fn generate_investors(config: &SynthConfig, rng: &mut StageRng) -> Table<InvestorRecord> {
    let mut taken = HashSet::with_capacity(config.investor_count);
    let mut investors = Vec::with_capacity(config.investor_count);
    let mut total_collisions = 0usize;

    for i in 1..=config.investor_count {
        let (phone_number, collisions) = unique_phone(rng, &taken);
        total_collisions += collisions;
        taken.insert(phone_number.clone());

        let (first, last) = NameGenerator::generate_person(rng);
        let year = rng.range_inclusive(BIRTH_YEAR_MIN, BIRTH_YEAR_MAX) as i32;
        let month = rng.range_inclusive(1, 12) as u32;
        let day = rng.range_inclusive(1, 28) as u32;
        let gender = if rng.chance(0.5) { Gender::M } else { Gender::F };
        let annual_income = rng.range_inclusive(INCOME_MIN, INCOME_MAX);
        let company = NameGenerator::generate_employer(rng).to_string();

        investors.push(InvestorRecord {
            phone_number,
            name: format!("{first} {last}"),
            date_of_birth: ymd(year, month, day),
            gender,
            email: format!("{first}.{last}{i}@example.com"),
            annual_income,
            company,
            other_information: format!("client {i}"),
        });
    }

    if total_collisions > 0 {
        log::debug!("stage=investor: {total_collisions} phone collisions retried");
    }
    log::info!("stage=investor: generated {} investors", investors.len());
    Table::new(INVESTOR_TABLE, investors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StageSlot};

    #[test]
    fn phone_pattern_check() {
        assert!(is_valid_phone("81234567"));
        assert!(is_valid_phone("99999999"));
        assert!(!is_valid_phone("71234567"));
        assert!(!is_valid_phone("8123456"));
        assert!(!is_valid_phone("8123456a"));
    }

    #[test]
    fn retry_skips_taken_numbers() {
        let bank = RngBank::new(5);
        let (first, _) = unique_phone(&mut bank.for_stage(StageSlot::Investor), &HashSet::new());

        // Same stream, but the first draw is now taken.
        let taken: HashSet<_> = [first.clone()].into_iter().collect();
        let (second, collisions) = unique_phone(&mut bank.for_stage(StageSlot::Investor), &taken);
        assert_ne!(first, second);
        assert_eq!(collisions, 1);
    }

    #[test]
    fn dates_of_birth_stay_in_range() {
        let config = SynthConfig::default();
        let mut rng = RngBank::new(42).for_stage(StageSlot::Investor);
        let investors = generate_investors(&config, &mut rng);

        for inv in investors.iter() {
            let dob = inv.date_of_birth;
            assert!((1960..=2005).contains(&chrono::Datelike::year(&dob)));
            assert!(chrono::Datelike::day(&dob) <= 28);
            assert!(inv.email.ends_with("@example.com"));
        }
    }
}
