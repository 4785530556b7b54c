//! Deterministic name generation using curated, lowercase name lists.
//!
//! Covers investors, their employers, goal names, and the fixed rosters
//! used by asset and company tables. All generation is deterministic
//! (same RNG seed = same names).

use crate::rng::StageRng;

/// Deterministic name generator using curated name lists
pub struct NameGenerator;

impl NameGenerator {
    /// Generate (first, last) deterministically
    pub fn generate_person(rng: &mut StageRng) -> (&'static str, &'static str) {
        let first = *rng.pick(Self::first_names());
        let last = *rng.pick(Self::last_names());
        (first, last)
    }

    pub fn generate_employer(rng: &mut StageRng) -> &'static str {
        *rng.pick(Self::employers())
    }

    pub fn generate_brokerage(rng: &mut StageRng) -> &'static str {
        *rng.pick(Self::brokerages())
    }

    pub fn generate_region(rng: &mut StageRng) -> &'static str {
        *rng.pick(Self::regions())
    }

    pub fn generate_stock(rng: &mut StageRng) -> &'static str {
        *rng.pick(Self::stocks())
    }

    pub fn generate_commodity(rng: &mut StageRng) -> &'static str {
        *rng.pick(Self::commodities())
    }

    /// Weighted goal name: the first three names take 90% of the mass.
    pub fn generate_goal_name(rng: &mut StageRng) -> &'static str {
        let index = rng.weighted_index(Self::goal_weights());
        Self::goal_names()[index]
    }

    fn first_names() -> &'static [&'static str] {
        &[
            "john", "jane", "michael", "sarah", "david", "laura", "robert", "linda",
            "james", "barbara", "william", "elizabeth", "richard", "jennifer", "charles",
            "maria", "thomas", "susan", "christopher", "margaret", "mark", "nancy",
            "daniel", "patricia", "kevin", "helen",
        ]
    }

    fn last_names() -> &'static [&'static str] {
        &[
            "smith", "doe", "johnson", "williams", "brown", "jones", "miller", "davis",
            "garcia", "rodriguez", "wilson", "martinez", "anderson", "taylor", "hernandez",
            "moore", "martin", "jackson", "thompson", "white", "hall", "lee", "scott",
            "green", "young", "clark",
        ]
    }

    fn employers() -> &'static [&'static str] {
        &[
            "stark industries", "wayne enterprises", "acme corp", "globex corporation",
            "initech",
        ]
    }

    pub fn goal_names() -> &'static [&'static str] {
        &[
            "retirement", "buy a house", "college fund", "vacation", "emergency fund",
            "car purchase", "investment portfolio", "business startup", "wedding",
            "health fund",
        ]
    }

    fn goal_weights() -> &'static [u32] {
        &[40, 30, 20, 5, 5, 5, 5, 5, 5, 5]
    }

    pub fn stocks() -> &'static [&'static str] {
        &["apple", "google", "amazon", "microsoft", "tesla"]
    }

    pub fn commodities() -> &'static [&'static str] {
        &["gold", "silver", "oil", "wheat", "corn"]
    }

    pub fn brokerages() -> &'static [&'static str] {
        &[
            "charles schwab", "fidelity investments", "td ameritrade", "e*trade",
            "robinhood", "vanguard", "morgan stanley wealth management", "jpmorgan chase",
            "bofa securities", "citigroup global markets", "goldman sachs", "ubs",
            "credit suisse", "deutsche bank", "barclays",
        ]
    }

    pub fn regions() -> &'static [&'static str] {
        &["america", "europe", "asia", "africa", "oceania"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StageSlot};

    #[test]
    fn name_generation_is_deterministic() {
        let mut rng1 = RngBank::new(12345).for_stage(StageSlot::Investor);
        let mut rng2 = RngBank::new(12345).for_stage(StageSlot::Investor);

        assert_eq!(
            NameGenerator::generate_person(&mut rng1),
            NameGenerator::generate_person(&mut rng2),
            "Same seed should produce same name"
        );
    }

    #[test]
    fn goal_names_favor_the_first_three() {
        let mut rng = RngBank::new(12345).for_stage(StageSlot::Goal);
        let head = &NameGenerator::goal_names()[..3];

        let hits = (0..2000)
            .filter(|_| head.contains(&NameGenerator::generate_goal_name(&mut rng)))
            .count();

        // Expected share is 90%.
        assert!(hits > 1600, "only {hits}/2000 draws hit the top three names");
    }

    #[test]
    fn weights_cover_every_goal_name() {
        assert_eq!(NameGenerator::goal_names().len(), NameGenerator::goal_weights().len());
    }
}
