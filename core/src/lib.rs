pub mod asset_generator;
pub mod config;
pub mod error;
pub mod goal_generator;
pub mod integrity;
pub mod investor_generator;
pub mod name_generator;
pub mod performance_generator;
pub mod pipeline;
pub mod reconciliation;
pub mod risk_assessment_generator;
pub mod rng;
pub mod sink;
pub mod store;
pub mod table;
pub mod transaction_generator;
pub mod types;
