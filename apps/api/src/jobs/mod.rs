pub mod aggregator;
pub mod country;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod prompts;
pub mod ranking;
pub mod sources;
