pub mod classify;
pub mod cli;
pub mod config;
pub mod disambiguate;
pub mod error;
pub mod export;
pub mod ingest;
pub mod merge;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod numeric;
pub mod pipeline;
pub mod reference;
pub mod resolve;
pub mod search;
