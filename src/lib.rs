pub mod cli;
pub mod config;
pub mod errors;
pub mod instrument;
pub mod journal;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod orders;
pub mod report;
pub mod trade;
pub mod utils;
