pub mod config;
pub mod fault;
pub mod infeed;
pub mod parse_report;
