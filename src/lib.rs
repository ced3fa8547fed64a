// Fraud-detection feature derivation over a credit-card transaction ledger,
// plus a small decision-tree harness for evaluating the derived features.

pub mod classifier;
pub mod config;
pub mod csv_reader;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod timeline;
