//! Fetch search-interest time series for a configured keyword list, reshape
//! them into dated CSV rows, and upload the result into a run-timestamped
//! folder on the storage backend.

pub mod config;
pub mod drive;
pub mod error;
pub mod run;
pub mod table;
pub mod trends;
