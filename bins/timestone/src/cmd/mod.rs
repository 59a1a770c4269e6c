pub mod backend;
pub mod config;
pub mod error;
pub mod estimate;
pub mod export;
pub mod notify;
pub mod prep;
pub mod query;
pub mod transfer;
pub mod wear;
