pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod scheduler;
pub mod types;
