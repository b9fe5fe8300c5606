pub mod api;
pub mod certificates;
pub mod cli;
pub mod config;
pub mod contacts;
pub mod email;
pub mod error;
pub mod recipients;
pub mod registry;
pub mod report;
pub mod types;
