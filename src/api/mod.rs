//! Client for the external certificate registry
pub mod client;
pub mod config;
pub mod error;
pub mod record;

pub use client::{CertificateApi, ListQuery};
pub use config::ApiConfig;
pub use error::ApiError;
pub use record::{CertificatePatch, CertificateRecord};
