#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tempest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;

// Re-export main types from sub-crates
pub use tempest_data as data;
pub use tempest_factors as factors;
pub use tempest_risk as risk;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
