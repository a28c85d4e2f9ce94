pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{datastore::DatastoreClient, feature_service::FeatureServiceClient};
pub use crate::config::{settings::SyncSettings, CliConfig};
pub use crate::core::{etl::EtlEngine, pipeline::SyncPipeline};
pub use crate::utils::error::{EtlError, Result};
