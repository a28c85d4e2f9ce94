pub mod etl;
pub mod fetcher;
pub mod loader;
pub mod mapper;
pub mod pipeline;

pub use crate::domain::model::{Feature, Record, TransformResult};
pub use crate::domain::ports::{
    AttributePolicy, ConfigProvider, FeatureSink, Pipeline, RecordSource,
};
pub use crate::utils::error::Result;
