use crate::config::field_map::FieldMap;
use crate::domain::model::{
    BatchOutcome, Extraction, Feature, LoadSummary, Record, Session, StopReason, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// One page from the upstream datastore, or the reason paging has to stop.
pub type PageResult = std::result::Result<Vec<Record>, StopReason>;

pub trait RecordSource: Send + Sync {
    fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl std::future::Future<Output = PageResult> + Send;
}

pub trait FeatureSink: Send + Sync {
    fn authenticate(&self) -> impl std::future::Future<Output = Result<Session>> + Send;
    fn delete_all(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
    /// Field names defined by the destination layer's schema.
    fn layer_fields(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn add_features(
        &self,
        session: &Session,
        batch: &[Feature],
    ) -> impl std::future::Future<Output = Result<BatchOutcome>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePolicy {
    /// 保留完整的投影結果
    #[default]
    All,
    /// 只保留目的圖層 schema 有定義的欄位
    KnownFields,
}

pub trait ConfigProvider: Send + Sync {
    fn lookback_days(&self) -> u32;
    fn page_size(&self) -> usize;
    fn batch_size(&self) -> usize;
    fn field_map(&self) -> &FieldMap;
    fn attribute_policy(&self) -> AttributePolicy;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extraction>;
    async fn transform(&self, extraction: Extraction) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadSummary>;
}
