use crate::core::fetcher::fetch_records;
use crate::core::loader::replace_all;
use crate::core::mapper::RecordMapper;
use crate::core::{ConfigProvider, FeatureSink, Pipeline, RecordSource};
use crate::domain::model::{Extraction, LoadSummary, TransformResult};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

pub struct SyncPipeline<R: RecordSource, S: FeatureSink, C: ConfigProvider> {
    source: R,
    sink: S,
    config: C,
    run_time: Option<DateTime<Utc>>,
}

impl<R: RecordSource, S: FeatureSink, C: ConfigProvider> SyncPipeline<R, S, C> {
    pub fn new(source: R, sink: S, config: C) -> Self {
        Self {
            source,
            sink,
            config,
            run_time: None,
        }
    }

    /// 固定執行時間（cutoff 與 `updated_on` 都以此為準）
    pub fn with_run_time(mut self, run_time: DateTime<Utc>) -> Self {
        self.run_time = Some(run_time);
        self
    }
}

#[async_trait::async_trait]
impl<R: RecordSource, S: FeatureSink, C: ConfigProvider> Pipeline for SyncPipeline<R, S, C> {
    async fn extract(&self) -> Result<Extraction> {
        let now = self.run_time.unwrap_or_else(Utc::now);
        let mapper = RecordMapper::new(self.config.field_map(), now, self.config.lookback_days());

        tracing::info!(
            "🚀 Fetching records from the last {} days (cutoff {})",
            self.config.lookback_days(),
            mapper.cutoff().to_rfc3339()
        );

        let extraction = fetch_records(&self.source, &mapper, self.config.page_size()).await;

        tracing::info!(
            "📊 Fetched {} rows over {} pages: {} kept, {} too old, {} skipped ({})",
            extraction.stats.rows_seen,
            extraction.stats.pages,
            extraction.stats.kept,
            extraction.stats.stale,
            extraction.stats.skipped,
            extraction.stop_reason
        );

        Ok(extraction)
    }

    async fn transform(&self, extraction: Extraction) -> Result<TransformResult> {
        // 投影已在逐列對應時完成；屬性是否符合圖層要到 load 登入後才知道
        tracing::debug!(
            "Projected attributes: {}",
            self.config
                .field_map()
                .destination_fields()
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(TransformResult {
            features: extraction.features,
            latest_occurred_on: extraction.latest_occurred_on,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadSummary> {
        replace_all(
            &self.sink,
            result.features,
            self.config.batch_size(),
            self.config.attribute_policy(),
        )
        .await
    }
}
