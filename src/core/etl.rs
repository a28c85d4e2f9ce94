use crate::core::Pipeline;
use crate::domain::model::SyncReport;
use crate::utils::error::{EtlError, Result};

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    dry_run: bool,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<SyncReport> {
        tracing::info!("Starting feature layer sync...");

        // Extract
        let extraction = self.pipeline.extract().await?;
        if let Some(latest) = extraction.latest_occurred_on {
            tracing::info!("🕒 Latest occurred_on_date seen: {}", latest.to_rfc3339());
        }

        // 抓取中途失敗：完全沒有資料就中止，不碰圖層
        if extraction.stop_reason.is_failure() {
            if extraction.features.is_empty() {
                return Err(EtlError::UpstreamError {
                    message: format!("no records fetched ({})", extraction.stop_reason),
                });
            }
            tracing::warn!(
                "⚠️ Fetch stopped early ({}); continuing with {} features",
                extraction.stop_reason,
                extraction.features.len()
            );
        }

        let stats = extraction.stats.clone();
        let stop_reason = extraction.stop_reason.clone();

        // Transform
        let transformed = self.pipeline.transform(extraction).await?;
        let mut report = SyncReport {
            stats,
            stop_reason,
            latest_occurred_on: transformed.latest_occurred_on,
            features: transformed.features.len(),
            load: None,
        };

        if self.dry_run {
            tracing::info!(
                "🔍 DRY RUN - {} features prepared, feature layer not modified",
                report.features
            );
            return Ok(report);
        }

        // Load
        let summary = self.pipeline.load(transformed).await?;
        if summary.failed > 0 {
            return Err(EtlError::PartialUploadError {
                uploaded: summary.uploaded,
                failed: summary.failed,
            });
        }

        report.load = Some(summary);
        Ok(report)
    }
}
