use crate::core::mapper::{RecordMapper, RowOutcome};
use crate::domain::model::{Extraction, FetchStats, StopReason};
use crate::domain::ports::RecordSource;

/// Page through `source`, mapping every row as its page arrives.
///
/// Never fails: a non-success status, malformed body or transport error ends
/// paging and whatever was gathered so far is returned, with the reason kept
/// in [`Extraction::stop_reason`].
pub async fn fetch_records<R: RecordSource>(
    source: &R,
    mapper: &RecordMapper<'_>,
    page_size: usize,
) -> Extraction {
    let page_size = page_size.max(1);
    let mut features = Vec::new();
    let mut stats = FetchStats::default();
    let mut latest_occurred_on = None;
    let mut offset = 0;

    let stop_reason = loop {
        let page = match source.fetch_page(offset, page_size).await {
            Ok(page) => page,
            Err(reason) => break reason,
        };

        if page.is_empty() {
            break StopReason::EmptyPage;
        }

        stats.pages += 1;
        let mut kept_on_page = 0;

        for record in &page {
            stats.rows_seen += 1;
            match mapper.map(record) {
                RowOutcome::Kept {
                    feature,
                    occurred_on,
                } => {
                    latest_occurred_on = latest_occurred_on.max(Some(occurred_on));
                    features.push(feature);
                    kept_on_page += 1;
                }
                RowOutcome::Stale { occurred_on } => {
                    latest_occurred_on = latest_occurred_on.max(Some(occurred_on));
                    stats.stale += 1;
                }
                RowOutcome::Skipped(reason) => {
                    tracing::debug!("Skipping row at offset {}: {}", offset, reason);
                    stats.skipped += 1;
                }
            }
        }

        stats.kept += kept_on_page;
        tracing::info!(
            "📄 Page {} (offset {}): {} rows, {} kept",
            stats.pages,
            offset,
            page.len(),
            kept_on_page
        );

        offset += page_size;

        if page.len() < page_size {
            break StopReason::ShortPage;
        }
    };

    Extraction {
        features,
        latest_occurred_on,
        stats,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::field_map::FieldMap;
    use crate::domain::model::Record;
    use crate::domain::ports::PageResult;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    /// 依序回傳預先準備的分頁，並記錄請求的 offset
    struct ScriptedSource {
        pages: Mutex<Vec<PageResult>>,
        offsets: Mutex<Vec<(usize, usize)>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<PageResult>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(usize, usize)> {
            self.offsets.lock().unwrap().clone()
        }
    }

    impl RecordSource for ScriptedSource {
        async fn fetch_page(&self, offset: usize, limit: usize) -> PageResult {
            self.offsets.lock().unwrap().push((offset, limit));
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(StopReason::Transport("script exhausted".to_string())))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap()
    }

    fn row(lat: serde_json::Value, occurred: &str) -> Record {
        let mut record = Record::default();
        record.data.insert("Lat".to_string(), lat);
        record
            .data
            .insert("Long".to_string(), serde_json::json!("-71.06"));
        record
            .data
            .insert("OCCURRED_ON_DATE".to_string(), serde_json::json!(occurred));
        record
    }

    fn recent(n: usize) -> Vec<Record> {
        (0..n)
            .map(|_| row(serde_json::json!("42.36"), "2024-05-07 10:00:00+00"))
            .collect()
    }

    #[tokio::test]
    async fn test_two_pages_with_null_latitudes() {
        let mut first = recent(1000);
        for record in first.iter_mut().take(50) {
            record
                .data
                .insert("Lat".to_string(), serde_json::Value::Null);
        }
        let source = ScriptedSource::new(vec![Ok(first), Ok(recent(300))]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 1000).await;

        assert_eq!(extraction.features.len(), 1250);
        assert_eq!(extraction.stop_reason, StopReason::ShortPage);
        assert_eq!(source.requests(), vec![(0, 1000), (1000, 1000)]);
        assert_eq!(
            extraction.stats,
            FetchStats {
                pages: 2,
                rows_seen: 1300,
                kept: 1250,
                stale: 0,
                skipped: 50,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        let source = ScriptedSource::new(vec![Ok(recent(2)), Ok(Vec::new())]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 2).await;

        assert_eq!(extraction.features.len(), 2);
        assert_eq!(extraction.stop_reason, StopReason::EmptyPage);
        assert_eq!(source.requests(), vec![(0, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn test_failure_keeps_accumulated_rows() {
        let source = ScriptedSource::new(vec![
            Ok(recent(2)),
            Ok(recent(2)),
            Err(StopReason::HttpStatus(502)),
        ]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 2).await;

        assert_eq!(extraction.features.len(), 4);
        assert_eq!(extraction.stop_reason, StopReason::HttpStatus(502));
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_first_page_returns_nothing() {
        let source = ScriptedSource::new(vec![Err(StopReason::MalformedBody(
            "missing field `result`".to_string(),
        ))]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 1000).await;

        assert!(extraction.features.is_empty());
        assert!(extraction.stop_reason.is_failure());
        assert_eq!(extraction.latest_occurred_on, None);
    }

    #[tokio::test]
    async fn test_watermark_includes_rows_before_cutoff() {
        // 座標不合法的列在解析時間前就被略過，不影響最新時間
        let page = vec![
            row(serde_json::json!("42.36"), "2024-04-01 00:00:00+00"),
            row(serde_json::json!("42.36"), "2024-05-02 00:00:00+00"),
            row(serde_json::json!("oops"), "2024-05-07 23:00:00+00"),
        ];
        let source = ScriptedSource::new(vec![Ok(page)]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 10).await;

        assert_eq!(extraction.features.len(), 1);
        assert_eq!(extraction.stats.stale, 1);
        assert_eq!(extraction.stats.skipped, 1);
        assert_eq!(
            extraction.latest_occurred_on,
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_watermark_from_stale_rows_only() {
        let page = vec![
            row(serde_json::json!("42.36"), "2024-03-01 00:00:00+00"),
            row(serde_json::json!("42.36"), "2024-04-01 00:00:00+00"),
        ];
        let source = ScriptedSource::new(vec![Ok(page)]);
        let field_map = FieldMap::default();
        let mapper = RecordMapper::new(&field_map, now(), 7);

        let extraction = fetch_records(&source, &mapper, 10).await;

        assert!(extraction.features.is_empty());
        assert_eq!(extraction.stop_reason, StopReason::ShortPage);
        assert_eq!(
            extraction.latest_occurred_on,
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap())
        );
    }
}
