use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WGS84_WKID: u32 = 4326;

/// One upstream row, keyed by source field name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

/// null、純量或陣列的列沒有欄位，但仍算一列
impl From<serde_json::Value> for Record {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(obj) => obj.into(),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub spatial_reference: SpatialReference,
}

impl Geometry {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            x: longitude,
            y: latitude,
            spatial_reference: SpatialReference { wkid: WGS84_WKID },
        }
    }
}

/// Feature in the shape the ArcGIS REST API expects for `adds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// 分頁停止的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 回傳筆數小於分頁大小，視為最後一頁
    ShortPage,
    EmptyPage,
    HttpStatus(u16),
    MalformedBody(String),
    Transport(String),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        !matches!(self, StopReason::ShortPage | StopReason::EmptyPage)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ShortPage => write!(f, "last page reached"),
            StopReason::EmptyPage => write!(f, "empty page"),
            StopReason::HttpStatus(code) => write!(f, "HTTP status {}", code),
            StopReason::MalformedBody(detail) => write!(f, "malformed response body: {}", detail),
            StopReason::Transport(detail) => write!(f, "request failed: {}", detail),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub pages: usize,
    pub rows_seen: usize,
    pub kept: usize,
    pub stale: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub features: Vec<Feature>,
    /// 只用於記錄，不會控制流程
    pub latest_occurred_on: Option<DateTime<Utc>>,
    pub stats: FetchStats,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub features: Vec<Feature>,
    pub latest_occurred_on: Option<DateTime<Utc>>,
}

/// Authenticated feature service session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expires: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub added: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub deleted: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub batches: usize,
    /// 圖層 schema 沒有定義而被移除的屬性數
    pub dropped_attributes: usize,
    /// 沒有任何 feature 時不會碰遠端圖層
    pub skipped: bool,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub stats: FetchStats,
    pub stop_reason: StopReason,
    pub latest_occurred_on: Option<DateTime<Utc>>,
    pub features: usize,
    pub load: Option<LoadSummary>,
}
