use crate::config::field_map::FieldMap;
use crate::config::job_file::JobFile;
use crate::config::CliConfig;
use crate::domain::ports::{AttributePolicy, ConfigProvider};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 500;
const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Everything one run needs, resolved once at start-up.
#[derive(Clone)]
pub struct SyncSettings {
    pub username: String,
    pub password: String,
    pub org_url: String,
    pub layer_url: String,
    pub api_url: String,
    pub resource_id: Option<String>,
    pub lookback_days: u32,
    pub page_size: usize,
    pub batch_size: usize,
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
    pub attribute_policy: AttributePolicy,
    pub field_map_path: PathBuf,
    pub field_map: FieldMap,
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSettings")
            .field("username", &self.username)
            .field("password", &"********")
            .field("org_url", &self.org_url)
            .field("layer_url", &self.layer_url)
            .field("api_url", &self.api_url)
            .field("resource_id", &self.resource_id)
            .field("lookback_days", &self.lookback_days)
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("attribute_policy", &self.attribute_policy)
            .field("field_map_path", &self.field_map_path)
            .finish()
    }
}

impl SyncSettings {
    /// 載入 `--config` 指定的設定檔（若有）後再合併
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let job = cli.config.as_ref().map(JobFile::from_file).transpose()?;
        Self::resolve(cli, job.as_ref())
    }

    /// 優先順序：命令列/環境變數 > 設定檔 > 預設值
    pub fn resolve(cli: &CliConfig, job: Option<&JobFile>) -> Result<Self> {
        let fallback = JobFile::default();
        let job = job.unwrap_or(&fallback);

        let username = cli.username.clone().or_else(|| job.destination.username.clone());
        let password = cli.password.clone().or_else(|| job.destination.password.clone());
        let org_url = cli.org_url.clone().or_else(|| job.destination.org_url.clone());
        let layer_url = cli.layer_url.clone().or_else(|| job.destination.layer_url.clone());
        let api_url = cli.api_url.clone().or_else(|| job.source.api_url.clone());
        let field_map_path = cli.field_map.clone().or_else(|| job.sync.field_map.clone());

        let field_map_path = validate_required_field("field_map", &field_map_path)?.clone();
        validate_path("field_map", &field_map_path.to_string_lossy())?;

        let strict = cli.strict_attributes || job.sync.strict_attributes.unwrap_or(false);

        let settings = Self {
            username: validate_required_field("username", &username)?.clone(),
            password: validate_required_field("password", &password)?.clone(),
            org_url: validate_required_field("org_url", &org_url)?.clone(),
            layer_url: validate_required_field("layer_url", &layer_url)?.clone(),
            api_url: validate_required_field("api_url", &api_url)?.clone(),
            resource_id: cli
                .resource_id
                .clone()
                .or_else(|| job.source.resource_id.clone())
                .filter(|id| !id.trim().is_empty()),
            lookback_days: cli
                .days
                .or(job.sync.days)
                .unwrap_or(DEFAULT_LOOKBACK_DAYS),
            page_size: cli
                .page_size
                .or(job.source.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            batch_size: cli
                .batch_size
                .or(job.destination.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            timeout: cli
                .timeout_secs
                .or(job.sync.timeout_seconds)
                .map(Duration::from_secs),
            accept_invalid_certs: cli.insecure || job.destination.insecure.unwrap_or(false),
            attribute_policy: if strict {
                AttributePolicy::KnownFields
            } else {
                AttributePolicy::All
            },
            field_map: FieldMap::from_file(&field_map_path)?,
            field_map_path,
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for SyncSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("username", &self.username)?;
        validate_non_empty_string("password", &self.password)?;
        validate_url("org_url", &self.org_url)?;
        validate_url("layer_url", &self.layer_url)?;
        validate_url("api_url", &self.api_url)?;
        validate_range("days", self.lookback_days, 0, MAX_LOOKBACK_DAYS)?;
        validate_positive_number("page_size", self.page_size, 1)?;
        validate_positive_number("batch_size", self.batch_size, 1)?;
        if let Some(timeout) = self.timeout {
            validate_positive_number("timeout_secs", timeout.as_secs() as usize, 1)?;
        }
        self.field_map.validate()
    }
}

impl ConfigProvider for SyncSettings {
    fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    fn attribute_policy(&self) -> AttributePolicy {
        self.attribute_policy
    }
}
