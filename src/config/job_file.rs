use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional TOML job description. Every value can also come from a flag or
/// the environment, which take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub destination: DestinationSection,
    #[serde(default)]
    pub sync: SyncSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSection {
    pub api_url: Option<String>,
    pub resource_id: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationSection {
    pub org_url: Option<String>,
    pub layer_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub batch_size: Option<usize>,
    pub insecure: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSection {
    pub days: Option<u32>,
    pub field_map: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
    pub strict_attributes: Option<bool>,
}

impl JobFile {
    /// 從 TOML 檔案載入配置，相對的 field_map 路徑以設定檔所在目錄為準
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(EtlError::IoError)?;
        let mut job = Self::from_toml_str(&content)?;

        if let (Some(field_map), Some(base)) = (job.sync.field_map.as_ref(), path.parent()) {
            if field_map.is_relative() {
                job.sync.field_map = Some(base.join(field_map));
            }
        }

        Ok(job)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AGOL_PASSWORD})，未設定的變數視為錯誤
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let mut unresolved = Vec::new();
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                unresolved.push(var_name.to_string());
                String::new()
            })
        });

        if !unresolved.is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: "environment".to_string(),
                message: format!("unset variables referenced: {}", unresolved.join(", ")),
            });
        }

        Ok(result.into_owned())
    }
}
