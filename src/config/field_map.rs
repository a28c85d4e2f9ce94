use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_file_extension, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_LATITUDE_KEY: &str = "Lat";
pub const DEFAULT_LONGITUDE_KEY: &str = "Long";
pub const DEFAULT_OCCURRED_ON_KEY: &str = "OCCURRED_ON_DATE";
pub const UPDATED_ON: &str = "updated_on";

fn default_latitude() -> String {
    DEFAULT_LATITUDE_KEY.to_string()
}

fn default_longitude() -> String {
    DEFAULT_LONGITUDE_KEY.to_string()
}

fn default_occurred_on() -> String {
    DEFAULT_OCCURRED_ON_KEY.to_string()
}

/// 檔案沒有 `attributes` 時使用的投影
fn default_attributes() -> BTreeMap<String, String> {
    [
        ("incident_number", "INCIDENT_NUMBER"),
        ("offense_description", "OFFENSE_DESCRIPTION"),
        ("occurred_on_date", "OCCURRED_ON_DATE"),
    ]
    .into_iter()
    .map(|(dest, src)| (dest.to_string(), src.to_string()))
    .collect()
}

/// How upstream columns become feature geometry and attributes.
///
/// `attributes` maps destination field name to source field name. Any of the
/// three key fields left out of the file falls back to the crime-incident
/// defaults (`Lat`, `Long`, `OCCURRED_ON_DATE`). A file without `attributes`
/// projects `incident_number`, `offense_description` and `occurred_on_date`;
/// an explicit empty table projects nothing but `updated_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(default = "default_latitude")]
    pub latitude: String,
    #[serde(default = "default_longitude")]
    pub longitude: String,
    #[serde(default = "default_occurred_on")]
    pub occurred_on_date: String,
    #[serde(default = "default_attributes")]
    pub attributes: BTreeMap<String, String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            occurred_on_date: default_occurred_on(),
            attributes: default_attributes(),
        }
    }
}

impl FieldMap {
    /// 從檔案載入；`.toml` 以 TOML 解析，其餘以 JSON 解析
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();
        validate_file_extension("field_map", &path_str, &["json", "toml"])?;

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let field_map = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        field_map.validate()?;
        Ok(field_map)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EtlError::ConfigValidationError {
            field: "field_map".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Destination field names the layer is expected to accept.
    pub fn destination_fields(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(UPDATED_ON))
    }
}

impl Validate for FieldMap {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("field_map.latitude", &self.latitude)?;
        validate_non_empty_string("field_map.longitude", &self.longitude)?;
        validate_non_empty_string("field_map.occurred_on_date", &self.occurred_on_date)?;

        for (dest, src) in &self.attributes {
            validate_non_empty_string("field_map.attributes", dest)?;
            validate_non_empty_string(&format!("field_map.attributes.{}", dest), src)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_full_json_field_map() {
        let field_map = FieldMap::from_json_str(
            r#"{"latitude":"Y","longitude":"X","occurred_on_date":"DT","attributes":{"id":"CASE_ID"}}"#,
        )
        .unwrap();

        assert_eq!(field_map.latitude, "Y");
        assert_eq!(field_map.longitude, "X");
        assert_eq!(field_map.occurred_on_date, "DT");
        assert_eq!(field_map.attributes.get("id").unwrap(), "CASE_ID");
    }

    #[test]
    fn test_missing_keys_fall_back_per_field() {
        let field_map = FieldMap::from_json_str(r#"{"latitude":"Y"}"#).unwrap();

        assert_eq!(field_map.latitude, "Y");
        assert_eq!(field_map.longitude, "Long");
        assert_eq!(field_map.occurred_on_date, "OCCURRED_ON_DATE");
        assert_eq!(field_map.attributes, FieldMap::default().attributes);
    }

    #[test]
    fn test_explicit_empty_attributes_are_kept_empty() {
        let field_map = FieldMap::from_json_str(r#"{"attributes":{}}"#).unwrap();
        assert!(field_map.attributes.is_empty());
        assert_eq!(field_map.destination_fields().collect::<Vec<_>>(), vec!["updated_on"]);
    }

    #[test]
    fn test_default_projection() {
        let field_map = FieldMap::default();
        assert_eq!(field_map.attributes.len(), 3);
        assert_eq!(
            field_map.attributes.get("incident_number").unwrap(),
            "INCIDENT_NUMBER"
        );
        assert_eq!(
            field_map.destination_fields().collect::<Vec<_>>(),
            vec![
                "incident_number",
                "occurred_on_date",
                "offense_description",
                "updated_on"
            ]
        );
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
latitude = "lat"
longitude = "lon"

[attributes]
case = "CASE_NUMBER"
"#,
        )
        .unwrap();

        let field_map = FieldMap::from_file(file.path()).unwrap();
        assert_eq!(field_map.latitude, "lat");
        assert_eq!(field_map.occurred_on_date, "OCCURRED_ON_DATE");
        assert_eq!(field_map.attributes.get("case").unwrap(), "CASE_NUMBER");
    }

    #[test]
    fn test_from_json_file_rejects_blank_source() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"attributes":{"id":" "}}"#).unwrap();

        assert!(matches!(
            FieldMap::from_file(file.path()),
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        assert!(matches!(
            FieldMap::from_json_str("{not json"),
            Err(EtlError::SerializationError(_))
        ));
    }
}
