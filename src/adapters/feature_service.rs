use crate::config::settings::SyncSettings;
use crate::domain::model::{BatchOutcome, Feature, Session};
use crate::domain::ports::FeatureSink;
use crate::utils::error::{EtlError, Result};
use reqwest::header::REFERER;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const TOKEN_EXPIRATION_MINUTES: &str = "60";

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    details: Vec<String>,
}

impl ServiceErrorBody {
    fn describe(&self) -> String {
        let mut message = self
            .message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        if let Some(code) = self.code {
            message = format!("{} (code {})", message, code);
        }
        if !self.details.is_empty() {
            message = format!("{}: {}", message, self.details.join("; "));
        }
        message
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    expires: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EditError {
    code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditResult {
    success: bool,
    error: Option<EditError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    #[serde(default)]
    delete_results: Vec<EditResult>,
}

#[derive(Debug, Deserialize)]
struct LayerField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LayerInfo {
    #[serde(default)]
    fields: Vec<LayerField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyEditsResponse {
    #[serde(default)]
    add_results: Vec<EditResult>,
}

/// ArcGIS REST client for one hosted feature layer.
pub struct FeatureServiceClient {
    client: Client,
    org_url: String,
    layer_url: String,
    username: String,
    password: String,
}

impl FeatureServiceClient {
    pub fn new(
        client: Client,
        org_url: &str,
        layer_url: &str,
        username: String,
        password: String,
    ) -> Self {
        Self {
            client,
            org_url: org_url.trim_end_matches('/').to_string(),
            layer_url: layer_url.trim_end_matches('/').to_string(),
            username,
            password,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        let client = super::http::build_client(settings.timeout, settings.accept_invalid_certs)?;
        Ok(Self::new(
            client,
            &settings.org_url,
            &settings.layer_url,
            settings.username.clone(),
            settings.password.clone(),
        ))
    }

    /// Token 以 `client=referer` 申請，之後每個請求都要帶相同的 Referer
    async fn post_form<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        tracing::debug!("POST {} ({})", url, operation);
        let request = self
            .client
            .post(url)
            .header(REFERER, self.org_url.as_str())
            .form(form);
        self.send(operation, request).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        tracing::debug!("GET {} ({})", url, operation);
        let request = self
            .client
            .get(url)
            .header(REFERER, self.org_url.as_str())
            .query(query);
        self.send(operation, request).await
    }

    async fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::ServiceError {
                operation: operation.to_string(),
                message: format!("HTTP status {}", status.as_u16()),
            });
        }

        // ArcGIS 錯誤通常仍回 200，錯誤內容放在 `error` 物件
        let value: serde_json::Value = response.json().await?;
        if let Some(error) = value.get("error") {
            let body: ServiceErrorBody = serde_json::from_value(error.clone())?;
            return Err(EtlError::ServiceError {
                operation: operation.to_string(),
                message: body.describe(),
            });
        }

        Ok(serde_json::from_value(value)?)
    }
}

impl FeatureSink for FeatureServiceClient {
    async fn authenticate(&self) -> Result<Session> {
        let url = format!("{}/sharing/rest/generateToken", self.org_url);
        let form = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("client", "referer"),
            ("referer", self.org_url.as_str()),
            ("expiration", TOKEN_EXPIRATION_MINUTES),
            ("f", "json"),
        ];

        let response: TokenResponse = self
            .post_form("generateToken", &url, &form)
            .await
            .map_err(|e| match e {
                EtlError::ServiceError { message, .. } => EtlError::AuthError { message },
                EtlError::SerializationError(_) => EtlError::AuthError {
                    message: "token missing from generateToken response".to_string(),
                },
                other => other,
            })?;

        Ok(Session {
            token: response.token,
            username: self.username.clone(),
            expires: response.expires,
        })
    }

    async fn delete_all(&self, session: &Session) -> Result<usize> {
        let url = format!("{}/deleteFeatures", self.layer_url);
        let form = [
            ("where", "1=1"),
            ("f", "json"),
            ("token", session.token.as_str()),
        ];

        let response: DeleteResponse = self.post_form("deleteFeatures", &url, &form).await?;

        let failed = response
            .delete_results
            .iter()
            .filter(|result| !result.success)
            .count();
        if failed > 0 {
            return Err(EtlError::ServiceError {
                operation: "deleteFeatures".to_string(),
                message: format!("{} existing features could not be deleted", failed),
            });
        }

        Ok(response.delete_results.len())
    }

    async fn layer_fields(&self, session: &Session) -> Result<Vec<String>> {
        let query = [("f", "json"), ("token", session.token.as_str())];
        let info: LayerInfo = self.get_json("layerInfo", &self.layer_url, &query).await?;

        if info.fields.is_empty() {
            return Err(EtlError::ServiceError {
                operation: "layerInfo".to_string(),
                message: "layer definition lists no fields".to_string(),
            });
        }

        Ok(info.fields.into_iter().map(|field| field.name).collect())
    }

    async fn add_features(&self, session: &Session, batch: &[Feature]) -> Result<BatchOutcome> {
        let url = format!("{}/applyEdits", self.layer_url);
        let adds = serde_json::to_string(batch)?;
        let form = [
            ("adds", adds.as_str()),
            ("rollbackOnFailure", "true"),
            ("f", "json"),
            ("token", session.token.as_str()),
        ];

        let response: ApplyEditsResponse = self.post_form("applyEdits", &url, &form).await?;

        let mut outcome = BatchOutcome::default();
        for result in &response.add_results {
            if result.success {
                outcome.added += 1;
            } else {
                outcome.failed += 1;
                if let Some(error) = &result.error {
                    tracing::debug!(
                        "Feature rejected (code {:?}): {}",
                        error.code,
                        error.description.as_deref().unwrap_or("no description")
                    );
                }
            }
        }

        // 服務沒有逐筆回報時，剩下的筆數視為失敗
        let unreported = batch.len().saturating_sub(response.add_results.len());
        outcome.failed += unreported;

        Ok(outcome)
    }
}
