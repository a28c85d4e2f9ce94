use crate::utils::error::Result;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("feature-layer-etl/", env!("CARGO_PKG_VERSION"));

/// 兩個遠端服務共用的 client 設定；只有 feature service 允許關閉憑證驗證
pub fn build_client(timeout: Option<Duration>, accept_invalid_certs: bool) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    if accept_invalid_certs {
        tracing::warn!("⚠️ TLS certificate verification disabled for the feature service");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}
