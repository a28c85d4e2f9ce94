use clap::Parser;
use feature_layer_etl::utils::error::ErrorSeverity;
use feature_layer_etl::utils::logger::{self, LoggerOptions};
use feature_layer_etl::{
    CliConfig, DatastoreClient, EtlEngine, EtlError, FeatureServiceClient, SyncPipeline,
    SyncSettings,
};

#[tokio::main]
async fn main() {
    // .env 要在解析參數前載入，才能作為 clap 的環境變數預設值
    dotenvy::dotenv().ok();
    let config = CliConfig::parse();

    if let Err(e) = logger::init_cli_logger(LoggerOptions {
        verbose: config.verbose,
        json: config.json_logs,
        log_file: config.log_file.as_deref(),
    }) {
        eprintln!("❌ Failed to open log file: {}", e);
        std::process::exit(exit_code(&e));
    }

    tracing::info!("Starting feature-layer-etl");

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        std::process::exit(exit_code(&e));
    }
}

async fn run(config: &CliConfig) -> Result<(), EtlError> {
    // 驗證配置
    let settings = SyncSettings::from_cli(config)?;
    tracing::info!("✅ Configuration loaded and validated successfully");
    tracing::debug!("Settings: {:?}", settings);

    let source = DatastoreClient::from_settings(&settings)?;
    let sink = FeatureServiceClient::from_settings(&settings)?;
    let pipeline = SyncPipeline::new(source, sink, settings);
    let engine = EtlEngine::new(pipeline).with_dry_run(config.dry_run);

    let report = engine.run().await?;

    match &report.load {
        Some(load) if load.skipped => {
            println!("✅ Nothing to upload; feature layer left unchanged");
        }
        Some(load) => {
            tracing::info!(
                "✅ Sync completed: {} deleted, {} uploaded in {} batches",
                load.deleted,
                load.uploaded,
                load.batches
            );
            println!(
                "✅ Feature layer replaced: {} features uploaded",
                load.uploaded
            );
        }
        None => {
            println!("🔍 Dry run: {} features prepared", report.features);
        }
    }

    Ok(())
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
