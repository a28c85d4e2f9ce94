pub mod field_map;
pub mod job_file;
pub mod settings;

use clap::Parser;
use std::path::PathBuf;

/// Command line surface. Credentials and URLs may also come from the
/// environment (a `.env` file is loaded first) or from a `--config` job file.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "feature-layer-etl")]
#[command(about = "Replace an ArcGIS Online feature layer with recent records from an open-data API")]
pub struct CliConfig {
    #[arg(long, env = "AGOL_USERNAME", help = "ArcGIS Online username")]
    pub username: Option<String>,

    #[arg(long, env = "AGOL_PASSWORD", hide_env_values = true, help = "ArcGIS Online password")]
    pub password: Option<String>,

    #[arg(
        long,
        env = "AGOL_ORG_URL",
        help = "ArcGIS organization URL (e.g. https://yourorg.maps.arcgis.com)"
    )]
    pub org_url: Option<String>,

    #[arg(long, env = "FEATURE_LAYER_URL", help = "Feature layer URL ending in /FeatureServer/0")]
    pub layer_url: Option<String>,

    #[arg(long, env = "DATASTORE_API_URL", help = "External datastore API URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "DATASTORE_RESOURCE_ID", help = "Resource id passed to the datastore API")]
    pub resource_id: Option<String>,

    #[arg(long, help = "How many days back to include (default: 7)")]
    pub days: Option<u32>,

    #[arg(long, help = "Path to the field mapping file (.json or .toml)")]
    pub field_map: Option<PathBuf>,

    #[arg(short, long, help = "Path to a TOML job file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Rows requested per datastore page (default: 1000)")]
    pub page_size: Option<usize>,

    #[arg(long, help = "Features uploaded per applyEdits call (default: 500)")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Timeout in seconds for every HTTP request")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Skip TLS certificate verification for the feature service")]
    pub insecure: bool,

    #[arg(long, help = "Only send attributes declared in the field map")]
    pub strict_attributes: bool,

    #[arg(long, help = "Fetch and map records without touching the feature layer")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Append a plain-text run log to this file")]
    pub log_file: Option<PathBuf>,
}
