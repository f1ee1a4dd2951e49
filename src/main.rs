use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_summarizer::api::{ApiServer, AppState};
use video_summarizer::jobs::spawn_reaper;
use video_summarizer::{
    Config, FfmpegExtractor, JobService, JobStore, PdfExporter, PipelineExecutor, PipelineSettings, ProviderRegistry,
    WkHtmlToPdf,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Video Summarizer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transcribe, summarize and translate uploaded videos")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to the standard search paths)"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("upload-dir")
                .short('u')
                .long("upload-dir")
                .value_name("DIR")
                .help("Directory for uploaded videos"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    init_tracing(matches.get_flag("verbose"));

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load()?,
    };

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(dir) = matches.get_one::<String>("upload-dir") {
        config.storage.upload_dir = PathBuf::from(dir);
        config.storage.audio_dir = config.storage.upload_dir.join("audio");
    }

    config.validate()?;

    info!("🚀 Video Summarizer starting...");
    info!("{}", config.summary());

    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    tokio::fs::create_dir_all(&config.storage.audio_dir).await?;

    let registry = ProviderRegistry::from_config(&config)?;
    info!("🤖 Providers: {}", registry.describe());
    if !config.providers.enable_fallback {
        warn!("Fallback providers disabled, the first provider failure fails the job");
    }

    let store = Arc::new(JobStore::new());
    let executor = Arc::new(PipelineExecutor::new(
        Arc::clone(&store),
        Arc::new(FfmpegExtractor::new(&config.audio)),
        registry,
        PipelineSettings::from_config(&config),
    ));
    let jobs = JobService::new(executor);

    let _reaper = spawn_reaper(
        Arc::clone(&store),
        Duration::from_secs(config.jobs.retention_seconds),
        Duration::from_secs(config.jobs.reap_interval_seconds.max(1)),
    );

    let state = AppState {
        jobs,
        pdf: PdfExporter::new(Arc::new(WkHtmlToPdf::new(&config.pdf))),
        config: Arc::new(config),
    };

    ApiServer::new(state).start().await
}

/// `RUST_LOG` wins over the defaults; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "video_summarizer=debug,tower_http=debug"
    } else {
        "video_summarizer=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json = std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
