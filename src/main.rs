use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use etcd_sd::file_io::create_parent_dir_if_not_exist;
use etcd_sd::metrics;
use etcd_sd::EtcdStore;
use etcd_sd::FilePersister;
use etcd_sd::KeyPathParser;
use etcd_sd::Result;
use etcd_sd::SdConfig;
use etcd_sd::ServiceRegistry;
use etcd_sd::WatchSupervisor;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "etcd_sd")]
#[command(about = "Write the services registered under an etcd prefix as Prometheus target groups", long_about = None)]
struct Args {
    /// The file that contains the target groups
    #[arg(long = "target-file")]
    target_file: Option<PathBuf>,

    /// etcd server to connect to; repeat for several endpoints
    #[arg(long)]
    server: Vec<String>,

    /// Registry prefix whose services are written out as target groups
    #[arg(long)]
    prefix: Option<String>,

    /// Extra TOML configuration file, applied on top of CONFIG_PATH and SD__ variables
    #[arg(long)]
    config: Option<String>,

    /// Delay before a closed watch is reopened
    #[arg(long = "reconnect-delay-ms")]
    reconnect_delay_ms: Option<u64>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_settings(args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_observability(settings.log.dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("etcd_sd stops: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(args: Args) -> Result<SdConfig> {
    let mut settings = SdConfig::new()?;
    if let Some(path) = &args.config {
        settings = settings.with_override_config(path)?;
    }

    // command-line flags win over every other source
    if !args.server.is_empty() {
        settings.store.endpoints = args.server;
    }
    if let Some(prefix) = args.prefix {
        settings.discovery.prefix = prefix;
    }
    if let Some(target_file) = args.target_file {
        settings.discovery.target_file = target_file;
    }
    if let Some(delay) = args.reconnect_delay_ms {
        settings.watch.reconnect_delay_in_ms = delay;
    }

    settings.validate()
}

async fn run(settings: SdConfig) -> Result<()> {
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Startup failures are fatal: no retry on connect or snapshot.
    let store = EtcdStore::connect(&settings.store).await?;
    let persister = FilePersister::new(settings.discovery.target_file.clone());
    let registry = ServiceRegistry::new(KeyPathParser::new(&settings.discovery.prefix));
    let mut supervisor = WatchSupervisor::new(
        store,
        persister,
        registry,
        settings.watch.reconnect_delay(),
    );
    supervisor.bootstrap().await?;

    let metrics_server = if settings.monitoring.prometheus_enabled {
        let port = settings.monitoring.prometheus_port;
        Some(tokio::spawn(metrics::start_server(port, graceful_rx.clone())))
    } else {
        None
    };

    let watcher = tokio::spawn(async move { supervisor.run(graceful_rx).await });

    info!(
        target_file = %settings.discovery.target_file.display(),
        "Application started. Waiting for CTRL+C signal..."
    );
    graceful_shutdown(graceful_tx).await?;

    watcher
        .await
        .map_err(|e| etcd_sd::Error::Fatal(format!("watch task failed: {e}")))??;
    if let Some(server) = metrics_server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Metrics server stopped with error: {:?}", e),
            Err(e) => error!("Metrics server task failed: {}", e),
        }
    }

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let signal_error = |e: std::io::Error| etcd_sd::Error::Fatal(format!("signal handler: {e}"));
    let mut sigint = signal(SignalKind::interrupt()).map_err(signal_error)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(signal_error)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        etcd_sd::Error::Fatal(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown signal sent");
    Ok(())
}

fn init_observability(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(dir) = log_dir else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let log_path = dir.join("etcd_sd.log");
    create_parent_dir_if_not_exist(&log_path)?;
    let log_file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
        .map_err(|source| etcd_sd::PersistError::Io {
            path: log_path.clone(),
            source,
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();

    Ok(Some(guard))
}
