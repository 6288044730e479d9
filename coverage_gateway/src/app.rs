use std::{
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    coverage::{ActiveClassPath, AgentEndpoint, CoverageConfig, CoverageService, JacocoCli, ToolRunner},
    handlers::{
        coverage::CoverageHandler, health::HealthHandler, index, report_files::ReportFilesHandler,
    },
    server::{HttpServer, ServerError},
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coverage-gateway",
    author,
    version,
    about = "JaCoCo coverage gateway HTTP server",
    long_about = None
)]
pub struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, env = "COVERAGE_GATEWAY_ADDRESS", default_value = "0.0.0.0:5000")]
    pub address: SocketAddr,

    /// Execution record written by the agent in file mode
    #[arg(long, env = "JACOCO_EXEC_FILE", value_name = "PATH", default_value = "/jacoco/jacoco.exec")]
    pub exec_file: PathBuf,

    /// Execution record pulled from the agent in TCP mode
    #[arg(
        long,
        env = "JACOCO_TCP_EXEC_FILE",
        value_name = "PATH",
        default_value = "/jacoco/jacoco-tcp.exec"
    )]
    pub tcp_exec_file: PathBuf,

    /// Directory the HTML report is written to
    #[arg(long, env = "JACOCO_REPORT_DIR", value_name = "PATH", default_value = "/jacoco/report")]
    pub report_dir: PathBuf,

    /// Class directory candidates, highest priority first
    #[arg(
        long = "class-files",
        env = "JACOCO_CLASS_FILES",
        value_name = "PATH",
        value_delimiter = ',',
        default_values = ["/spring-petclinic-classes", "/spring-petclinic/build/classes/java/main"]
    )]
    pub class_files: Vec<PathBuf>,

    /// Source tree linked from the report when present
    #[arg(
        long,
        env = "JACOCO_SOURCE_FILES",
        value_name = "PATH",
        default_value = "/spring-petclinic/src/main/java"
    )]
    pub source_files: PathBuf,

    /// Location of jacococli.jar
    #[arg(long = "jacoco-cli", env = "JACOCO_CLI_JAR", value_name = "PATH", default_value = "/app/jacococli.jar")]
    pub jacoco_cli: PathBuf,

    /// Java executable used to run the jacoco cli
    #[arg(long, env = "JAVA_BIN", value_name = "PATH", default_value = "java")]
    pub java: PathBuf,

    /// Host of the instrumented application's TCP agent
    #[arg(long, env = "JACOCO_AGENT_HOST", default_value = "spring-petclinic")]
    pub agent_host: String,

    /// Port of the instrumented application's TCP agent
    #[arg(long, env = "JACOCO_AGENT_PORT", default_value_t = 6300)]
    pub agent_port: u16,

    /// Report title; the record type is appended
    #[arg(long, env = "JACOCO_REPORT_TITLE", default_value = "Spring PetClinic Coverage Report")]
    pub report_title: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub address: SocketAddr,
    pub exec_file: PathBuf,
    pub tcp_exec_file: PathBuf,
    pub report_dir: PathBuf,
    pub class_path_candidates: Vec<PathBuf>,
    pub source_root: PathBuf,
    pub jacoco_cli_jar: PathBuf,
    pub java_bin: PathBuf,
    pub agent: AgentEndpoint,
    pub report_title: String,
}

impl From<Args> for AppConfig {
    fn from(value: Args) -> Self {
        Self {
            address: value.address,
            exec_file: value.exec_file,
            tcp_exec_file: value.tcp_exec_file,
            report_dir: value.report_dir,
            class_path_candidates: value.class_files,
            source_root: value.source_files,
            jacoco_cli_jar: value.jacoco_cli,
            java_bin: value.java,
            agent: AgentEndpoint {
                host: value.agent_host,
                port: value.agent_port,
            },
            report_title: value.report_title,
        }
    }
}

impl AppConfig {
    /// The first candidate is active until auto-setup picks another.
    pub fn coverage_config(&self) -> CoverageConfig {
        let initial = self
            .class_path_candidates
            .first()
            .cloned()
            .unwrap_or_default();

        CoverageConfig {
            exec_file: self.exec_file.clone(),
            tcp_exec_file: self.tcp_exec_file.clone(),
            report_dir: self.report_dir.clone(),
            class_path_candidates: self.class_path_candidates.clone(),
            source_root: Some(self.source_root.clone()),
            java_bin: self.java_bin.clone(),
            jacoco_cli_jar: self.jacoco_cli_jar.clone(),
            agent: self.agent.clone(),
            report_title: self.report_title.clone(),
            active_class_path: ActiveClassPath::new(initial),
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Wires every route onto a fresh server.
pub fn build_server(service: CoverageService) -> HttpServer {
    let server = HttpServer::new();
    CoverageHandler::register_all(&service, &server);
    ReportFilesHandler::new(service.config().report_dir.clone()).register(&server);
    HealthHandler::new(service).register(&server);
    index::register(&server);
    server
}

pub async fn run(config: AppConfig) -> Result<()> {
    let tool: Arc<dyn ToolRunner> = Arc::new(JacocoCli::new(
        config.java_bin.clone(),
        config.jacoco_cli_jar.clone(),
    ));
    run_with_tool(config, tool, shutdown_signal()).await
}

pub async fn run_with_tool<F>(config: AppConfig, tool: Arc<dyn ToolRunner>, signal: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    ensure_report_root(&config.report_dir).await?;

    let service = CoverageService::new(Arc::new(config.coverage_config()), tool);
    let server = build_server(service);

    info!(
        address = %config.address,
        report_dir = %config.report_dir.display(),
        exec_file = %config.exec_file.display(),
        tcp_exec_file = %config.tcp_exec_file.display(),
        agent = %format!("{}:{}", config.agent.host, config.agent.port),
        class_path_candidates = ?config.class_path_candidates,
        "Starting coverage gateway",
    );

    if let Err(err) = server.serve_with_shutdown(config.address, signal).await {
        return Err(handle_serve_error(err));
    }

    info!("Coverage gateway shutdown complete");
    Ok(())
}

pub async fn ensure_report_root(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                anyhow::bail!("report directory is not a directory: {}", path.display());
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(path)
                .await
                .with_context(|| format!("failed to create report directory at {}", path.display()))?;
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to inspect report directory at {}", path.display()));
        }
    }

    Ok(())
}

fn handle_serve_error(err: ServerError) -> anyhow::Error {
    error!(error = %err, "Coverage gateway terminated with error");
    err.into()
}

#[cfg(unix)]
pub async fn shutdown_signal() {
    shutdown_signal_with(
        || tokio::signal::ctrl_c(),
        || tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()),
    )
    .await;
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    shutdown_signal_with(|| tokio::signal::ctrl_c()).await;
}

async fn ctrl_c_listener<CtrlCFn, CtrlCFut>(ctrl_c_fn: CtrlCFn)
where
    CtrlCFn: Fn() -> CtrlCFut,
    CtrlCFut: Future<Output = std::io::Result<()>>,
{
    match ctrl_c_fn().await {
        Ok(()) => info!("Received SIGINT (Ctrl+C), shutting down"),
        Err(err) => error!(error = %err, "Failed to listen for Ctrl+C"),
    }
}

#[cfg(unix)]
async fn terminate_listener<TerminateFn>(terminate_fn: TerminateFn)
where
    TerminateFn: Fn() -> Result<tokio::signal::unix::Signal, std::io::Error>,
{
    match terminate_fn() {
        Ok(mut stream) => {
            stream.recv().await;
            info!("Received SIGTERM, shutting down");
        }
        Err(err) => {
            error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal_with<CtrlCFn, CtrlCFut, TerminateFn>(
    ctrl_c_fn: CtrlCFn,
    terminate_fn: TerminateFn,
) where
    CtrlCFn: Fn() -> CtrlCFut,
    CtrlCFut: Future<Output = std::io::Result<()>>,
    TerminateFn: Fn() -> Result<tokio::signal::unix::Signal, std::io::Error>,
{
    tokio::select! {
        _ = ctrl_c_listener(ctrl_c_fn) => {},
        _ = terminate_listener(terminate_fn) => {},
    };
}

#[cfg(not(unix))]
async fn shutdown_signal_with<CtrlCFn, CtrlCFut>(ctrl_c_fn: CtrlCFn)
where
    CtrlCFn: Fn() -> CtrlCFut,
    CtrlCFut: Future<Output = std::io::Result<()>>,
{
    ctrl_c_listener(ctrl_c_fn).await;
}
