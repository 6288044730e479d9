use std::{path::PathBuf, sync::Arc};

use super::{
    config::CoverageConfig,
    error::CoverageResult,
    fetch::{fetch_remote, FetchedDump},
    health::{check_health, HealthStatus},
    probe::{probe_class_dirs, probe_records, ClassDirProbe, RecordProbe},
    report::{fetch_and_generate_report, generate_report, GeneratedReport},
    resolver::resolve_class_path,
    tool::ToolRunner,
};

/// Entry point for every coverage operation exposed over HTTP.
#[derive(Clone)]
pub struct CoverageService {
    config: Arc<CoverageConfig>,
    tool: Arc<dyn ToolRunner>,
}

impl CoverageService {
    pub fn new(config: Arc<CoverageConfig>, tool: Arc<dyn ToolRunner>) -> Self {
        Self { config, tool }
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// File-mode record first, TCP-mode record second.
    pub fn record_status(&self) -> Vec<RecordProbe> {
        probe_records(&[
            self.config.exec_file.clone(),
            self.config.tcp_exec_file.clone(),
        ])
    }

    pub async fn fetch_remote(&self) -> CoverageResult<FetchedDump> {
        fetch_remote(
            self.tool.as_ref(),
            &self.config.agent,
            &self.config.tcp_exec_file,
        )
        .await
    }

    pub async fn generate_report(&self) -> CoverageResult<GeneratedReport> {
        generate_report(&self.config, self.tool.as_ref()).await
    }

    pub async fn fetch_and_generate_report(&self) -> CoverageResult<GeneratedReport> {
        fetch_and_generate_report(&self.config, self.tool.as_ref()).await
    }

    /// Class trees can be large, so the walk runs on the blocking pool.
    pub async fn check_classes(&self) -> CoverageResult<Vec<ClassDirProbe>> {
        let config = Arc::clone(&self.config);
        let probes =
            tokio::task::spawn_blocking(move || probe_class_dirs(&config.class_path_candidates))
                .await?;
        Ok(probes)
    }

    pub fn active_class_path(&self) -> PathBuf {
        self.config.active_class_path.current().as_ref().clone()
    }

    pub async fn auto_setup(&self) -> CoverageResult<PathBuf> {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            resolve_class_path(&config.class_path_candidates, &config.active_class_path)
        })
        .await?
    }

    pub async fn health(&self) -> HealthStatus {
        check_health(&self.config, self.tool.as_ref()).await
    }
}
