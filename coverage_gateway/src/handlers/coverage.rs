use std::collections::BTreeMap;

use async_trait::async_trait;
use hyper::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    coverage::{
        ClassDirProbe, CoverageError, CoverageResult, CoverageService, FetchedDump,
        GeneratedReport,
    },
    server::{
        handler::{RouteHandler, RouteRequest, RouteResult},
        types::{ApiError, Reply},
        HttpServer,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageRoute {
    Dump,
    DumpTcp,
    Report,
    ReportTcp,
    CheckClasses,
    AutoSetup,
}

impl CoverageRoute {
    pub const ALL: [CoverageRoute; 6] = [
        CoverageRoute::Dump,
        CoverageRoute::DumpTcp,
        CoverageRoute::Report,
        CoverageRoute::ReportTcp,
        CoverageRoute::CheckClasses,
        CoverageRoute::AutoSetup,
    ];

    pub fn path(self) -> &'static str {
        match self {
            CoverageRoute::Dump => "/coverage/dump",
            CoverageRoute::DumpTcp => "/coverage/dump-tcp",
            CoverageRoute::Report => "/coverage/report",
            CoverageRoute::ReportTcp => "/coverage/report-tcp",
            CoverageRoute::CheckClasses => "/coverage/check-classes",
            CoverageRoute::AutoSetup => "/coverage/auto-setup",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CoverageRoute::Dump => "Show status of the file and TCP execution records",
            CoverageRoute::DumpTcp => "Pull execution data from the TCP agent",
            CoverageRoute::Report => "Generate the HTML report from the best available record",
            CoverageRoute::ReportTcp => "Pull from the TCP agent, then generate the HTML report",
            CoverageRoute::CheckClasses => "Inspect class directory candidates",
            CoverageRoute::AutoSetup => "Select the first class directory containing class files",
        }
    }
}

#[derive(Clone)]
pub struct CoverageHandler {
    service: CoverageService,
    route: CoverageRoute,
}

#[derive(Debug, Serialize)]
struct RecordEntry {
    path: String,
    exists: bool,
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DumpStatusResponse {
    status: &'static str,
    files: BTreeMap<String, RecordEntry>,
}

#[derive(Debug, Serialize)]
struct DumpTcpResponse {
    status: &'static str,
    #[serde(flatten)]
    dump: FetchedDump,
}

#[derive(Debug, Serialize)]
struct ReportResponse {
    status: &'static str,
    #[serde(flatten)]
    report: GeneratedReport,
}

#[derive(Debug, Serialize)]
struct CheckClassesResponse {
    status: &'static str,
    class_paths: Vec<ClassDirProbe>,
    current_config: CurrentConfig,
}

#[derive(Debug, Serialize)]
struct CurrentConfig {
    class_files: String,
    exec_file: String,
    tcp_exec_file: String,
    report_dir: String,
}

impl CoverageHandler {
    pub fn new(service: CoverageService, route: CoverageRoute) -> Self {
        Self { service, route }
    }

    /// Registers one handler per coverage route on `server`.
    pub fn register_all(service: &CoverageService, server: &HttpServer) {
        for route in CoverageRoute::ALL {
            server
                .handler_registry()
                .register_handler(route.path(), Self::new(service.clone(), route));
        }
    }

    async fn handle(&self) -> RouteResult {
        match self.route {
            CoverageRoute::Dump => Reply::serialized(&self.dump_status()),
            CoverageRoute::DumpTcp => {
                let dump = self.service.fetch_remote().await.map_err(map_coverage_error)?;
                Reply::serialized(&DumpTcpResponse {
                    status: "success",
                    dump,
                })
            }
            CoverageRoute::Report => {
                let report = self
                    .service
                    .generate_report()
                    .await
                    .map_err(map_coverage_error)?;
                Reply::serialized(&ReportResponse {
                    status: "success",
                    report,
                })
            }
            CoverageRoute::ReportTcp => {
                let report = self
                    .service
                    .fetch_and_generate_report()
                    .await
                    .map_err(map_coverage_error)?;
                Reply::serialized(&ReportResponse {
                    status: "success",
                    report,
                })
            }
            CoverageRoute::CheckClasses => {
                let response = self.check_classes().await.map_err(map_coverage_error)?;
                Reply::serialized(&response)
            }
            CoverageRoute::AutoSetup => self.auto_setup().await,
        }
    }

    /// Entries are keyed by file name, or by full path when two records
    /// share a file name.
    fn dump_status(&self) -> DumpStatusResponse {
        let probes = self.service.record_status();
        let names: Vec<String> = probes
            .iter()
            .map(|probe| {
                probe
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| probe.path.display().to_string())
            })
            .collect();

        let files = probes
            .into_iter()
            .zip(names.iter())
            .map(|(probe, name)| {
                let key = if names.iter().filter(|other| *other == name).count() > 1 {
                    probe.path.display().to_string()
                } else {
                    name.clone()
                };
                (
                    key,
                    RecordEntry {
                        path: probe.path.display().to_string(),
                        exists: probe.exists,
                        size: probe.size,
                    },
                )
            })
            .collect();

        DumpStatusResponse {
            status: "success",
            files,
        }
    }

    async fn check_classes(&self) -> CoverageResult<CheckClassesResponse> {
        let class_paths = self.service.check_classes().await?;
        let config = self.service.config();
        Ok(CheckClassesResponse {
            status: "success",
            class_paths,
            current_config: CurrentConfig {
                class_files: self.service.active_class_path().display().to_string(),
                exec_file: config.exec_file.display().to_string(),
                tcp_exec_file: config.tcp_exec_file.display().to_string(),
                report_dir: config.report_dir.display().to_string(),
            },
        })
    }

    async fn auto_setup(&self) -> RouteResult {
        match self.service.auto_setup().await {
            Ok(path) => Ok(Reply::ok(json!({
                "status": "success",
                "message": format!("class path set to {}", path.display()),
                "path": path.display().to_string(),
            }))),
            Err(CoverageError::ClassPathNotFound { checked }) => Err(ApiError::new(
                StatusCode::NOT_FOUND,
                json!({
                    "status": "error",
                    "message": "no class files found in any candidate path",
                    "checked_paths": checked
                        .iter()
                        .map(|path| Value::String(path.display().to_string()))
                        .collect::<Vec<_>>(),
                }),
            )),
            Err(err) => Err(map_coverage_error(err)),
        }
    }
}

#[async_trait]
impl RouteHandler for CoverageHandler {
    async fn call(&self, _request: RouteRequest) -> RouteResult {
        self.handle().await
    }
}

pub fn map_coverage_error(err: CoverageError) -> ApiError {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    ApiError::message(status, err.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::coverage::test_support::{config_with_root, ScriptedTool};
    use std::{fs, path::PathBuf, sync::Arc};
    use tempfile::tempdir;

    fn handler(root: &std::path::Path, tool: ScriptedTool, route: CoverageRoute) -> CoverageHandler {
        let service = CoverageService::new(Arc::new(config_with_root(root)), Arc::new(tool));
        CoverageHandler::new(service, route)
    }

    fn request(route: CoverageRoute) -> RouteRequest {
        RouteRequest {
            path: route.path().to_string(),
            tail: None,
        }
    }

    fn json_body(reply: Reply) -> Value {
        match reply {
            Reply::Json { body, .. } => body,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn map_coverage_error__variants__then_expected_statuses() {
        let not_found = map_coverage_error(CoverageError::NoSourceAvailable { checked: vec![] });
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body["status"], "error");

        let tool = map_coverage_error(CoverageError::tool("report", "boom"));
        assert_eq!(tool.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(tool.body["error"], "jacoco report failed: boom");

        let missing = map_coverage_error(CoverageError::NoOutputProduced(PathBuf::from("/x")));
        assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);

        let report = map_coverage_error(CoverageError::ReportNotProduced(PathBuf::from("/r")));
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn dump_route__no_records__then_both_listed_as_missing() {
        let root = tempdir().expect("tempdir");
        let handler = handler(root.path(), ScriptedTool::default(), CoverageRoute::Dump);

        let body = json_body(handler.call(request(CoverageRoute::Dump)).await.expect("reply"));

        assert_eq!(body["status"], "success");
        assert_eq!(body["files"]["jacoco.exec"]["exists"], false);
        assert_eq!(body["files"]["jacoco.exec"]["size"], Value::Null);
        assert_eq!(body["files"]["jacoco-tcp.exec"]["exists"], false);
    }

    #[tokio::test]
    async fn dump_route__records_share_file_name__then_keyed_by_full_path() {
        let root = tempdir().expect("tempdir");
        let mut config = config_with_root(root.path());
        config.exec_file = root.path().join("file-mode/jacoco.exec");
        config.tcp_exec_file = root.path().join("tcp-mode/jacoco.exec");
        fs::create_dir_all(root.path().join("tcp-mode")).expect("mkdir");
        fs::write(&config.tcp_exec_file, b"tcp").expect("write tcp record");
        let service = CoverageService::new(Arc::new(config), Arc::new(ScriptedTool::default()));
        let handler = CoverageHandler::new(service, CoverageRoute::Dump);

        let body = json_body(handler.call(request(CoverageRoute::Dump)).await.expect("reply"));

        let files = body["files"].as_object().expect("files object");
        assert_eq!(files.len(), 2);
        let file_key = root.path().join("file-mode/jacoco.exec").display().to_string();
        let tcp_key = root.path().join("tcp-mode/jacoco.exec").display().to_string();
        assert_eq!(files[&file_key]["exists"], false);
        assert_eq!(files[&tcp_key]["exists"], true);
        assert_eq!(files[&tcp_key]["size"], 3);
    }

    #[tokio::test]
    async fn dump_tcp_route__tool_fails__then_500_error_body() {
        let root = tempdir().expect("tempdir");
        let handler = handler(
            root.path(),
            ScriptedTool::default().failing("dump", "Connection refused"),
            CoverageRoute::DumpTcp,
        );

        let err = handler
            .call(request(CoverageRoute::DumpTcp))
            .await
            .expect_err("dump fails");

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body["error"], "jacoco dump failed: Connection refused");
    }

    #[tokio::test]
    async fn dump_tcp_route__dump_written__then_file_and_size() {
        let root = tempdir().expect("tempdir");
        let handler = handler(
            root.path(),
            ScriptedTool::default().writing_dump(10),
            CoverageRoute::DumpTcp,
        );

        let body = json_body(
            handler
                .call(request(CoverageRoute::DumpTcp))
                .await
                .expect("reply"),
        );

        assert_eq!(body["status"], "success");
        assert_eq!(body["size"], 10);
        assert_eq!(
            body["file"],
            root.path().join("jacoco-tcp.exec").display().to_string()
        );
    }

    #[tokio::test]
    async fn report_route__file_record__then_success_payload() {
        let root = tempdir().expect("tempdir");
        fs::write(root.path().join("jacoco.exec"), b"exec").expect("write exec");
        let handler = handler(
            root.path(),
            ScriptedTool::default().writing_report(),
            CoverageRoute::Report,
        );

        let body = json_body(
            handler
                .call(request(CoverageRoute::Report))
                .await
                .expect("reply"),
        );

        assert_eq!(body["status"], "success");
        assert_eq!(body["url"], "/coverage/report-html/index.html");
        assert_eq!(body["file_type"], "File");
        assert_eq!(
            body["exec_file"],
            root.path().join("jacoco.exec").display().to_string()
        );
    }

    #[tokio::test]
    async fn auto_setup_route__nothing_found__then_404_with_checked_paths() {
        let root = tempdir().expect("tempdir");
        let handler = handler(root.path(), ScriptedTool::default(), CoverageRoute::AutoSetup);

        let err = handler
            .call(request(CoverageRoute::AutoSetup))
            .await
            .expect_err("no classes");

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body["status"], "error");
        assert_eq!(
            err.body["checked_paths"],
            json!([
                root.path().join("mounted").display().to_string(),
                root.path().join("build").display().to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn check_classes_route__then_reports_candidates_and_current_config() {
        let root = tempdir().expect("tempdir");
        let mounted = root.path().join("mounted");
        fs::create_dir_all(mounted.join("pkg")).expect("mkdir");
        fs::write(mounted.join("pkg/A.class"), b"class").expect("write class");
        let handler = handler(root.path(), ScriptedTool::default(), CoverageRoute::CheckClasses);

        let body = json_body(
            handler
                .call(request(CoverageRoute::CheckClasses))
                .await
                .expect("reply"),
        );

        assert_eq!(body["class_paths"][0]["class_file_count"], 1);
        assert_eq!(body["class_paths"][1]["exists"], false);
        assert_eq!(
            body["current_config"]["class_files"],
            mounted.display().to_string()
        );
    }

    #[test]
    fn register_all__then_every_route_registered() {
        let root = tempdir().expect("tempdir");
        let service = CoverageService::new(
            Arc::new(config_with_root(root.path())),
            Arc::new(ScriptedTool::default()),
        );
        let server = HttpServer::new();

        CoverageHandler::register_all(&service, &server);

        for route in CoverageRoute::ALL {
            assert!(server.handler_registry().contains(route.path()));
        }
    }
}
