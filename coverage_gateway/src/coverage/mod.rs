pub mod config;
pub mod error;
pub mod fetch;
pub mod health;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod service;
pub mod tool;

pub use config::{ActiveClassPath, AgentEndpoint, CoverageConfig};
pub use error::{CoverageError, CoverageResult};
pub use fetch::FetchedDump;
pub use health::HealthStatus;
pub use probe::{ClassDirProbe, RecordProbe};
pub use report::GeneratedReport;
pub use selector::{SelectedSource, SourceKind};
pub use service::CoverageService;
pub use tool::{JacocoCli, ToolInvocation, ToolOutcome, ToolRunner};
