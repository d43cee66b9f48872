//! Business logic services layer

pub mod background;
pub mod cleanup_service;
pub mod command;
pub mod filter_service;
pub mod ingest_service;
pub mod report_service;
pub mod status_tracker;
pub mod system_service;

pub use background::{BackgroundTask, PoolScheduler, TaskScheduler};
pub use cleanup_service::CleanupService;
pub use command::{CommandReply, CommandService, OperatorCommand};
pub use filter_service::FilterService;
pub use ingest_service::{IngestOutcome, IngestionPipeline, PipelineSettings};
pub use report_service::{ReportPlan, ReportService};
pub use status_tracker::{AnalysisGuard, AnalysisStatusStore, LruStatusStore};
pub use system_service::SystemService;
