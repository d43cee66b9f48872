//! 运维聊天命令集成测试

use chrono::Utc;
use log_sentinel::{
    error::AppError,
    models::{
        analysis::AnalysisStatus,
        event::{NewLogEvent, Severity},
    },
    services::BackgroundTask,
};

mod common;
use common::{
    create_recording_app, create_test_config, register_system, RecordingScheduler,
    StubClassifier, StubGenerator, TestApp,
};

async fn seed_event(app: &TestApp) -> (String, i64) {
    let system = register_system(&app.state, "billing-api").await;
    let event = app
        .state
        .stores
        .events
        .insert(&NewLogEvent {
            system_id: system.id.clone(),
            message: "panic: nil map".to_string(),
            container: None,
            severity: Severity::Error,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    (system.id, event.id)
}

fn app(scheduler: std::sync::Arc<RecordingScheduler>) -> TestApp {
    create_recording_app(
        create_test_config(),
        StubClassifier::label("normal"),
        StubGenerator::text("Root cause: nil map."),
        scheduler,
    )
}

#[tokio::test]
async fn test_report_command_schedules_generation() {
    let scheduler = RecordingScheduler::new();
    let app = app(scheduler.clone());
    let (system_id, event_id) = seed_event(&app).await;

    let reply = app
        .state
        .command_service
        .execute(&format!("<@123456> report {}", event_id))
        .await
        .unwrap();

    assert_eq!(reply.event_id, Some(event_id));
    assert!(reply.reply.contains("started"));
    assert_eq!(
        scheduler.tasks(),
        vec![BackgroundTask::GenerateReport {
            system_id,
            event_id,
        }]
    );
}

#[tokio::test]
async fn test_bare_id_reuses_existing_report() {
    let scheduler = RecordingScheduler::new();
    let app = app(scheduler.clone());
    let (system_id, event_id) = seed_event(&app).await;
    let report = app
        .state
        .report_service
        .generate_report(&system_id, event_id)
        .await
        .unwrap();

    let reply = app
        .state
        .command_service
        .execute(&format!("#{}", event_id))
        .await
        .unwrap();

    assert!(reply.reply.contains(&format!("Report #{}", report.id)));
    assert!(reply.reply.contains("Root cause: nil map."));
    assert!(scheduler.tasks().is_empty());

    // force 重新生成
    app.state
        .command_service
        .execute(&format!("!report {} force", event_id))
        .await
        .unwrap();
    assert_eq!(scheduler.tasks().len(), 1);
}

#[tokio::test]
async fn test_report_command_for_missing_event() {
    let scheduler = RecordingScheduler::new();
    let app = app(scheduler.clone());

    let reply = app.state.command_service.execute("report 777").await.unwrap();

    assert_eq!(reply.reply, "Event #777 not found.");
    assert!(scheduler.tasks().is_empty());
}

#[tokio::test]
async fn test_saturated_pool_is_unavailable() {
    let scheduler = RecordingScheduler::saturated();
    let app = app(scheduler);
    let (_, event_id) = seed_event(&app).await;

    let err = app
        .state
        .command_service
        .execute(&format!("report {}", event_id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unavailable(_)));
}

#[tokio::test]
async fn test_status_and_help_commands() {
    let scheduler = RecordingScheduler::new();
    let app = app(scheduler);

    let reply = app.state.command_service.execute("status").await.unwrap();
    assert_eq!(reply.reply, "No reports in progress. 0 completed.");

    app.state.status_store.mark(5, AnalysisStatus::Analyzing);
    app.state.status_store.mark(6, AnalysisStatus::Completed);
    let reply = app.state.command_service.execute("/status").await.unwrap();
    assert_eq!(reply.reply, "Analyzing: #5. 1 completed.");

    let reply = app.state.command_service.execute("<@123456>").await.unwrap();
    assert!(reply.reply.starts_with("Commands:"));

    let reply = app.state.command_service.execute("deploy prod").await.unwrap();
    assert!(reply.reply.starts_with("Unknown command `deploy prod`."));
}
