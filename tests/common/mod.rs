//! 测试公共模块
//! 提供测试配置、外部能力替身与应用状态构建工具

#![allow(dead_code)]

use async_trait::async_trait;
use log_sentinel::{
    concurrency::{WorkerConfig, WorkerError, WorkerStrategy},
    config::{
        AppConfig, ClassifierConfig, DatabaseConfig, GenerationConfig, LoggingConfig,
        NotifierConfig, PipelineConfig, ReportPolicy, SecurityConfig, ServerConfig, StatusConfig,
    },
    middleware::{AppState, Capabilities},
    models::system::{CreateSystemRequest, MonitoredSystem, SystemStatus},
    ports::{
        Classifier, ClassifierError, Destination, GenerationError, NotifyError, NotifyMessage,
        Notifier, Prompt, TextGenerator,
    },
    repository::Stores,
    services::{BackgroundTask, TaskScheduler},
};
use secrecy::Secret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const MASTER_KEY: &str = "test-master-key-0123456789";

/// 创建测试配置（进程内存储，不访问外部服务）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            master_key: Secret::new(MASTER_KEY.to_string()),
            trust_proxy: false,
            allowed_ips: None,
        },
        classifier: ClassifierConfig {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            timeout_secs: 2,
        },
        generation: GenerationConfig {
            model: "test-model".to_string(),
            temperature: 0.7,
            timeout_secs: 2,
        },
        notifier: NotifierConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            bot_token: None,
            alerts_channel_id: None,
            reports_channel_id: None,
            message_limit: 2000,
            embed_limit: 4000,
            timeout_secs: 2,
        },
        pipeline: PipelineConfig {
            report_policy: ReportPolicy::Automatic,
            alert_excerpt_chars: 1800,
        },
        workers: WorkerConfig {
            max_concurrent: 4,
            queue_capacity: 64,
            strategy: WorkerStrategy::Wait,
        },
        status: StatusConfig { capacity: 1000 },
    }
}

// ==================== 分类器替身 ====================

pub enum ClassifierBehavior {
    /// 总是返回同一个标签
    Label(String),
    /// 文本包含关键字时返回对应标签，否则返回 "normal"
    Keyed(Vec<(String, String)>),
    Fail,
    /// 永不返回（用于超时）
    Hang,
}

pub struct StubClassifier {
    behavior: ClassifierBehavior,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(behavior: ClassifierBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn label(label: &str) -> Arc<Self> {
        Self::new(ClassifierBehavior::Label(label.to_string()))
    }

    pub fn keyed(pairs: &[(&str, &str)]) -> Arc<Self> {
        Self::new(ClassifierBehavior::Keyed(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, text: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ClassifierBehavior::Label(label) => Ok(label.clone()),
            ClassifierBehavior::Keyed(pairs) => Ok(pairs
                .iter()
                .find(|(keyword, _)| text.contains(keyword.as_str()))
                .map(|(_, label)| label.clone())
                .unwrap_or_else(|| "normal".to_string())),
            ClassifierBehavior::Fail => Err(ClassifierError::Transport("connection refused".to_string())),
            ClassifierBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("error".to_string())
            }
        }
    }
}

// ==================== 生成器替身 ====================

pub enum GeneratorBehavior {
    Text(String),
    Fail,
    /// 等待放行后返回文本
    Gated(Arc<Notify>, String),
}

pub struct StubGenerator {
    behavior: GeneratorBehavior,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubGenerator {
    pub fn new(behavior: GeneratorBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(GeneratorBehavior::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match &self.behavior {
            GeneratorBehavior::Text(text) => Ok(text.clone()),
            GeneratorBehavior::Fail => Err(GenerationError::Transport("upstream 500".to_string())),
            GeneratorBehavior::Gated(gate, text) => {
                gate.notified().await;
                Ok(text.clone())
            }
        }
    }
}

// ==================== 通知替身 ====================

/// 记录所有通知，可配置为发送失败
#[derive(Default)]
pub struct SpyNotifier {
    sent: Mutex<Vec<(Destination, NotifyMessage)>>,
    fail: bool,
}

impl SpyNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<(Destination, NotifyMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, destination: Destination) -> Vec<NotifyMessage> {
        self.sent()
            .into_iter()
            .filter(|(d, _)| *d == destination)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl Notifier for SpyNotifier {
    fn message_limit(&self) -> usize {
        2000
    }

    fn embed_limit(&self) -> usize {
        4000
    }

    async fn notify(&self, destination: Destination, message: &NotifyMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((destination, message.clone()));
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 403,
                body: "Missing Access".to_string(),
            });
        }
        Ok(())
    }
}

// ==================== 调度器替身 ====================

/// 只记录任务，不执行
#[derive(Default)]
pub struct RecordingScheduler {
    tasks: Mutex<Vec<BackgroundTask>>,
    reject: bool,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 模拟工作池饱和
    pub fn saturated() -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            reject: true,
        })
    }

    pub fn tasks(&self) -> Vec<BackgroundTask> {
        self.tasks.lock().unwrap().clone()
    }
}

impl TaskScheduler for RecordingScheduler {
    fn schedule(&self, task: BackgroundTask) -> Result<(), WorkerError> {
        if self.reject {
            return Err(WorkerError::QueueFull {
                task: task.name(),
                max_length: 0,
            });
        }
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

// ==================== 应用状态 ====================

pub struct TestApp {
    pub state: Arc<AppState>,
    pub classifier: Arc<StubClassifier>,
    pub generator: Arc<StubGenerator>,
    pub notifier: Arc<SpyNotifier>,
}

fn capabilities(
    classifier: &Arc<StubClassifier>,
    generator: &Arc<StubGenerator>,
    notifier: &Arc<SpyNotifier>,
) -> Capabilities {
    Capabilities {
        classifier: classifier.clone(),
        generator: generator.clone(),
        notifier: notifier.clone(),
    }
}

/// 使用真实工作池的应用状态
pub fn create_test_app(
    config: AppConfig,
    classifier: Arc<StubClassifier>,
    generator: Arc<StubGenerator>,
) -> TestApp {
    let notifier = SpyNotifier::new();
    let caps = capabilities(&classifier, &generator, &notifier);
    let state = Arc::new(AppState::new(config, None, Stores::in_memory(), caps));

    TestApp {
        state,
        classifier,
        generator,
        notifier,
    }
}

/// 后台任务只记录不执行的应用状态
pub fn create_recording_app(
    config: AppConfig,
    classifier: Arc<StubClassifier>,
    generator: Arc<StubGenerator>,
    scheduler: Arc<RecordingScheduler>,
) -> TestApp {
    let notifier = SpyNotifier::new();
    let caps = capabilities(&classifier, &generator, &notifier);
    let state = Arc::new(AppState::with_scheduler(
        config,
        None,
        Stores::in_memory(),
        caps,
        scheduler,
    ));

    TestApp {
        state,
        classifier,
        generator,
        notifier,
    }
}

pub fn system_request(name: &str) -> CreateSystemRequest {
    CreateSystemRequest {
        name: name.to_string(),
        client_name: Some("Acme Corp".to_string()),
        client_email: "ops@acme.test".to_string(),
        client_phone: None,
        maintenance_email: "maint@acme.test".to_string(),
        status: SystemStatus::Production,
        technical_info: Some("Ubuntu 22.04, Postgres 15, Rust backend".to_string()),
    }
}

/// 注册一个被监控系统
pub async fn register_system(state: &AppState, name: &str) -> MonitoredSystem {
    state
        .system_service
        .register(system_request(name))
        .await
        .expect("Failed to register test system")
}

/// 轮询等待条件成立（后台任务异步完成）
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}
