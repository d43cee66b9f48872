//! 被监控系统服务

use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::SystemTokenGenerator;
use crate::error::{AppError, Result};
use crate::models::system::{CreateSystemRequest, MonitoredSystem, UpdateSystemRequest};
use crate::repository::Stores;

/// 令牌冲突时的最大重试次数
const MAX_TOKEN_ATTEMPTS: usize = 5;

pub struct SystemService {
    stores: Stores,
}

impl SystemService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// 注册系统并分配令牌
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register(&self, request: CreateSystemRequest) -> Result<MonitoredSystem> {
        request.validate()?;

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = SystemTokenGenerator::generate();
            if self.stores.systems.find(&token).await?.is_some() {
                warn!(attempt, "System token collision, regenerating");
                continue;
            }

            let system = self.stores.systems.insert(&token, &request).await?;
            info!(status = system.status.as_str(), "System registered");
            return Ok(system);
        }

        Err(AppError::internal_error("could not allocate a unique system token"))
    }

    pub async fn get(&self, id: &str) -> Result<MonitoredSystem> {
        self.stores
            .systems
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("system"))
    }

    pub async fn list(&self) -> Result<Vec<MonitoredSystem>> {
        self.stores.systems.list().await
    }

    /// 部分更新
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: &str, request: UpdateSystemRequest) -> Result<MonitoredSystem> {
        request.validate()?;

        let system = self
            .stores
            .systems
            .update(id, &request)
            .await?
            .ok_or_else(|| AppError::not_found("system"))?;

        info!("System updated");
        Ok(system)
    }
}
