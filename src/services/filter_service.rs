//! 过滤规则服务

use regex::Regex;
use tracing::{info, instrument};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::filter::{CreateFilterRequest, FilterRule, MatchKind};
use crate::repository::Stores;

pub struct FilterService {
    stores: Stores,
}

impl FilterService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    async fn ensure_system(&self, system_id: &str) -> Result<()> {
        self.stores
            .systems
            .find(system_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("system"))
    }

    /// 新增过滤规则
    #[instrument(skip(self, request))]
    pub async fn create(&self, system_id: &str, request: CreateFilterRequest) -> Result<FilterRule> {
        request.validate()?;
        if request.pattern.trim().is_empty() {
            return Err(AppError::validation("pattern must not be blank"));
        }
        if request.match_kind == MatchKind::Regex {
            Regex::new(&request.pattern)
                .map_err(|e| AppError::Validation(format!("invalid regex pattern: {}", e)))?;
        }

        self.ensure_system(system_id).await?;

        let rule = self
            .stores
            .filters
            .insert(system_id, &request.pattern, request.match_kind)
            .await?;

        info!(filter_id = rule.id, "Filter rule created");
        Ok(rule)
    }

    pub async fn list(&self, system_id: &str) -> Result<Vec<FilterRule>> {
        self.ensure_system(system_id).await?;
        self.stores.filters.list(system_id).await
    }

    /// 删除过滤规则；规则不属于该系统时返回 NotFound
    #[instrument(skip(self))]
    pub async fn delete(&self, system_id: &str, filter_id: i64) -> Result<()> {
        if !self.stores.filters.delete(system_id, filter_id).await? {
            return Err(AppError::not_found("filter"));
        }

        info!("Filter rule deleted");
        Ok(())
    }
}
