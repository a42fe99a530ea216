// ==========================================
// PIM 商品导入系统 - 错误处理中间件（重试 + 降级）
// ==========================================
// 重试条件（二者满足其一）:
// - 错误类别在 retryable_exceptions 白名单内
// - 底层消息含瞬时故障关键字（timeout/connection/deadlock/lock wait/temporary）
// 永不重试:
// - 唯一约束冲突: 原样上抛,由 ConflictResolver 修正数据后重试
// - 协作式超时: 原样上抛,由外层 TimingMiddleware 转为失败结果
// 每次重试前恢复首次进入时的上下文快照,等待 n × retry_backoff_ms
// 配置了 UnitOfWork 时每次尝试包在嵌套保存点内,重试前回滚该次尝试的写入
// ==========================================

use crate::config::ErrorHandlingConfig;
use crate::pipeline::context::ActionContext;
use crate::pipeline::error::ActionError;
use crate::pipeline::middleware::{ImportMiddleware, Next};
use crate::pipeline::result::ActionResult;
use crate::repository::UnitOfWork;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

/// 瞬时故障关键字（小写匹配）
pub const TRANSIENT_KEYWORDS: [&str; 5] = ["timeout", "connection", "deadlock", "lock wait", "temporary"];

#[derive(Clone, Default)]
pub struct ErrorHandlingMiddleware {
    config: ErrorHandlingConfig,
    unit_of_work: Option<Arc<dyn UnitOfWork>>,
}

impl fmt::Debug for ErrorHandlingMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlingMiddleware")
            .field("config", &self.config)
            .field("unit_of_work", &self.unit_of_work.is_some())
            .finish()
    }
}

impl ErrorHandlingMiddleware {
    pub fn new(config: ErrorHandlingConfig) -> Self {
        Self {
            config,
            unit_of_work: None,
        }
    }

    /// 重试前回滚失败尝试的数据库写入
    pub fn with_unit_of_work(mut self, unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// 嵌套保存点内执行一次尝试;需要重试时回滚,否则保留写入交给外层边界
    fn run_attempt(
        &self,
        ctx: &mut ActionContext,
        next: Next<'_>,
        may_retry: bool,
    ) -> Result<ActionResult, ActionError> {
        let Some(uow) = &self.unit_of_work else {
            return next.run(ctx);
        };

        uow.begin_attempt()?;
        let outcome = next.run(ctx);
        let discard = match &outcome {
            Err(err) => may_retry && !err.is_conflict() && self.is_retryable(err),
            Ok(_) => false,
        };
        if discard {
            uow.rollback_attempt()?;
        } else {
            uow.release_attempt()?;
        }
        outcome
    }

    pub fn is_retryable(&self, err: &ActionError) -> bool {
        match err {
            ActionError::Constraint(_) | ActionError::Timeout { .. } => false,
            _ => {
                if self.config.retryable_exceptions.contains(&err.class()) {
                    return true;
                }
                let detail = err.detail().to_lowercase();
                TRANSIENT_KEYWORDS.iter().any(|k| detail.contains(k))
            }
        }
    }

    fn max_attempts(&self) -> u32 {
        if self.config.retry_on_failure {
            self.config.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    fn give_up(&self, ctx: &ActionContext, err: &ActionError, attempt: u32, retryable: bool) -> ActionResult {
        let retries = attempt.saturating_sub(1);
        let message = if retries > 0 {
            format!("{} (重试 {} 次后放弃)", err, retries)
        } else {
            err.to_string()
        };

        let mut data = Map::new();
        data.insert("retry_attempts".to_string(), json!(retries));
        data.insert("exception_type".to_string(), json!(err.class().as_str()));
        data.insert("retryable".to_string(), json!(retryable));
        if self.config.graceful_degradation {
            data.insert("partial_data".to_string(), Value::Object(ctx.data().clone()));
        }

        ActionResult::failed(message, data)
    }
}

impl ImportMiddleware for ErrorHandlingMiddleware {
    fn name(&self) -> &str {
        "error_handling"
    }

    fn handle(&self, ctx: &mut ActionContext, next: Next<'_>) -> Result<ActionResult, ActionError> {
        let snapshot = ctx.clone();
        let max_attempts = self.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let err = match self.run_attempt(ctx, next, attempt < max_attempts) {
                Ok(result) if attempt > 1 => {
                    return Ok(result.with_data_entry("retry_attempts", attempt - 1));
                }
                Ok(result) => return Ok(result),
                Err(err) if err.is_conflict() => return Err(err),
                Err(err @ ActionError::Timeout { .. }) => return Err(err),
                Err(err) => err,
            };

            let retryable = self.is_retryable(&err);
            if retryable && attempt < max_attempts {
                warn!(
                    row_number = ctx.row_number(),
                    attempt,
                    max_attempts,
                    error = %err,
                    "瞬时故障,准备重试"
                );
                let backoff = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
                if backoff > 0 {
                    thread::sleep(Duration::from_millis(backoff));
                }
                *ctx = snapshot.clone();
                continue;
            }

            error!(
                row_number = ctx.row_number(),
                attempt,
                retryable,
                exception_type = err.class().as_str(),
                error = %err,
                "放弃执行,转换为失败结果"
            );
            return Ok(self.give_up(ctx, &err, attempt, retryable));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorClass;

    fn middleware(max_retries: u32) -> ErrorHandlingMiddleware {
        ErrorHandlingMiddleware::new(ErrorHandlingConfig {
            max_retries,
            retry_backoff_ms: 0,
            ..ErrorHandlingConfig::default()
        })
    }

    #[test]
    fn test_retryable_by_class() {
        let m = middleware(2);
        assert!(m.is_retryable(&ActionError::Database("syntax".to_string())));
        assert!(m.is_retryable(&ActionError::Connection("refused".to_string())));
        assert!(!m.is_retryable(&ActionError::Unexpected("bad state".to_string())));
    }

    #[test]
    fn test_retryable_by_keyword() {
        let m = ErrorHandlingMiddleware::new(ErrorHandlingConfig {
            retryable_exceptions: vec![],
            ..ErrorHandlingConfig::default()
        });
        assert!(m.is_retryable(&ActionError::Unexpected("Deadlock found when trying to get lock".to_string())));
        assert!(m.is_retryable(&ActionError::Unexpected("Temporary failure in name resolution".to_string())));
        assert!(!m.is_retryable(&ActionError::Database("no such column".to_string())));
    }

    #[test]
    fn test_never_retries_conflicts_or_timeouts() {
        let m = ErrorHandlingMiddleware::new(ErrorHandlingConfig {
            retryable_exceptions: vec![ErrorClass::Constraint, ErrorClass::Timeout],
            ..ErrorHandlingConfig::default()
        });
        let conflict = ActionError::Constraint(crate::conflict::ConstraintViolation::new(
            "product_variants",
            vec!["sku".to_string()],
        ));
        assert!(!m.is_retryable(&conflict));
        assert!(!m.is_retryable(&ActionError::Timeout { elapsed_ms: 10, limit_ms: 5 }));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(middleware(2).max_attempts(), 3);
        let disabled = ErrorHandlingMiddleware::new(ErrorHandlingConfig {
            retry_on_failure: false,
            ..ErrorHandlingConfig::default()
        });
        assert_eq!(disabled.max_attempts(), 1);
    }
}
