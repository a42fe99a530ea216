// ==========================================
// PIM 商品导入系统 - 日志中间件
// ==========================================
// 红线: 只记录字段名,不记录行数据的值
// 异常 → 记录后转换为失败结果;唯一约束冲突原样上抛给冲突处理器
// ==========================================

use crate::config::LoggingConfig;
use crate::pipeline::context::ActionContext;
use crate::pipeline::error::ActionError;
use crate::pipeline::middleware::{ImportMiddleware, Next};
use crate::pipeline::result::ActionResult;
use serde_json::{json, Map};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    config: LoggingConfig,
}

impl LoggingMiddleware {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn context_keys(&self, ctx: &ActionContext) -> String {
        if !self.config.log_context {
            return String::new();
        }
        ctx.data().keys().map(|k| k.as_str()).collect::<Vec<_>>().join(",")
    }
}

impl ImportMiddleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn handle(&self, ctx: &mut ActionContext, next: Next<'_>) -> Result<ActionResult, ActionError> {
        let start = Instant::now();
        let outcome = next.run(ctx);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                if result.is_success() {
                    if self.config.log_successful {
                        info!(
                            row_number = ctx.row_number(),
                            elapsed_ms,
                            context_keys = %self.context_keys(ctx),
                            "导入行处理成功"
                        );
                    }
                } else if self.config.log_failed {
                    warn!(
                        row_number = ctx.row_number(),
                        elapsed_ms,
                        error = result.error().unwrap_or_default(),
                        context_keys = %self.context_keys(ctx),
                        "导入行处理失败"
                    );
                }
                Ok(result)
            }
            Err(err) if err.is_conflict() => {
                debug!(
                    row_number = ctx.row_number(),
                    elapsed_ms,
                    error = %err,
                    "唯一约束冲突,交由冲突处理器"
                );
                Err(err)
            }
            Err(err) => {
                error!(
                    row_number = ctx.row_number(),
                    elapsed_ms,
                    exception_type = err.class().as_str(),
                    error = %err,
                    error_debug = ?err,
                    context_keys = %self.context_keys(ctx),
                    "导入行处理异常"
                );

                let mut data = Map::new();
                data.insert("exception_type".to_string(), json!(err.class().as_str()));
                data.insert("execution_time_ms".to_string(), json!(elapsed_ms));
                Ok(ActionResult::failed(err.to_string(), data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConstraintViolation;
    use crate::pipeline::{FnAction, Pipeline};

    #[test]
    fn test_exception_converted_to_failed_result() {
        let pipeline = Pipeline::builder("test")
            .middleware(LoggingMiddleware::default())
            .action(FnAction::new("boom", |_ctx| {
                Err(ActionError::Unexpected("bad state".to_string()))
            }))
            .build();

        let mut ctx = ActionContext::new(1, Map::new());
        let result = pipeline.execute(&mut ctx).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.data().get("exception_type"), Some(&json!("unexpected")));
    }

    #[test]
    fn test_conflict_passes_through() {
        let pipeline = Pipeline::builder("test")
            .middleware(LoggingMiddleware::default())
            .action(FnAction::new("insert", |_ctx| {
                Err(ActionError::Constraint(ConstraintViolation::new(
                    "product_variants",
                    vec!["sku".to_string()],
                )))
            }))
            .build();

        let mut ctx = ActionContext::new(1, Map::new());
        let err = pipeline.execute(&mut ctx).unwrap_err();
        assert!(err.is_conflict());
    }
}
