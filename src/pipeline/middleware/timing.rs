// ==========================================
// PIM 商品导入系统 - 计时中间件
// ==========================================
// 时限为协作式: 只在 Action 之间检查,无法中断正在执行的 Action
// - 结果附加 execution_time_ms / execution_time_seconds
// - 耗时超过时限 90% → 元数据 performance_warning = true
// - 超时错误 → 失败结果,附加 timeout_occurred = true
// ==========================================

use crate::config::DEFAULT_TIMEOUT_SECONDS;
use crate::pipeline::context::{ActionContext, TimeLimit};
use crate::pipeline::error::ActionError;
use crate::pipeline::middleware::{ImportMiddleware, Next};
use crate::pipeline::result::ActionResult;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::warn;

/// 性能告警阈值（占时限比例）
pub const PERFORMANCE_WARNING_RATIO: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct TimingMiddleware {
    timeout: Duration,
}

impl TimingMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 非正数/非有限值回退到默认时限
    pub fn from_seconds(seconds: f64) -> Self {
        let seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            DEFAULT_TIMEOUT_SECONDS
        };
        Self::new(Duration::from_secs_f64(seconds))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TimingMiddleware {
    fn default() -> Self {
        Self::from_seconds(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl ImportMiddleware for TimingMiddleware {
    fn name(&self) -> &str {
        "timing"
    }

    fn handle(&self, ctx: &mut ActionContext, next: Next<'_>) -> Result<ActionResult, ActionError> {
        let start = Instant::now();
        let previous = ctx.time_limit();
        ctx.set_time_limit(Some(TimeLimit {
            started: start,
            limit: self.timeout,
        }));

        let outcome = next.run(ctx);

        ctx.set_time_limit(previous);
        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let mut timing = Map::new();
        timing.insert("execution_time_ms".to_string(), json!(elapsed_ms));
        timing.insert("execution_time_seconds".to_string(), json!(elapsed.as_secs_f64()));
        ctx.set_metadata("execution_time_ms", elapsed_ms);

        if elapsed.as_secs_f64() > self.timeout.as_secs_f64() * PERFORMANCE_WARNING_RATIO {
            warn!(
                row_number = ctx.row_number(),
                elapsed_ms,
                timeout_ms = self.timeout.as_millis() as u64,
                "执行耗时接近时限"
            );
            ctx.set_metadata("performance_warning", true);
            timing.insert("performance_warning".to_string(), Value::Bool(true));
        }

        match outcome {
            Ok(result) => Ok(result.with_data(timing)),
            Err(err @ ActionError::Timeout { .. }) => {
                warn!(row_number = ctx.row_number(), elapsed_ms, error = %err, "执行超时");
                timing.insert("timeout_occurred".to_string(), Value::Bool(true));
                Ok(ActionResult::failed(err.to_string(), timing))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FnAction, Pipeline};
    use std::thread;

    #[test]
    fn test_timing_attached_to_result() {
        let pipeline = Pipeline::builder("test")
            .middleware(TimingMiddleware::default())
            .action(FnAction::new("noop", |_ctx| Ok(ActionResult::ok())))
            .build();

        let mut ctx = ActionContext::new(1, Map::new());
        let result = pipeline.execute(&mut ctx).unwrap();

        assert!(result.is_success());
        assert!(result.data().contains_key("execution_time_ms"));
        assert!(result.data().contains_key("execution_time_seconds"));
        assert!(ctx.get_metadata("performance_warning").is_none());
        assert!(ctx.time_limit().is_none());
    }

    #[test]
    fn test_cooperative_timeout_between_actions() {
        let pipeline = Pipeline::builder("test")
            .middleware(TimingMiddleware::new(Duration::from_millis(5)))
            .action(FnAction::new("slow", |_ctx| {
                thread::sleep(Duration::from_millis(20));
                Ok(ActionResult::ok())
            }))
            .action(FnAction::new("never", |ctx| {
                ctx.set("reached", true);
                Ok(ActionResult::ok())
            }))
            .build();

        let mut ctx = ActionContext::new(1, Map::new());
        let result = pipeline.execute(&mut ctx).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.data().get("timeout_occurred"), Some(&json!(true)));
        assert_eq!(result.data().get("performance_warning"), Some(&json!(true)));
        assert!(!ctx.has("reached"));
    }
}
