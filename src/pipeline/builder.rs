// ==========================================
// PIM 商品导入系统 - 动作管道与构建器
// ==========================================
// 执行语义:
// - Action 按登记顺序串行执行,共享同一个 ActionContext
// - 非可选 Action 失败 → 立即返回该失败,后续 Action 不再执行
// - 可选 Action 失败 → 记录到元数据 optional_failures,继续执行
// - 成功结果的 context_updates 在下一个 Action 之前合并回上下文
// - 中间件按登记顺序由外向内包裹;顺序由调用方显式决定
// ==========================================

use crate::pipeline::action::{Action, ActionEntry};
use crate::pipeline::context::ActionContext;
use crate::pipeline::error::ActionError;
use crate::pipeline::middleware::{ImportMiddleware, Next};
use crate::pipeline::result::ActionResult;
use serde_json::{json, Map, Value};
use tracing::{debug, debug_span, warn};

// ==========================================
// Pipeline - 可执行的动作链
// ==========================================
pub struct Pipeline {
    name: String,
    actions: Vec<ActionEntry>,
    middleware: Vec<Box<dyn ImportMiddleware>>,
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// 对单行执行整条链路
    ///
    /// # 返回
    /// - Ok(ActionResult): 成功,或被转换为结果的失败
    /// - Err(ActionError): 未被任何中间件吞掉的异常（包括唯一约束冲突）
    pub fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        let span = debug_span!("pipeline", pipeline = %self.name, row_number = ctx.row_number());
        let _guard = span.enter();

        Next::new(&self.middleware, &self.actions).run(ctx)
    }
}

/// 链路最内层: 依次执行 Action
pub(crate) fn run_actions(
    actions: &[ActionEntry],
    ctx: &mut ActionContext,
) -> Result<ActionResult, ActionError> {
    let mut executed: Vec<Value> = Vec::with_capacity(actions.len());
    let mut optional_failures: Vec<Value> = Vec::new();

    for entry in actions {
        ctx.check_deadline()?;

        let mut result = entry.action.execute(ctx)?;

        if result.is_failure() {
            let error = result.error().unwrap_or_default().to_string();
            if entry.optional {
                warn!(
                    row_number = ctx.row_number(),
                    action = entry.name(),
                    error = %error,
                    "可选动作失败,继续执行"
                );
                let failure = json!({ "action": entry.name(), "error": error });
                ctx.push_metadata("optional_failures", failure.clone());
                optional_failures.push(failure);
                continue;
            }

            debug!(
                row_number = ctx.row_number(),
                action = entry.name(),
                error = %error,
                "动作失败,管道中止"
            );
            return Ok(result.with_data_entry("failed_action", entry.name()));
        }

        if result.has_context_updates() {
            ctx.merge(result.take_context_updates());
        }
        executed.push(Value::from(entry.name()));
    }

    let mut data = Map::new();
    data.insert("actions_executed".to_string(), Value::Array(executed));
    data.insert("optional_failures".to_string(), Value::Array(optional_failures));
    Ok(ActionResult::success(data))
}

// ==========================================
// PipelineBuilder
// ==========================================
pub struct PipelineBuilder {
    name: String,
    actions: Vec<ActionEntry>,
    middleware: Vec<Box<dyn ImportMiddleware>>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            middleware: Vec::new(),
        }
    }

    pub fn action<A: Action + 'static>(self, action: A) -> Self {
        self.boxed_action(Box::new(action), false)
    }

    /// 登记可选动作（失败不中断管道）
    pub fn optional_action<A: Action + 'static>(self, action: A) -> Self {
        self.boxed_action(Box::new(action), true)
    }

    pub fn boxed_action(mut self, action: Box<dyn Action>, optional: bool) -> Self {
        self.actions.push(ActionEntry::new(action, optional));
        self
    }

    /// 登记中间件;先登记者在外层
    pub fn middleware<M: ImportMiddleware + 'static>(self, middleware: M) -> Self {
        self.boxed_middleware(Box::new(middleware))
    }

    pub fn boxed_middleware(mut self, middleware: Box<dyn ImportMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            actions: self.actions,
            middleware: self.middleware,
        }
    }
}
