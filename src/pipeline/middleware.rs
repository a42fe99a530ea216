// ==========================================
// PIM 商品导入系统 - 管道中间件
// ==========================================
// 责任链: 按登记顺序由外向内包裹,Next 调用剩余链路
// 实现者: LoggingMiddleware / TimingMiddleware / ErrorHandlingMiddleware
// ==========================================

pub mod error_handling;
pub mod logging;
pub mod timing;

use crate::pipeline::action::ActionEntry;
use crate::pipeline::builder::run_actions;
use crate::pipeline::context::ActionContext;
use crate::pipeline::error::ActionError;
use crate::pipeline::result::ActionResult;

pub use error_handling::ErrorHandlingMiddleware;
pub use logging::LoggingMiddleware;
pub use timing::TimingMiddleware;

pub trait ImportMiddleware: Send + Sync {
    fn name(&self) -> &str;

    /// 处理一次执行;调用 `next.run(ctx)` 进入剩余链路（可多次调用以重试）
    fn handle(&self, ctx: &mut ActionContext, next: Next<'_>) -> Result<ActionResult, ActionError>;
}

// ==========================================
// Next - 基于切片下标的续延
// ==========================================
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middleware: &'a [Box<dyn ImportMiddleware>],
    actions: &'a [ActionEntry],
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        middleware: &'a [Box<dyn ImportMiddleware>],
        actions: &'a [ActionEntry],
    ) -> Self {
        Self { middleware, actions }
    }

    pub fn run(self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        match self.middleware.split_first() {
            Some((head, rest)) => head.handle(ctx, Next::new(rest, self.actions)),
            None => run_actions(self.actions, ctx),
        }
    }
}
