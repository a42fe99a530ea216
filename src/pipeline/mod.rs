// ==========================================
// PIM 商品导入系统 - 动作管道层
// ==========================================
// 职责: 单行导入的责任链执行引擎
// 组成: ActionContext / ActionResult / Action / 中间件 / Pipeline
// ==========================================

pub mod action;
pub mod builder;
pub mod context;
pub mod error;
pub mod middleware;
pub mod result;

// 重导出核心类型
pub use action::{Action, ActionEntry, FnAction};
pub use builder::{Pipeline, PipelineBuilder};
pub use context::{ActionContext, TimeLimit};
pub use error::{ActionError, ErrorClass};
pub use middleware::{
    ErrorHandlingMiddleware, ImportMiddleware, LoggingMiddleware, Next, TimingMiddleware,
};
pub use result::ActionResult;
