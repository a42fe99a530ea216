// ==========================================
// PIM 商品导入系统 - Action 接口
// ==========================================
// 职责: 单一职责的行处理单元（校验/属性提取/商品解析/条码分配/落库）
// 约定: 预期内失败返回 ActionResult::failed;只有真正异常才返回 Err
// ==========================================

use crate::pipeline::context::ActionContext;
use crate::pipeline::error::ActionError;
use crate::pipeline::result::ActionResult;

pub trait Action: Send + Sync {
    /// 动作名称（日志与结果中使用）
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError>;
}

// ==========================================
// ActionEntry - 管道中的动作登记项
// ==========================================
// optional = true: 失败只记录,不中断管道
pub struct ActionEntry {
    pub(crate) action: Box<dyn Action>,
    pub(crate) optional: bool,
}

impl ActionEntry {
    pub fn new(action: Box<dyn Action>, optional: bool) -> Self {
        Self { action, optional }
    }

    pub fn name(&self) -> &str {
        self.action.name()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

// ==========================================
// FnAction - 以闭包实现的轻量动作
// ==========================================
pub struct FnAction<F>
where
    F: Fn(&mut ActionContext) -> Result<ActionResult, ActionError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(&mut ActionContext) -> Result<ActionResult, ActionError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Action for FnAction<F>
where
    F: Fn(&mut ActionContext) -> Result<ActionResult, ActionError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        (self.func)(ctx)
    }
}
