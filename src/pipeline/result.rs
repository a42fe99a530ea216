// ==========================================
// PIM 商品导入系统 - 动作执行结果
// ==========================================
// 红线: failure 必带 error;context_updates 只在 success 时被合并
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    success: bool,
    error: Option<String>,
    data: Map<String, Value>,            // 附加观测数据（耗时/统计）
    context_updates: Map<String, Value>, // 由管道合并回 ActionContext
}

impl ActionResult {
    pub fn success(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            data,
            context_updates: Map::new(),
        }
    }

    /// 无附加数据的成功结果
    pub fn ok() -> Self {
        Self::success(Map::new())
    }

    pub fn failed(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            data,
            context_updates: Map::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// 合并附加数据（后写覆盖）
    pub fn with_data(mut self, extra: Map<String, Value>) -> Self {
        self.merge_data(extra);
        self
    }

    pub fn merge_data(&mut self, extra: Map<String, Value>) {
        for (key, value) in extra {
            self.data.insert(key, value);
        }
    }

    pub fn with_data_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_context_updates(mut self, updates: Map<String, Value>) -> Self {
        for (key, value) in updates {
            self.context_updates.insert(key, value);
        }
        self
    }

    pub fn with_context_update(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_updates.insert(key.into(), value.into());
        self
    }

    pub fn has_context_updates(&self) -> bool {
        !self.context_updates.is_empty()
    }

    pub fn context_updates(&self) -> &Map<String, Value> {
        &self.context_updates
    }

    pub fn take_context_updates(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.context_updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_carries_error() {
        let result = ActionResult::failed("缺少必填字段: sku", Map::new());
        assert!(result.is_failure());
        assert_eq!(result.error(), Some("缺少必填字段: sku"));
    }

    #[test]
    fn test_with_data_merges() {
        let mut base = Map::new();
        base.insert("a".to_string(), json!(1));
        let mut extra = Map::new();
        extra.insert("a".to_string(), json!(2));
        extra.insert("b".to_string(), json!(3));

        let result = ActionResult::success(base).with_data(extra);
        assert_eq!(result.data().get("a"), Some(&json!(2)));
        assert_eq!(result.data().get("b"), Some(&json!(3)));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_context_updates() {
        let mut result = ActionResult::ok().with_context_update("product_id", 7);
        assert!(result.has_context_updates());

        let updates = result.take_context_updates();
        assert_eq!(updates.get("product_id"), Some(&json!(7)));
        assert!(!result.has_context_updates());
    }
}
