// ==========================================
// PIM 商品导入系统 - 行上下文
// ==========================================
// 生命周期: 每行导入前创建 → 各 Action 依次修改 → 行结束后丢弃
//           （冲突重试时以修正后的数据重新创建）
// ==========================================

use crate::pipeline::error::ActionError;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// 协作式时限（由 TimingMiddleware 设置,Action/管道在步骤之间检查）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLimit {
    pub started: Instant,
    pub limit: Duration,
}

impl TimeLimit {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.started.elapsed() > self.limit
    }
}

// ==========================================
// ActionContext - 单行导入的可变状态
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ActionContext {
    row_number: usize,          // 行号（从 1 开始）
    data: Map<String, Value>,   // 行数据（有序,跨 Action 累积）
    metadata: Map<String, Value>, // 旁路信息（耗时/告警）,不属于行数据
    time_limit: Option<TimeLimit>,
}

impl ActionContext {
    pub fn new(row_number: usize, data: Map<String, Value>) -> Self {
        Self {
            row_number: row_number.max(1),
            data,
            metadata: Map::new(),
            time_limit: None,
        }
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    // ===== 行数据 =====

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// 取值,缺失或为 null 时返回默认值
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        match self.data.get(key) {
            Some(Value::Null) | None => default,
            Some(v) => v.clone(),
        }
    }

    /// 取非空字符串值（空白视为缺失）
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn has(&self, key: &str) -> bool {
        !matches!(self.data.get(key), None | Some(Value::Null))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// 合并 context_updates（后写覆盖）
    pub fn merge(&mut self, updates: Map<String, Value>) {
        for (key, value) in updates {
            self.data.insert(key, value);
        }
    }

    /// 行数据完整快照
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    // ===== 元数据 =====

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// 向数组型元数据追加一项
    pub fn push_metadata(&mut self, key: &str, value: impl Into<Value>) {
        let entry = self
            .metadata
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(value.into()),
            other => *other = Value::Array(vec![other.take(), value.into()]),
        }
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    // ===== 时限 =====

    pub fn time_limit(&self) -> Option<TimeLimit> {
        self.time_limit
    }

    pub fn set_time_limit(&mut self, limit: Option<TimeLimit>) {
        self.time_limit = limit;
    }

    /// 协作式超时检查
    pub fn check_deadline(&self) -> Result<(), ActionError> {
        match self.time_limit {
            Some(limit) if limit.is_exceeded() => Err(ActionError::Timeout {
                elapsed_ms: limit.started.elapsed().as_millis() as u64,
                limit_ms: limit.limit.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_row_number_is_one_based() {
        let ctx = ActionContext::new(0, Map::new());
        assert_eq!(ctx.row_number(), 1);
        assert_eq!(ActionContext::new(7, Map::new()).row_number(), 7);
    }

    #[test]
    fn test_get_helpers() {
        let ctx = ActionContext::new(
            1,
            row(json!({"sku": "  ABC-1 ", "blank": "  ", "price": "12.5", "qty": 3, "none": null})),
        );

        assert_eq!(ctx.get_str("sku"), Some("ABC-1"));
        assert_eq!(ctx.get_str("blank"), None);
        assert_eq!(ctx.get_f64("price"), Some(12.5));
        assert_eq!(ctx.get_i64("qty"), Some(3));
        assert_eq!(ctx.get_or("none", json!("fallback")), json!("fallback"));
        assert!(!ctx.has("none"));
        assert!(ctx.has("qty"));
    }

    #[test]
    fn test_merge_keeps_insertion_order() {
        let mut ctx = ActionContext::new(1, row(json!({"sku": "A", "name": "Shirt"})));
        ctx.merge(row(json!({"color": "Red", "sku": "A-1"})));

        let keys: Vec<&str> = ctx.data().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["sku", "name", "color"]);
        assert_eq!(ctx.get_str("sku"), Some("A-1"));
    }

    #[test]
    fn test_metadata_is_separate_from_data() {
        let mut ctx = ActionContext::new(1, Map::new());
        ctx.set_metadata("execution_time_ms", 12);
        ctx.push_metadata("warnings", "a");
        ctx.push_metadata("warnings", "b");

        assert!(ctx.data().is_empty());
        assert_eq!(ctx.get_metadata("warnings"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_check_deadline() {
        let mut ctx = ActionContext::new(1, Map::new());
        assert!(ctx.check_deadline().is_ok());

        ctx.set_time_limit(Some(TimeLimit {
            started: Instant::now() - Duration::from_millis(50),
            limit: Duration::from_millis(10),
        }));
        assert!(matches!(ctx.check_deadline(), Err(ActionError::Timeout { limit_ms: 10, .. })));
    }
}
