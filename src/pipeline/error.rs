// ==========================================
// PIM 商品导入系统 - 动作管道错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 瞬时故障（可重试）/ 唯一约束冲突（交给冲突处理器）/ 其他异常
// 说明: 预期内的业务失败（缺字段、商品不存在）走 ActionResult::failed,不走错误
// ==========================================

use crate::conflict::ConstraintViolation;
use crate::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 动作执行错误（“异常”）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("连接失败: {0}")]
    Connection(String),

    #[error("执行超时: 已耗时 {elapsed_ms}ms,上限 {limit_ms}ms")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },

    #[error("唯一约束冲突: {0}")]
    Constraint(ConstraintViolation),

    #[error("未预期异常: {0}")]
    Unexpected(String),
}

// ==========================================
// ErrorClass - 错误类别（重试白名单的取值）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Database,
    Connection,
    Timeout,
    Constraint,
    Unexpected,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Database => "database",
            ErrorClass::Connection => "connection",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Constraint => "constraint",
            ErrorClass::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ActionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ActionError::Database(_) => ErrorClass::Database,
            ActionError::Connection(_) => ErrorClass::Connection,
            ActionError::Timeout { .. } => ErrorClass::Timeout,
            ActionError::Constraint(_) => ErrorClass::Constraint,
            ActionError::Unexpected(_) => ErrorClass::Unexpected,
        }
    }

    /// 底层原始消息（用于瞬时故障关键字匹配）
    pub fn detail(&self) -> String {
        match self {
            ActionError::Database(msg)
            | ActionError::Connection(msg)
            | ActionError::Unexpected(msg) => msg.clone(),
            ActionError::Timeout { .. } => "timeout".to_string(),
            ActionError::Constraint(v) => v.constraint_name.clone(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ActionError::Constraint(_))
    }

    pub fn as_conflict(&self) -> Option<&ConstraintViolation> {
        match self {
            ActionError::Constraint(v) => Some(v),
            _ => None,
        }
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ActionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(v) => ActionError::Constraint(v),
            RepositoryError::DatabaseBusy(msg) => ActionError::Database(msg),
            RepositoryError::InvalidIdentifier(_)
            | RepositoryError::InternalError(_)
            | RepositoryError::Other(_) => ActionError::Unexpected(err.to_string()),
            other => ActionError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let violation = ConstraintViolation::new("product_variants", vec!["sku".to_string()]);
        let err = ActionError::from(RepositoryError::UniqueConstraintViolation(violation.clone()));
        assert!(err.is_conflict());
        assert_eq!(err.class(), ErrorClass::Constraint);
        assert_eq!(err.as_conflict(), Some(&violation));
    }

    #[test]
    fn test_busy_keeps_driver_message() {
        let err = ActionError::from(RepositoryError::DatabaseBusy("database is locked".to_string()));
        assert_eq!(err.class(), ErrorClass::Database);
        assert_eq!(err.detail(), "database is locked");
    }

    #[test]
    fn test_error_class_serde() {
        let classes: Vec<ErrorClass> = serde_json::from_str(r#"["database","connection"]"#).unwrap();
        assert_eq!(classes, vec![ErrorClass::Database, ErrorClass::Connection]);
    }
}
