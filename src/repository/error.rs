// ==========================================
// PIM 商品导入系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 职责: 把 SQLite 驱动错误翻译为结构化错误
//       （唯一约束 → ConstraintViolation,只在此处解析驱动消息）
// ==========================================

use crate::conflict::ConstraintViolation;
use regex::Regex;
use rusqlite::ErrorCode;
use std::sync::OnceLock;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库繁忙: {0}")]
    DatabaseBusy(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(ConstraintViolation),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("非法标识符: {0}")]
    InvalidIdentifier(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 为唯一约束冲突补全冲突值（驱动消息里没有值,只有写入方知道）
    pub fn with_conflicting_value<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            RepositoryError::UniqueConstraintViolation(mut violation)
                if violation.conflicting_value.is_none() =>
            {
                let value = violation.conflicting_field().and_then(&lookup);
                violation.conflicting_value = value;
                RepositoryError::UniqueConstraintViolation(violation)
            }
            other => other,
        }
    }
}

fn unique_message_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"UNIQUE constraint failed: (?P<targets>[A-Za-z0-9_.,\s]+)$").ok())
        .as_ref()
}

/// 解析 SQLite 唯一约束消息
///
/// # 示例
/// - `UNIQUE constraint failed: product_variants.sku`
/// - `UNIQUE constraint failed: product_variants.product_id, product_variants.color, product_variants.size`
pub fn parse_unique_violation(message: &str) -> Option<ConstraintViolation> {
    let caps = unique_message_regex()?.captures(message.trim())?;
    let targets = caps.name("targets")?.as_str();

    let mut table: Option<String> = None;
    let mut columns = Vec::new();
    for target in targets.split(',') {
        let (t, c) = target.trim().split_once('.')?;
        if table.as_deref().is_some_and(|existing| existing != t) {
            return None;
        }
        table.get_or_insert_with(|| t.to_string());
        columns.push(c.to_string());
    }

    table.map(|t| ConstraintViolation::new(t, columns))
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let text = msg.unwrap_or_else(|| code.to_string());
                match code.code {
                    ErrorCode::ConstraintViolation => {
                        let is_unique = code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                            || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                            || text.contains("UNIQUE");
                        if is_unique {
                            if let Some(violation) = parse_unique_violation(&text) {
                                return RepositoryError::UniqueConstraintViolation(violation);
                            }
                        }
                        if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                            || text.contains("FOREIGN KEY")
                        {
                            RepositoryError::ForeignKeyViolation(text)
                        } else {
                            RepositoryError::DatabaseQueryError(text)
                        }
                    }
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        RepositoryError::DatabaseBusy(text)
                    }
                    _ => RepositoryError::DatabaseQueryError(text),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_parse_single_column() {
        let v = parse_unique_violation("UNIQUE constraint failed: product_variants.sku").unwrap();
        assert_eq!(v.table, "product_variants");
        assert_eq!(v.columns, vec!["sku".to_string()]);
    }

    #[test]
    fn test_parse_multi_column() {
        let v = parse_unique_violation(
            "UNIQUE constraint failed: product_variants.product_id, product_variants.color, product_variants.size",
        )
        .unwrap();
        assert_eq!(v.columns, vec!["product_id", "color", "size"]);
    }

    #[test]
    fn test_parse_rejects_other_messages() {
        assert!(parse_unique_violation("NOT NULL constraint failed: products.name").is_none());
        assert!(parse_unique_violation("UNIQUE constraint failed: index 'ux_x'").is_none());
    }

    #[test]
    fn test_from_real_sqlite_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, code TEXT UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (code) VALUES ('A')", []).unwrap();

        let err = conn.execute("INSERT INTO t (code) VALUES ('A')", []).unwrap_err();
        let repo_err = RepositoryError::from(err)
            .with_conflicting_value(|col| (col == "code").then(|| "A".to_string()));

        match repo_err {
            RepositoryError::UniqueConstraintViolation(v) => {
                assert_eq!(v.table, "t");
                assert_eq!(v.columns, vec!["code".to_string()]);
                assert_eq!(v.conflicting_value.as_deref(), Some("A"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
