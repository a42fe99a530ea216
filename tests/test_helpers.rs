// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、行数据构造、CSV 生成等功能
// ==========================================

#![allow(dead_code)]

use pim_import::config::ImportConfig;
use pim_import::repository::SqliteCatalogRepository;
use serde_json::{Map, Value};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<SqliteCatalogRepository>: 绑定该文件的仓储
pub fn create_test_db() -> Result<(NamedTempFile, Arc<SqliteCatalogRepository>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let repo = SqliteCatalogRepository::new(&db_path)?;
    Ok((temp_file, Arc::new(repo)))
}

/// 内存库仓储
pub fn memory_repo() -> Arc<SqliteCatalogRepository> {
    Arc::new(SqliteCatalogRepository::in_memory().expect("Failed to open in-memory db"))
}

/// 写入临时 CSV 文件（带 .csv 后缀）
pub fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp csv");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp csv");
    file.flush().expect("Failed to flush temp csv");
    file
}

/// json!({...}) → 行数据
pub fn row(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("row() 需要 JSON 对象: {}", other),
    }
}

/// 不等待的重试配置,避免测试变慢
pub fn test_config() -> ImportConfig {
    let mut config = ImportConfig::default();
    config.error_handling.retry_backoff_ms = 0;
    config
}
