// ==========================================
// PIM 商品导入系统 - 导入配置
// ==========================================
// 格式: JSON（serde）,所有字段均有默认值
// 红线: 冲突策略为封闭枚举,未知策略名在反序列化时即报错
// ==========================================

use crate::domain::types::ImportMode;
use crate::importer::error::{ImportError, ImportResult};
use crate::pipeline::ErrorClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// 默认单行时限（秒）
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;

// ==========================================
// 冲突策略枚举
// ==========================================

/// 重复 SKU 策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuStrategy {
    #[default]
    GenerateUnique, // 追加递增后缀直到不重复
    UseExisting,    // 采用已有记录,不写入
    UpdateExisting, // 用导入数据覆盖已有记录
    Skip,           // 放弃本行
}

impl SkuStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkuStrategy::GenerateUnique => "generate_unique",
            SkuStrategy::UseExisting => "use_existing",
            SkuStrategy::UpdateExisting => "update_existing",
            SkuStrategy::Skip => "skip",
        }
    }
}

/// 重复条码策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeStrategy {
    #[default]
    RemoveBarcode, // 去掉条码后继续
    Reassign,      // 从原持有者解绑,改绑到本行
    Skip,
}

impl BarcodeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeStrategy::RemoveBarcode => "remove_barcode",
            BarcodeStrategy::Reassign => "reassign",
            BarcodeStrategy::Skip => "skip",
        }
    }
}

/// 变体 (product_id, color, size) 冲突策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantStrategy {
    #[default]
    MergeData,        // 已有变体为空的字段由导入数据补齐
    ModifyAttributes, // 给区分属性追加后缀以绕开约束
    UseExisting,
}

impl VariantStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantStrategy::MergeData => "merge_data",
            VariantStrategy::ModifyAttributes => "modify_attributes",
            VariantStrategy::UseExisting => "use_existing",
        }
    }
}

/// 通用唯一字段策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueStrategy {
    #[default]
    AppendSuffix,
    RemoveField,
    Skip,
}

impl UniqueStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueStrategy::AppendSuffix => "append_suffix",
            UniqueStrategy::RemoveField => "remove_field",
            UniqueStrategy::Skip => "skip",
        }
    }
}

// ==========================================
// 冲突处理配置
// ==========================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkuResolutionConfig {
    pub strategy: SkuStrategy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeResolutionConfig {
    pub strategy: BarcodeStrategy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantResolutionConfig {
    pub strategy: VariantStrategy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueResolutionConfig {
    pub strategy: UniqueStrategy,
    /// 按字段名覆写策略
    pub fields: BTreeMap<String, UniqueStrategy>,
}

impl UniqueResolutionConfig {
    pub fn strategy_for(&self, field: &str) -> UniqueStrategy {
        self.fields.get(field).copied().unwrap_or(self.strategy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictResolutionConfig {
    pub sku_resolution: SkuResolutionConfig,
    pub barcode_resolution: BarcodeResolutionConfig,
    pub variant_resolution: VariantResolutionConfig,
    pub unique_resolution: UniqueResolutionConfig,
    /// 生成唯一后缀时的最大尝试次数
    pub max_suffix_attempts: u32,
}

impl Default for ConflictResolutionConfig {
    fn default() -> Self {
        Self {
            sku_resolution: SkuResolutionConfig::default(),
            barcode_resolution: BarcodeResolutionConfig::default(),
            variant_resolution: VariantResolutionConfig::default(),
            unique_resolution: UniqueResolutionConfig::default(),
            max_suffix_attempts: 100,
        }
    }
}

// ==========================================
// 中间件配置
// ==========================================

/// ErrorHandlingMiddleware 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    pub retry_on_failure: bool,
    pub max_retries: u32,                     // 额外重试次数
    pub retryable_exceptions: Vec<ErrorClass>, // 可重试错误类别白名单
    pub retry_backoff_ms: u64,                // 第 n 次重试前等待 n × retry_backoff_ms
    pub graceful_degradation: bool,           // 放弃时附带已累积的部分数据
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            retry_on_failure: true,
            max_retries: 2,
            retryable_exceptions: vec![ErrorClass::Database, ErrorClass::Connection],
            retry_backoff_ms: 100,
            graceful_degradation: true,
        }
    }
}

/// LoggingMiddleware 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_successful: bool,
    pub log_failed: bool,
    pub log_context: bool, // 只记录字段名,不记录字段值
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_successful: false,
            log_failed: true,
            log_context: false,
        }
    }
}

// ==========================================
// ImportConfig - 导入总配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub import_mode: ImportMode,
    pub handle_conflicts: bool,
    pub conflict_max_retries: u32,
    pub halt_on_unresolvable_conflicts: bool,
    pub conflict_resolution: ConflictResolutionConfig,
    pub timeout_seconds: f64,

    #[serde(flatten)]
    pub error_handling: ErrorHandlingConfig,

    #[serde(flatten)]
    pub logging: LoggingConfig,

    pub analyze_sku_patterns: bool,
    pub allocate_barcodes: bool,
    pub required_fields: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            import_mode: ImportMode::default(),
            handle_conflicts: true,
            conflict_max_retries: 3,
            halt_on_unresolvable_conflicts: false,
            conflict_resolution: ConflictResolutionConfig::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            error_handling: ErrorHandlingConfig::default(),
            logging: LoggingConfig::default(),
            analyze_sku_patterns: true,
            allocate_barcodes: false,
            required_fields: vec!["sku".to_string()],
        }
    }
}

impl ImportConfig {
    pub fn from_json_str(raw: &str) -> ImportResult<Self> {
        let config: ImportConfig =
            serde_json::from_str(raw).map_err(|e| ImportError::ConfigValueError {
                key: "import".to_string(),
                value: truncate(raw, 120),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ImportError::ConfigReadError {
            key: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// 校验取值范围
    pub fn validate(&self) -> ImportResult<()> {
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(ImportError::ConfigValueError {
                key: "timeout_seconds".to_string(),
                value: self.timeout_seconds.to_string(),
                message: "必须为正数".to_string(),
            });
        }
        if self.required_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ImportError::ConfigValueError {
                key: "required_fields".to_string(),
                value: format!("{:?}", self.required_fields),
                message: "字段名不能为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0 {
            Duration::from_secs_f64(self.timeout_seconds)
        } else {
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS)
        }
    }
}

fn truncate(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.import_mode, ImportMode::CreateOrUpdate);
        assert!(config.handle_conflicts);
        assert_eq!(config.conflict_max_retries, 3);
        assert_eq!(config.error_handling.max_retries, 2);
        assert_eq!(
            config.error_handling.retryable_exceptions,
            vec![ErrorClass::Database, ErrorClass::Connection]
        );
        assert!(!config.logging.log_successful);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_flat_keys_and_nested_strategies() {
        let config = ImportConfig::from_json_str(
            r#"{
                "import_mode": "create_only",
                "max_retries": 4,
                "log_successful": true,
                "conflict_resolution": {
                    "sku_resolution": { "strategy": "skip" },
                    "unique_resolution": { "fields": { "slug": "remove_field" } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.import_mode, ImportMode::CreateOnly);
        assert_eq!(config.error_handling.max_retries, 4);
        assert!(config.logging.log_successful);
        assert_eq!(config.conflict_resolution.sku_resolution.strategy, SkuStrategy::Skip);
        assert_eq!(
            config.conflict_resolution.unique_resolution.strategy_for("slug"),
            UniqueStrategy::RemoveField
        );
        assert_eq!(
            config.conflict_resolution.unique_resolution.strategy_for("handle"),
            UniqueStrategy::AppendSuffix
        );
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = ImportConfig::from_json_str(
            r#"{ "conflict_resolution": { "sku_resolution": { "strategy": "overwrite_everything" } } }"#,
        );
        assert!(matches!(err, Err(ImportError::ConfigValueError { .. })));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = ImportConfig::from_json_str(r#"{ "timeout_seconds": -1 }"#);
        assert!(matches!(err, Err(ImportError::ConfigValueError { .. })));
    }
}
