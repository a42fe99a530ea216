// ==========================================
// PIM 商品导入系统 - 配置层
// ==========================================
// 职责: 导入配置（JSON 档案 / config_kv 覆写）与冲突策略定义
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_config::{
    BarcodeResolutionConfig, BarcodeStrategy, ConflictResolutionConfig, ErrorHandlingConfig,
    ImportConfig, LoggingConfig, SkuResolutionConfig, SkuStrategy, UniqueResolutionConfig,
    UniqueStrategy, VariantResolutionConfig, VariantStrategy, DEFAULT_TIMEOUT_SECONDS,
};
