// ==========================================
// PIM 商品导入系统 - 核心库
// ==========================================
// 职责: 表格行 → 动作管道 → 商品/变体写入
// 技术栈: Rust + SQLite
// 冲突: 唯一约束冲突按策略自动处理,逐行重试
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 管道层 - 动作链与中间件
pub mod pipeline;

// 导入动作 - 标准行处理步骤
pub mod actions;

// 冲突处理层 - 唯一约束冲突策略
pub mod conflict;

// 分析层 - SKU 模式识别
pub mod analysis;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域
pub use domain::{ImportMode, NewProduct, NewVariant, Product, ProductVariant, RowStatus};

// 管道
pub use pipeline::{
    Action, ActionContext, ActionError, ActionResult, ImportMiddleware, Pipeline, PipelineBuilder,
};

// 冲突处理
pub use conflict::{
    ConflictResolution, ConflictResolver, ConflictType, ConstraintViolation, ResolutionStats,
};

// SKU 分析
pub use analysis::{PatternType, SkuPatternAnalyzer, SkuPatternResult};

// 导入
pub use importer::{BatchImporter, ImportError, ImportResult, ImportSummary};

// 配置
pub use config::{ConfigManager, ImportConfig};

// 仓储
pub use repository::{CatalogRepository, SqliteCatalogRepository, UnitOfWork};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "PIM 商品导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
