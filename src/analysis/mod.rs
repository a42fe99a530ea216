// ==========================================
// PIM 商品导入系统 - 分析层
// ==========================================
// 职责: SKU 模式分析 + 属性词表
// 红线: 纯计算,不访问数据库
// ==========================================

pub mod sku_pattern;
pub mod vocabulary;

// 重导出核心类型
pub use sku_pattern::{PatternAnalysis, PatternType, SkuPatternAnalyzer, SkuPatternResult};
pub use vocabulary::{AttributeKind, AttributeMatch, COLOR_WORDS, SIZE_WORDS};
