// ==========================================
// PIM 商品导入系统 - 冲突处理层
// ==========================================
// 职责: 唯一约束冲突的分类、策略处理与统计
// 流程: 仓储层 ConstraintViolation → ConflictResolver 分派 → 修正数据重跑管道
// ==========================================

pub mod barcode_resolver;
pub mod resolution;
pub mod resolver;
pub mod sku_resolver;
pub mod unique_resolver;
pub mod variant_resolver;
pub mod violation;

// 重导出核心类型
pub use barcode_resolver::{DuplicateBarcodeResolver, BARCODE_REASSIGN_FROM};
pub use resolution::{ConflictResolution, ResolutionAction, ResolutionStats};
pub use resolver::{ConflictResolver, StrategyResolver};
pub use sku_resolver::{
    DuplicateSkuResolver, EXISTING_VARIANT_ID, WRITE_MODE, WRITE_MODE_UPDATE,
    WRITE_MODE_USE_EXISTING,
};
pub use unique_resolver::UniqueConstraintResolver;
pub use variant_resolver::VariantConstraintResolver;
pub use violation::{ConflictType, ConstraintViolation};
