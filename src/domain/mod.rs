// ==========================================
// PIM 商品导入系统 - 领域模型层
// ==========================================
// 职责: 定义商品/变体实体与导入相关枚举
// 红线: 不含数据访问逻辑,不含管道逻辑
// ==========================================

pub mod product;
pub mod types;

// 重导出核心类型
pub use product::{NewProduct, NewVariant, Product, ProductVariant};
pub use types::{ImportMode, RowStatus};
