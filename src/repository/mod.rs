// ==========================================
// PIM 商品导入系统 - 数据仓储层
// ==========================================
// 职责: 商品目录数据访问 + 行级持久化边界
// 红线: 不含业务规则;驱动错误在此翻译为结构化错误
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;

// 重导出核心类型
pub use catalog_repo::{CatalogRepository, UnitOfWork};
pub use catalog_repo_impl::SqliteCatalogRepository;
pub use error::{parse_unique_violation, RepositoryError, RepositoryResult};
