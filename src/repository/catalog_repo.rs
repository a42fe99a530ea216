// ==========================================
// PIM 商品导入系统 - 商品目录 Repository Trait
// ==========================================
// 职责: 定义导入管道与冲突处理器所需的数据访问接口
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

use crate::domain::product::{NewProduct, NewVariant, Product, ProductVariant};
use crate::repository::error::RepositoryResult;

// ==========================================
// CatalogRepository Trait
// ==========================================
// 实现者: SqliteCatalogRepository（使用 rusqlite）
pub trait CatalogRepository: Send + Sync {
    // ===== 父商品 =====

    fn find_product_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>>;

    /// 新增父商品,返回 id
    fn insert_product(&self, product: &NewProduct) -> RepositoryResult<i64>;

    // ===== 变体 =====

    fn find_variant_by_id(&self, id: i64) -> RepositoryResult<Option<ProductVariant>>;

    fn find_variant_by_sku(&self, sku: &str) -> RepositoryResult<Option<ProductVariant>>;

    fn find_variant_by_barcode(&self, barcode: &str) -> RepositoryResult<Option<ProductVariant>>;

    /// 按 (product_id, color, size) 查找变体（None 与空串等价）
    fn find_variant_by_attributes(
        &self,
        product_id: i64,
        color: Option<&str>,
        size: Option<&str>,
    ) -> RepositoryResult<Option<ProductVariant>>;

    /// 新增变体
    ///
    /// # 返回
    /// - Ok(i64): 新变体 id
    /// - Err(UniqueConstraintViolation): sku / barcode / 属性组合重复
    fn insert_variant(&self, variant: &NewVariant) -> RepositoryResult<i64>;

    /// 覆盖更新变体
    fn update_variant(&self, id: i64, variant: &NewVariant) -> RepositoryResult<()>;

    // ===== 冲突处理辅助 =====

    fn sku_exists(&self, sku: &str) -> RepositoryResult<bool>;

    /// 通用唯一值检查（表名/列名只允许 [A-Za-z0-9_]）
    fn value_exists(&self, table: &str, column: &str, value: &str) -> RepositoryResult<bool>;

    /// 从原持有者解绑条码,返回原持有变体 id
    fn detach_barcode(&self, barcode: &str) -> RepositoryResult<Option<i64>>;

    // ===== 条码池 =====

    /// 从条码池取下一个未分配条码
    fn allocate_barcode(&self) -> RepositoryResult<Option<String>>;

    /// 向条码池补充条码,返回实际新增数量
    fn add_pool_barcodes(&self, barcodes: &[String]) -> RepositoryResult<usize>;
}

// ==========================================
// UnitOfWork Trait
// ==========================================
// 用途: 每行一个持久化边界;冲突重试前回滚上一次尝试的部分写入
// attempt 系列为行内嵌套边界,供瞬时故障重试回滚单次尝试
pub trait UnitOfWork: Send + Sync {
    fn begin(&self) -> RepositoryResult<()>;

    fn commit(&self) -> RepositoryResult<()>;

    fn rollback(&self) -> RepositoryResult<()>;

    fn begin_attempt(&self) -> RepositoryResult<()>;

    fn release_attempt(&self) -> RepositoryResult<()>;

    fn rollback_attempt(&self) -> RepositoryResult<()>;
}
