// ==========================================
// PIM 商品导入系统 - 商品目录 Repository 实现（SQLite）
// ==========================================
// 说明:
// - color / size 在库中以空串存储 None
// - 唯一约束冲突经 RepositoryError::from 解析为 ConstraintViolation,
//   再由写入方补全冲突值
// - UnitOfWork 以 SAVEPOINT import_row 实现,单次尝试嵌套 SAVEPOINT import_attempt
// ==========================================

use crate::db::{configure_sqlite_connection, init_catalog_schema, open_sqlite_connection};
use crate::domain::product::{NewProduct, NewVariant, Product, ProductVariant};
use crate::repository::catalog_repo::{CatalogRepository, UnitOfWork};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, name, color, size, barcode, price, created_at, updated_at";

// ==========================================
// SqliteCatalogRepository
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    /// 打开数据库并确保 schema 存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_catalog_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试 / 试运行）
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure_sqlite_connection(&conn)?;
        init_catalog_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = lock(&conn)?;
            configure_sqlite_connection(&guard)?;
            init_catalog_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn find_variant_where(
        &self,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Option<ProductVariant>> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM product_variants WHERE {} LIMIT 1",
            VARIANT_COLUMNS, clause
        );

        let variant = conn.query_row(&sql, params, map_variant).optional()?;
        Ok(variant)
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

fn empty_to_none(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn map_variant(row: &Row<'_>) -> rusqlite::Result<ProductVariant> {
    Ok(ProductVariant {
        id: row.get(0)?,
        product_id: row.get(1)?,
        sku: row.get(2)?,
        name: row.get(3)?,
        color: empty_to_none(row.get(4)?),
        size: empty_to_none(row.get(5)?),
        barcode: row.get(6)?,
        price: row.get(7)?,
        created_at: row.get::<_, DateTime<Utc>>(8)?,
        updated_at: row.get::<_, DateTime<Utc>>(9)?,
    })
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get::<_, DateTime<Utc>>(3)?,
        updated_at: row.get::<_, DateTime<Utc>>(4)?,
    })
}

/// 表名/列名白名单校验
fn validate_identifier(identifier: &str) -> RepositoryResult<()> {
    let valid = !identifier.is_empty()
        && !identifier.starts_with(|c: char| c.is_ascii_digit())
        && identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidIdentifier(identifier.to_string()))
    }
}

impl CatalogRepository for SqliteCatalogRepository {
    fn find_product_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        let conn = lock(&self.conn)?;
        let product = conn
            .query_row(
                "SELECT id, sku, name, created_at, updated_at FROM products WHERE sku = ?1",
                params![sku],
                map_product,
            )
            .optional()?;
        Ok(product)
    }

    fn insert_product(&self, product: &NewProduct) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO products (sku, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![product.sku, product.name, now, now],
        )
        .map_err(|e| {
            RepositoryError::from(e)
                .with_conflicting_value(|col| (col == "sku").then(|| product.sku.clone()))
        })?;
        Ok(conn.last_insert_rowid())
    }

    fn find_variant_by_id(&self, id: i64) -> RepositoryResult<Option<ProductVariant>> {
        self.find_variant_where("id = ?1", &[&id])
    }

    fn find_variant_by_sku(&self, sku: &str) -> RepositoryResult<Option<ProductVariant>> {
        self.find_variant_where("sku = ?1", &[&sku])
    }

    fn find_variant_by_barcode(&self, barcode: &str) -> RepositoryResult<Option<ProductVariant>> {
        self.find_variant_where("barcode = ?1", &[&barcode])
    }

    fn find_variant_by_attributes(
        &self,
        product_id: i64,
        color: Option<&str>,
        size: Option<&str>,
    ) -> RepositoryResult<Option<ProductVariant>> {
        let color = color.unwrap_or_default();
        let size = size.unwrap_or_default();
        self.find_variant_where(
            "product_id = ?1 AND color = ?2 AND size = ?3",
            &[&product_id, &color, &size],
        )
    }

    fn insert_variant(&self, variant: &NewVariant) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO product_variants (
                product_id, sku, name, color, size, barcode, price, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                variant.product_id,
                variant.sku,
                variant.name,
                variant.color.as_deref().unwrap_or_default(),
                variant.size.as_deref().unwrap_or_default(),
                variant.barcode,
                variant.price,
                now,
                now,
            ],
        )
        .map_err(|e| RepositoryError::from(e).with_conflicting_value(|col| variant.column_value(col)))?;
        Ok(conn.last_insert_rowid())
    }

    fn update_variant(&self, id: i64, variant: &NewVariant) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let changed = conn
            .execute(
                r#"
                UPDATE product_variants SET
                    product_id = ?2, sku = ?3, name = ?4, color = ?5, size = ?6,
                    barcode = ?7, price = ?8, updated_at = ?9
                WHERE id = ?1
                "#,
                params![
                    id,
                    variant.product_id,
                    variant.sku,
                    variant.name,
                    variant.color.as_deref().unwrap_or_default(),
                    variant.size.as_deref().unwrap_or_default(),
                    variant.barcode,
                    variant.price,
                    Utc::now(),
                ],
            )
            .map_err(|e| {
                RepositoryError::from(e).with_conflicting_value(|col| variant.column_value(col))
            })?;

        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "product_variant".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn sku_exists(&self, sku: &str) -> RepositoryResult<bool> {
        self.value_exists("product_variants", "sku", sku)
    }

    fn value_exists(&self, table: &str, column: &str, value: &str) -> RepositoryResult<bool> {
        validate_identifier(table)?;
        validate_identifier(column)?;

        let conn = lock(&self.conn)?;
        let sql = format!("SELECT 1 FROM \"{}\" WHERE \"{}\" = ?1 LIMIT 1", table, column);
        let exists = conn
            .query_row(&sql, params![value], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn detach_barcode(&self, barcode: &str) -> RepositoryResult<Option<i64>> {
        let conn = lock(&self.conn)?;
        let owner: Option<i64> = conn
            .query_row(
                "SELECT id FROM product_variants WHERE barcode = ?1",
                params![barcode],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = owner {
            conn.execute(
                "UPDATE product_variants SET barcode = NULL, updated_at = ?2 WHERE id = ?1",
                params![id, Utc::now()],
            )?;
        }
        Ok(owner)
    }

    fn allocate_barcode(&self) -> RepositoryResult<Option<String>> {
        let conn = lock(&self.conn)?;
        let next: Option<String> = conn
            .query_row(
                r#"
                SELECT p.barcode FROM barcode_pool p
                WHERE p.assigned = 0
                  AND NOT EXISTS (SELECT 1 FROM product_variants v WHERE v.barcode = p.barcode)
                ORDER BY p.barcode
                LIMIT 1
                "#,
                [],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(barcode) = &next {
            conn.execute(
                "UPDATE barcode_pool SET assigned = 1, assigned_at = ?2 WHERE barcode = ?1",
                params![barcode, Utc::now()],
            )?;
        }
        Ok(next)
    }

    fn add_pool_barcodes(&self, barcodes: &[String]) -> RepositoryResult<usize> {
        let mut conn = lock(&self.conn)?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut added = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO barcode_pool (barcode) VALUES (?1)")?;
            for barcode in barcodes {
                added += stmt.execute(params![barcode.trim()])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(added)
    }
}

impl UnitOfWork for SqliteCatalogRepository {
    fn begin(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("SAVEPOINT import_row;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn commit(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("RELEASE SAVEPOINT import_row;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("ROLLBACK TO SAVEPOINT import_row; RELEASE SAVEPOINT import_row;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn begin_attempt(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("SAVEPOINT import_attempt;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn release_attempt(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("RELEASE SAVEPOINT import_attempt;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback_attempt(&self) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch("ROLLBACK TO SAVEPOINT import_attempt; RELEASE SAVEPOINT import_attempt;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}
