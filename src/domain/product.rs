// ==========================================
// PIM 商品导入系统 - 商品领域模型
// ==========================================
// 用途: 导入层写入,仓储层持久化
// 对齐: db.rs products / product_variants 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 父商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String, // 父级 SKU（唯一）
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
}

// ==========================================
// ProductVariant - 商品变体
// ==========================================
// 红线: sku 唯一 / barcode 唯一 / (product_id, color, size) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewVariant - 变体写入载荷
// ==========================================
// 由 UpsertVariantAction 从行上下文组装
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: i64,
    pub sku: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
}

impl NewVariant {
    /// 取指定列的字符串值（用于补全约束冲突的冲突值）
    pub fn column_value(&self, column: &str) -> Option<String> {
        match column {
            "sku" => Some(self.sku.clone()),
            "name" => self.name.clone(),
            "color" => self.color.clone(),
            "size" => self.size.clone(),
            "barcode" => self.barcode.clone(),
            "product_id" => Some(self.product_id.to_string()),
            _ => None,
        }
    }
}
