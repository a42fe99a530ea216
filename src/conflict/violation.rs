// ==========================================
// PIM 商品导入系统 - 唯一约束违反描述
// ==========================================
// 职责: 以结构化数据描述一次唯一约束冲突,供 ConflictResolver 分派
// 来源: repository::error 中的 SQLite 错误适配器
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ConstraintViolation - 约束违反
// ==========================================
// 数据库每个错误只报告一个被违反的约束
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint_name: String,           // 例: product_variants.sku
    pub table: String,                     // 例: product_variants
    pub columns: Vec<String>,              // 例: ["sku"] / ["product_id", "color", "size"]
    pub conflicting_value: Option<String>, // 单列约束时的冲突值（可能未知）
}

impl ConstraintViolation {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        let table = table.into();
        let constraint_name = columns
            .iter()
            .map(|c| format!("{}.{}", table, c))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            constraint_name,
            table,
            columns,
            conflicting_value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.conflicting_value = Some(value.into());
        self
    }

    /// 冲突字段（多列约束取最后一列,即区分属性列）
    pub fn conflicting_field(&self) -> Option<&str> {
        self.columns.last().map(|c| c.as_str())
    }

    pub fn involves(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn conflict_type(&self) -> ConflictType {
        ConflictType::classify(self)
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.conflicting_value {
            Some(value) => write!(f, "{} (值: {})", self.constraint_name, value),
            None => write!(f, "{}", self.constraint_name),
        }
    }
}

// ==========================================
// ConflictType - 冲突分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DuplicateSku,       // 变体 SKU 唯一
    DuplicateBarcode,   // 条码唯一
    VariantConstraint,  // 变体 (product_id, color, size) 唯一
    UniqueConstraint,   // 其他唯一字段
}

impl ConflictType {
    pub fn classify(violation: &ConstraintViolation) -> Self {
        if violation.table == "product_variants" && violation.columns == ["sku"] {
            ConflictType::DuplicateSku
        } else if violation.involves("barcode") {
            ConflictType::DuplicateBarcode
        } else if violation.involves("color") || violation.involves("size") {
            ConflictType::VariantConstraint
        } else {
            ConflictType::UniqueConstraint
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::DuplicateSku => "duplicate_sku",
            ConflictType::DuplicateBarcode => "duplicate_barcode",
            ConflictType::VariantConstraint => "variant_constraint",
            ConflictType::UniqueConstraint => "unique_constraint",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
