// ==========================================
// PIM 商品导入系统 - 领域类型定义
// ==========================================
// 职责: 导入模式 / 行处理结果状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
// 决定 UpsertVariantAction 遇到已存在 SKU 时的写入行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    CreateOnly,     // 只新增（重复 SKU 交给冲突处理）
    UpdateExisting, // 只更新（不存在则失败）
    #[default]
    CreateOrUpdate, // 存在则更新,否则新增
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::CreateOnly => write!(f, "create_only"),
            ImportMode::UpdateExisting => write!(f, "update_existing"),
            ImportMode::CreateOrUpdate => write!(f, "create_or_update"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create_only" => Ok(ImportMode::CreateOnly),
            "update_existing" => Ok(ImportMode::UpdateExisting),
            "create_or_update" => Ok(ImportMode::CreateOrUpdate),
            other => Err(format!("未知导入模式: {}", other)),
        }
    }
}

// ==========================================
// 行处理状态 (Row Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Created,   // 新增变体
    Updated,   // 更新已有变体
    Unchanged, // 采用已有记录,未写入
    Skipped,   // 跳过（冲突策略或无法解决的冲突）
    Failed,    // 校验/业务失败或异常
}

impl RowStatus {
    /// 由 UpsertVariantAction 写入上下文的 variant_status 推断
    pub fn from_variant_status(value: Option<&str>) -> Self {
        match value {
            Some("created") => RowStatus::Created,
            Some("updated") => RowStatus::Updated,
            _ => RowStatus::Unchanged,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Created => write!(f, "created"),
            RowStatus::Updated => write!(f, "updated"),
            RowStatus::Unchanged => write!(f, "unchanged"),
            RowStatus::Skipped => write!(f, "skipped"),
            RowStatus::Failed => write!(f, "failed"),
        }
    }
}
