// ==========================================
// PIM 商品导入系统 - 变体写入动作
// ==========================================
// 写入方式:
// - 冲突处理提示优先: existing_variant_id + write_mode（use_existing | update）
// - 否则按 import_mode: create_only 新增 / update_existing 更新 / create_or_update 存在则更新
// 输出: variant_id + variant_status（created | updated | unchanged）
// 唯一约束冲突以 ActionError::Constraint 向上传递,由冲突处理器接手
// ==========================================

use crate::conflict::{
    BARCODE_REASSIGN_FROM, EXISTING_VARIANT_ID, WRITE_MODE, WRITE_MODE_UPDATE,
    WRITE_MODE_USE_EXISTING,
};
use crate::domain::{ImportMode, NewVariant};
use crate::pipeline::{Action, ActionContext, ActionError, ActionResult};
use crate::repository::CatalogRepository;
use serde_json::Map;
use std::sync::Arc;
use tracing::debug;

pub struct UpsertVariantAction {
    repo: Arc<dyn CatalogRepository>,
    import_mode: ImportMode,
}

impl UpsertVariantAction {
    pub fn new(repo: Arc<dyn CatalogRepository>, import_mode: ImportMode) -> Self {
        Self { repo, import_mode }
    }

    fn build_variant(ctx: &ActionContext, product_id: i64, sku: &str) -> NewVariant {
        let text = |key: &str| ctx.get_str(key).map(str::to_string);
        NewVariant {
            product_id,
            sku: sku.to_string(),
            name: text("name"),
            color: text("color"),
            size: text("size"),
            barcode: text("barcode"),
            price: ctx.get_f64("price"),
        }
    }

    fn written(variant_id: i64, status: &str) -> ActionResult {
        ActionResult::ok()
            .with_data_entry("variant_status", status)
            .with_context_update("variant_id", variant_id)
            .with_context_update("variant_status", status)
    }
}

impl Action for UpsertVariantAction {
    fn name(&self) -> &str {
        "upsert_variant"
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        let Some(product_id) = ctx.get_i64("product_id") else {
            return Ok(ActionResult::failed("缺少 product_id", Map::new()));
        };
        let Some(sku) = ctx.get_str("sku").map(str::to_string) else {
            return Ok(ActionResult::failed("缺少 sku", Map::new()));
        };
        let variant = Self::build_variant(ctx, product_id, &sku);

        // 改绑条码: 先在同一事务内从原持有者解绑
        if ctx.get_i64(BARCODE_REASSIGN_FROM).is_some() {
            if let Some(barcode) = variant.barcode.as_deref() {
                self.repo.detach_barcode(barcode)?;
            }
        }

        if let Some(existing_id) = ctx.get_i64(EXISTING_VARIANT_ID) {
            match ctx.get_str(WRITE_MODE) {
                Some(WRITE_MODE_USE_EXISTING) => {
                    return Ok(Self::written(existing_id, "unchanged"));
                }
                Some(WRITE_MODE_UPDATE) => {
                    self.repo.update_variant(existing_id, &variant)?;
                    debug!(row_number = ctx.row_number(), variant_id = existing_id, "按冲突处理结果更新变体");
                    return Ok(Self::written(existing_id, "updated"));
                }
                _ => {}
            }
        }

        let existing = match self.import_mode {
            ImportMode::CreateOnly => None,
            ImportMode::UpdateExisting | ImportMode::CreateOrUpdate => {
                self.repo.find_variant_by_sku(&sku)?
            }
        };

        match (existing, self.import_mode) {
            (Some(found), _) => {
                self.repo.update_variant(found.id, &variant)?;
                Ok(Self::written(found.id, "updated"))
            }
            (None, ImportMode::UpdateExisting) => Ok(ActionResult::failed(
                format!("变体不存在: {}（update_existing 模式不新建）", sku),
                Map::new(),
            )),
            (None, _) => {
                let id = self.repo.insert_variant(&variant)?;
                Ok(Self::written(id, "created"))
            }
        }
    }
}
