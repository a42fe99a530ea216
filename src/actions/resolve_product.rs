// ==========================================
// PIM 商品导入系统 - 父商品解析动作
// ==========================================
// 按 parent_sku 查找父商品,不存在则新建
// update_existing 模式下父商品不存在属于业务失败
// ==========================================

use crate::domain::{ImportMode, NewProduct};
use crate::pipeline::{Action, ActionContext, ActionError, ActionResult};
use crate::repository::CatalogRepository;
use serde_json::Map;
use std::sync::Arc;
use tracing::debug;

pub struct ResolveProductAction {
    repo: Arc<dyn CatalogRepository>,
    import_mode: ImportMode,
}

impl ResolveProductAction {
    pub fn new(repo: Arc<dyn CatalogRepository>, import_mode: ImportMode) -> Self {
        Self { repo, import_mode }
    }
}

impl Action for ResolveProductAction {
    fn name(&self) -> &str {
        "resolve_product"
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        let Some(parent_sku) = ctx
            .get_str("parent_sku")
            .or_else(|| ctx.get_str("sku"))
            .map(str::to_string)
        else {
            return Ok(ActionResult::failed("缺少 parent_sku", Map::new()));
        };

        if let Some(product) = self.repo.find_product_by_sku(&parent_sku)? {
            return Ok(ActionResult::ok()
                .with_data_entry("product_status", "existing")
                .with_context_update("product_id", product.id));
        }

        if self.import_mode == ImportMode::UpdateExisting {
            return Ok(ActionResult::failed(
                format!("父商品不存在: {}（update_existing 模式不新建）", parent_sku),
                Map::new(),
            ));
        }

        let name = ctx
            .get_str("parent_name")
            .or_else(|| ctx.get_str("name"))
            .unwrap_or(&parent_sku)
            .to_string();
        let id = self.repo.insert_product(&NewProduct {
            sku: parent_sku.clone(),
            name,
        })?;

        debug!(row_number = ctx.row_number(), parent_sku = %parent_sku, product_id = id, "新建父商品");
        Ok(ActionResult::ok()
            .with_data_entry("product_status", "created")
            .with_context_update("product_id", id))
    }
}
