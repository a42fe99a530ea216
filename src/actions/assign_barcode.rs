// ==========================================
// PIM 商品导入系统 - 条码分配动作
// ==========================================
// 行中无条码且启用条码池时,从 barcode_pool 取下一个空闲条码
// 条码池为空 → 失败（管道中登记为可选动作）
// 冲突处理移除过的条码（original_barcode）不再补发
// ==========================================

use crate::pipeline::{Action, ActionContext, ActionError, ActionResult};
use crate::repository::CatalogRepository;
use serde_json::Map;
use std::sync::Arc;

pub struct AssignBarcodeAction {
    repo: Arc<dyn CatalogRepository>,
    enabled: bool,
}

impl AssignBarcodeAction {
    pub fn new(repo: Arc<dyn CatalogRepository>, enabled: bool) -> Self {
        Self { repo, enabled }
    }
}

impl Action for AssignBarcodeAction {
    fn name(&self) -> &str {
        "assign_barcode"
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        if !self.enabled || ctx.get_str("barcode").is_some() || ctx.has("original_barcode") {
            return Ok(ActionResult::ok().with_data_entry("barcode_allocated", false));
        }

        match self.repo.allocate_barcode()? {
            Some(barcode) => Ok(ActionResult::ok()
                .with_data_entry("barcode_allocated", true)
                .with_context_update("barcode", barcode)),
            None => Ok(ActionResult::failed("条码池已无可用条码", Map::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteCatalogRepository;
    use serde_json::{json, Value};

    fn ctx(value: Value) -> ActionContext {
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ActionContext::new(3, data)
    }

    #[test]
    fn test_allocates_from_pool_until_empty() {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        repo.add_pool_barcodes(&["12345678".to_string()]).unwrap();
        let action = AssignBarcodeAction::new(repo, true);

        let r = action.execute(&mut ctx(json!({"sku": "A"}))).unwrap();
        assert_eq!(r.context_updates()["barcode"], json!("12345678"));

        let empty = action.execute(&mut ctx(json!({"sku": "B"}))).unwrap();
        assert!(empty.is_failure());
    }

    #[test]
    fn test_keeps_existing_or_removed_barcode() {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        repo.add_pool_barcodes(&["12345678".to_string()]).unwrap();
        let action = AssignBarcodeAction::new(repo, true);

        let r = action
            .execute(&mut ctx(json!({"sku": "A", "barcode": "87654321"})))
            .unwrap();
        assert!(!r.has_context_updates());

        let r = action
            .execute(&mut ctx(json!({"sku": "A", "original_barcode": "87654321"})))
            .unwrap();
        assert!(!r.has_context_updates());
    }

    #[test]
    fn test_disabled_is_noop() {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        let action = AssignBarcodeAction::new(repo, false);
        let r = action.execute(&mut ctx(json!({"sku": "A"}))).unwrap();
        assert!(r.is_success());
        assert_eq!(r.data()["barcode_allocated"], json!(false));
    }
}
