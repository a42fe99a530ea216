// ==========================================
// PIM 商品导入系统 - 属性提取动作
// ==========================================
// 从 SKU 词元补齐缺失的 color / size,并推断 parent_sku
// 已有值一律不覆盖
// ==========================================

use crate::analysis::vocabulary::{first_attribute, strip_attributes, AttributeKind};
use crate::pipeline::{Action, ActionContext, ActionError, ActionResult};
use serde_json::{json, Map, Value};

#[derive(Debug, Default)]
pub struct ExtractAttributesAction;

impl ExtractAttributesAction {
    pub fn new() -> Self {
        Self
    }
}

impl Action for ExtractAttributesAction {
    fn name(&self) -> &str {
        "extract_attributes"
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        let Some(sku) = ctx.get_str("sku").map(str::to_string) else {
            return Ok(ActionResult::failed("缺少 sku,无法提取属性", Map::new()));
        };

        let mut updates = Map::new();
        let mut extracted = Vec::new();

        for kind in [AttributeKind::Color, AttributeKind::Size] {
            let key = kind.as_str();
            if ctx.get_str(key).is_some() {
                continue;
            }
            if let Some(found) = first_attribute(&sku, kind) {
                updates.insert(key.to_string(), Value::from(found.normalized()));
                extracted.push(key);
            }
        }

        if ctx.get_str("parent_sku").is_none() {
            let base = strip_attributes(&sku);
            let parent = if base.is_empty() { sku.clone() } else { base };
            updates.insert("parent_sku".to_string(), Value::from(parent));
        }

        Ok(ActionResult::ok()
            .with_data_entry("attributes_extracted", json!(extracted))
            .with_context_updates(updates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(value: Value) -> ActionResult {
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut ctx = ActionContext::new(1, data);
        ExtractAttributesAction::new().execute(&mut ctx).unwrap()
    }

    #[test]
    fn test_fills_missing_attributes_and_parent() {
        let r = run(json!({"sku": "TEE-RED-XL"}));
        assert!(r.is_success());
        let updates = r.context_updates();
        assert_eq!(updates["color"], json!("Red"));
        assert_eq!(updates["size"], json!("XL"));
        assert_eq!(updates["parent_sku"], json!("TEE"));
    }

    #[test]
    fn test_keeps_existing_values() {
        let r = run(json!({"sku": "TEE-RED-XL", "color": "Crimson", "parent_sku": "SHIRTS"}));
        let updates = r.context_updates();
        assert!(!updates.contains_key("color"));
        assert!(!updates.contains_key("parent_sku"));
        assert_eq!(updates["size"], json!("XL"));
    }

    #[test]
    fn test_sku_without_attributes_is_its_own_parent() {
        let r = run(json!({"sku": "RED"}));
        assert_eq!(r.context_updates()["parent_sku"], json!("RED"));
    }
}
