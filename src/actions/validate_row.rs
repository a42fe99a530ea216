// ==========================================
// PIM 商品导入系统 - 行校验动作
// ==========================================
// 规则:
// - 必填字段存在且非空
// - price 可解析为非负数（回写为数字）;null 与空白视为未提供
// - barcode 若存在须为 8/12/13/14 位数字
// 失败属于校验失败,不重试
// ==========================================

use crate::pipeline::{Action, ActionContext, ActionError, ActionResult};
use serde_json::{json, Map, Value};

/// 合法条码长度（EAN-8 / UPC-A / EAN-13 / GTIN-14）
const BARCODE_LENGTHS: [usize; 4] = [8, 12, 13, 14];

pub struct ValidateRowAction {
    required_fields: Vec<String>,
}

impl ValidateRowAction {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self { required_fields }
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_valid_barcode(barcode: &str) -> bool {
    BARCODE_LENGTHS.contains(&barcode.len()) && barcode.chars().all(|c| c.is_ascii_digit())
}

impl Action for ValidateRowAction {
    fn name(&self) -> &str {
        "validate_row"
    }

    fn execute(&self, ctx: &mut ActionContext) -> Result<ActionResult, ActionError> {
        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .map(|f| f.as_str())
            .filter(|f| ctx.get_str(f).is_none())
            .collect();
        if !missing.is_empty() {
            return Ok(ActionResult::failed(
                format!("缺少必填字段: {}", missing.join(", ")),
                Map::from_iter([("missing_fields".to_string(), json!(missing))]),
            ));
        }

        let mut updates = Map::new();

        if let Some(raw) = ctx.get("price").filter(|v| !is_blank(v)) {
            match parse_price(raw) {
                Some(price) if price.is_finite() && price >= 0.0 => {
                    updates.insert("price".to_string(), json!(price));
                }
                _ => {
                    return Ok(ActionResult::failed(
                        format!("价格无效: {}", raw),
                        Map::from_iter([("field".to_string(), json!("price"))]),
                    ));
                }
            }
        }

        if let Some(barcode) = ctx.get_str("barcode") {
            if !is_valid_barcode(barcode) {
                return Ok(ActionResult::failed(
                    format!("条码格式无效: {}（须为 8/12/13/14 位数字）", barcode),
                    Map::from_iter([("field".to_string(), json!("barcode"))]),
                ));
            }
        }

        Ok(ActionResult::ok()
            .with_data_entry("validated", true)
            .with_context_updates(updates))
    }
}
