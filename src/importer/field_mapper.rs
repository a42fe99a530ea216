// ==========================================
// PIM 商品导入系统 - 字段映射器实现
// ==========================================
// 职责: 源表头 → 标准字段名（别名表）,值去空白,空值视为缺失
// 未知表头: 规范化为 snake_case 后原样保留
// ==========================================

use crate::importer::file_parser::RawRecord;
use serde_json::{Map, Value};

/// 标准字段 → 可接受的表头别名（规范化后比较）
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("sku", &["sku", "variantsku", "itemsku", "articlenumber", "货号"]),
    ("parent_sku", &["parentsku", "productsku", "parent", "stylecode", "款号"]),
    ("name", &["name", "title", "variantname", "productname", "名称"]),
    ("parent_name", &["parentname", "producttitle", "stylename"]),
    ("color", &["color", "colour", "颜色"]),
    ("size", &["size", "尺码"]),
    ("barcode", &["barcode", "ean", "ean13", "upc", "gtin", "条码"]),
    ("price", &["price", "retailprice", "unitprice", "价格"]),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldMapper;

/// 去掉空白、下划线、连字符并转小写
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn snake_case(header: &str) -> String {
    header
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|p| !p.is_empty())
        .map(|p| p.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

impl FieldMapper {
    pub fn new() -> Self {
        Self
    }

    /// 表头对应的标准字段名
    pub fn canonical_key(&self, header: &str) -> String {
        let normalized = normalize_header(header);
        FIELD_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
            .map(|(key, _)| key.to_string())
            .unwrap_or_else(|| snake_case(header))
    }

    pub fn has_field(&self, headers: &[String], field: &str) -> bool {
        headers.iter().any(|h| self.canonical_key(h) == field)
    }

    /// 原始行 → 行数据（先出现的列优先）
    pub fn map_record(&self, record: &RawRecord) -> Map<String, Value> {
        let mut data = Map::new();
        for (header, value) in &record.fields {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let key = self.canonical_key(header);
            if key.is_empty() || data.contains_key(&key) {
                continue;
            }
            data.insert(key, Value::from(value));
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            row_number: 1,
            fields: fields
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_aliases() {
        let mapper = FieldMapper::new();
        assert_eq!(mapper.canonical_key("SKU"), "sku");
        assert_eq!(mapper.canonical_key("Variant SKU"), "sku");
        assert_eq!(mapper.canonical_key("Colour"), "color");
        assert_eq!(mapper.canonical_key("EAN"), "barcode");
        assert_eq!(mapper.canonical_key("Parent_SKU"), "parent_sku");
        assert_eq!(mapper.canonical_key("Material Care"), "material_care");
    }

    #[test]
    fn test_map_record_skips_empty_values() {
        let mapper = FieldMapper::new();
        let data = mapper.map_record(&record(&[
            ("SKU", " TEE-RED "),
            ("Colour", ""),
            ("GTIN", "4006381333931"),
            ("UPC", "000000000000"),
        ]));

        assert_eq!(data.get("sku"), Some(&Value::from("TEE-RED")));
        assert!(!data.contains_key("color"));
        // 先出现的别名列优先
        assert_eq!(data.get("barcode"), Some(&Value::from("4006381333931")));
    }

    #[test]
    fn test_has_field() {
        let mapper = FieldMapper::new();
        let headers = vec!["Item SKU".to_string(), "Price".to_string()];
        assert!(mapper.has_field(&headers, "sku"));
        assert!(!mapper.has_field(&headers, "barcode"));
    }
}
