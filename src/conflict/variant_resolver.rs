// ==========================================
// PIM 商品导入系统 - 变体属性组合冲突处理器
// ==========================================
// 约束: UNIQUE (product_id, color, size)
// 策略:
// - merge_data:        合并进已有变体（已有值优先,已有为空的字段取导入值）
// - modify_attributes: 给区分属性追加 -N 后缀以绕开约束
// - use_existing
// ==========================================

use crate::config::VariantStrategy;
use crate::conflict::resolution::ConflictResolution;
use crate::conflict::resolver::{remember_original, string_field, suffix_candidates, StrategyResolver};
use crate::conflict::sku_resolver::{
    EXISTING_VARIANT_ID, WRITE_MODE, WRITE_MODE_UPDATE, WRITE_MODE_USE_EXISTING,
};
use crate::conflict::violation::{ConflictType, ConstraintViolation};
use crate::domain::ProductVariant;
use crate::repository::{CatalogRepository, RepositoryResult};
use serde_json::{Map, Value};

pub struct VariantConstraintResolver {
    strategy: VariantStrategy,
    max_suffix_attempts: u32,
}

impl VariantConstraintResolver {
    pub fn new(strategy: VariantStrategy, max_suffix_attempts: u32) -> Self {
        Self {
            strategy,
            max_suffix_attempts,
        }
    }

    fn unresolved(&self, data: &Map<String, Value>, message: impl Into<String>) -> ConflictResolution {
        ConflictResolution::unresolved(
            ConflictType::VariantConstraint,
            self.strategy.as_str(),
            data,
            message,
        )
    }

    fn merge_into_existing(
        &self,
        existing: &ProductVariant,
        data: &Map<String, Value>,
    ) -> ConflictResolution {
        let mut corrected = data.clone();

        if existing.sku != string_field(data, "sku").unwrap_or_default() {
            if let Some(sku) = corrected.get("sku").cloned() {
                remember_original(&mut corrected, "sku", sku);
            }
            corrected.insert("sku".to_string(), Value::from(existing.sku.clone()));
        }

        let existing_fields = [
            ("name", existing.name.clone().map(Value::from)),
            ("barcode", existing.barcode.clone().map(Value::from)),
            ("price", existing.price.map(Value::from)),
        ];
        for (key, value) in existing_fields {
            if let Some(value) = value {
                corrected.insert(key.to_string(), value);
            }
        }

        corrected.insert(EXISTING_VARIANT_ID.to_string(), Value::from(existing.id));
        corrected.insert(WRITE_MODE.to_string(), Value::from(WRITE_MODE_UPDATE));
        ConflictResolution::retry(
            ConflictType::VariantConstraint,
            self.strategy.as_str(),
            corrected,
        )
    }

    fn modify_attributes(
        &self,
        product_id: i64,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let color = string_field(data, "color");
        let size = string_field(data, "size");

        // 优先扰动尺码;只有颜色时扰动颜色
        let (field, base) = match (&size, &color) {
            (Some(s), _) => ("size", s.clone()),
            (None, Some(c)) => ("color", c.clone()),
            (None, None) => ("size", String::new()),
        };

        for candidate in suffix_candidates(&base, self.max_suffix_attempts) {
            let (c, s) = if field == "size" {
                (color.as_deref(), Some(candidate.as_str()))
            } else {
                (Some(candidate.as_str()), size.as_deref())
            };
            if repo.find_variant_by_attributes(product_id, c, s)?.is_some() {
                continue;
            }

            let mut corrected = data.clone();
            remember_original(&mut corrected, field, Value::from(base.clone()));
            corrected.insert(field.to_string(), Value::from(candidate.clone()));
            return Ok(ConflictResolution::retry(
                ConflictType::VariantConstraint,
                self.strategy.as_str(),
                corrected,
            )
            .with_message(format!("{} 改为 {}", field, candidate)));
        }

        Ok(self.unresolved(
            data,
            format!("{} 次后缀尝试后属性组合仍冲突", self.max_suffix_attempts),
        ))
    }
}

impl StrategyResolver for VariantConstraintResolver {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::VariantConstraint
    }

    fn strategy_name(&self, _violation: &ConstraintViolation) -> &'static str {
        self.strategy.as_str()
    }

    fn resolve(
        &self,
        _violation: &ConstraintViolation,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let Some(product_id) = data.get("product_id").and_then(Value::as_i64) else {
            return Ok(self.unresolved(data, "行数据缺少 product_id"));
        };

        if self.strategy == VariantStrategy::ModifyAttributes {
            return self.modify_attributes(product_id, data, repo);
        }

        let color = string_field(data, "color");
        let size = string_field(data, "size");
        let Some(existing) =
            repo.find_variant_by_attributes(product_id, color.as_deref(), size.as_deref())?
        else {
            return Ok(self.unresolved(data, "冲突属性组合对应的变体不存在"));
        };

        match self.strategy {
            VariantStrategy::MergeData => Ok(self.merge_into_existing(&existing, data)),
            VariantStrategy::UseExisting => {
                let mut corrected = data.clone();
                corrected.insert(EXISTING_VARIANT_ID.to_string(), Value::from(existing.id));
                corrected.insert(WRITE_MODE.to_string(), Value::from(WRITE_MODE_USE_EXISTING));
                Ok(ConflictResolution::retry(
                    ConflictType::VariantConstraint,
                    self.strategy.as_str(),
                    corrected,
                ))
            }
            VariantStrategy::ModifyAttributes => self.modify_attributes(product_id, data, repo),
        }
    }
}
