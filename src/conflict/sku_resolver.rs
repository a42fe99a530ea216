// ==========================================
// PIM 商品导入系统 - 重复 SKU 处理器
// ==========================================
// 策略:
// - generate_unique: 追加 -N 后缀直到 SKU 不存在
// - use_existing:    采用已有变体,不写入
// - update_existing: 用导入数据覆盖已有变体
// - skip:            放弃本行
// ==========================================

use crate::config::SkuStrategy;
use crate::conflict::resolution::ConflictResolution;
use crate::conflict::resolver::{remember_original, string_field, suffix_candidates, StrategyResolver};
use crate::conflict::violation::{ConflictType, ConstraintViolation};
use crate::repository::{CatalogRepository, RepositoryResult};
use serde_json::{Map, Value};

/// 行数据中指向已有变体的提示键（由 UpsertVariantAction 消费）
pub const EXISTING_VARIANT_ID: &str = "existing_variant_id";
pub const WRITE_MODE: &str = "write_mode";
pub const WRITE_MODE_USE_EXISTING: &str = "use_existing";
pub const WRITE_MODE_UPDATE: &str = "update";

pub struct DuplicateSkuResolver {
    strategy: SkuStrategy,
    max_suffix_attempts: u32,
}

impl DuplicateSkuResolver {
    pub fn new(strategy: SkuStrategy, max_suffix_attempts: u32) -> Self {
        Self {
            strategy,
            max_suffix_attempts,
        }
    }

    fn generate_unique(
        &self,
        sku: &str,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let strategy = self.strategy.as_str();
        for candidate in suffix_candidates(sku, self.max_suffix_attempts) {
            if repo.sku_exists(&candidate)? {
                continue;
            }
            let mut corrected = data.clone();
            remember_original(&mut corrected, "sku", Value::from(sku));
            corrected.insert("sku".to_string(), Value::from(candidate.clone()));
            return Ok(ConflictResolution::retry(ConflictType::DuplicateSku, strategy, corrected)
                .with_message(format!("SKU {} 改为 {}", sku, candidate)));
        }

        Ok(ConflictResolution::unresolved(
            ConflictType::DuplicateSku,
            strategy,
            data,
            format!("{} 次后缀尝试后仍无可用 SKU: {}", self.max_suffix_attempts, sku),
        ))
    }

    fn point_at_existing(
        &self,
        sku: &str,
        write_mode: &str,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let strategy = self.strategy.as_str();
        let Some(existing) = repo.find_variant_by_sku(sku)? else {
            return Ok(ConflictResolution::unresolved(
                ConflictType::DuplicateSku,
                strategy,
                data,
                format!("冲突 SKU 对应的变体不存在: {}", sku),
            ));
        };

        let mut corrected = data.clone();
        corrected.insert(EXISTING_VARIANT_ID.to_string(), Value::from(existing.id));
        corrected.insert(WRITE_MODE.to_string(), Value::from(write_mode));
        Ok(ConflictResolution::retry(ConflictType::DuplicateSku, strategy, corrected))
    }
}

impl StrategyResolver for DuplicateSkuResolver {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::DuplicateSku
    }

    fn strategy_name(&self, _violation: &ConstraintViolation) -> &'static str {
        self.strategy.as_str()
    }

    fn resolve(
        &self,
        violation: &ConstraintViolation,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let strategy = self.strategy.as_str();
        let Some(sku) = string_field(data, "sku").or_else(|| violation.conflicting_value.clone())
        else {
            return Ok(ConflictResolution::unresolved(
                ConflictType::DuplicateSku,
                strategy,
                data,
                "行数据缺少 sku",
            ));
        };

        match self.strategy {
            SkuStrategy::GenerateUnique => self.generate_unique(&sku, data, repo),
            SkuStrategy::UseExisting => {
                self.point_at_existing(&sku, WRITE_MODE_USE_EXISTING, data, repo)
            }
            SkuStrategy::UpdateExisting => self.point_at_existing(&sku, WRITE_MODE_UPDATE, data, repo),
            SkuStrategy::Skip => Ok(ConflictResolution::skip(
                ConflictType::DuplicateSku,
                strategy,
                data,
            )),
        }
    }
}
