// ==========================================
// PIM 商品导入系统 - 重复条码处理器
// ==========================================
// 策略:
// - remove_barcode: 去掉条码后继续
// - reassign:       标记原持有者,由写入动作在同一事务内解绑后改绑
// - skip
// ==========================================

use crate::config::BarcodeStrategy;
use crate::conflict::resolution::ConflictResolution;
use crate::conflict::resolver::{remember_original, string_field, StrategyResolver};
use crate::conflict::violation::{ConflictType, ConstraintViolation};
use crate::repository::{CatalogRepository, RepositoryResult};
use serde_json::{Map, Value};

/// 需要先解绑的原持有变体 id（由 UpsertVariantAction 消费）
pub const BARCODE_REASSIGN_FROM: &str = "barcode_reassign_from";

pub struct DuplicateBarcodeResolver {
    strategy: BarcodeStrategy,
}

impl DuplicateBarcodeResolver {
    pub fn new(strategy: BarcodeStrategy) -> Self {
        Self { strategy }
    }
}

impl StrategyResolver for DuplicateBarcodeResolver {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::DuplicateBarcode
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
        let barcode = string_field(data, "barcode").or_else(|| violation.conflicting_value.clone());

        match self.strategy {
            BarcodeStrategy::RemoveBarcode => {
                if !data.contains_key("barcode") {
                    return Ok(ConflictResolution::unresolved(
                        ConflictType::DuplicateBarcode,
                        strategy,
                        data,
                        "行数据中没有可移除的条码",
                    ));
                }
                let mut corrected = data.clone();
                if let Some(original) = corrected.remove("barcode") {
                    remember_original(&mut corrected, "barcode", original);
                }
                Ok(ConflictResolution::retry(ConflictType::DuplicateBarcode, strategy, corrected))
            }
            BarcodeStrategy::Reassign => {
                let Some(barcode) = barcode else {
                    return Ok(ConflictResolution::unresolved(
                        ConflictType::DuplicateBarcode,
                        strategy,
                        data,
                        "冲突条码未知",
                    ));
                };
                let Some(owner) = repo.find_variant_by_barcode(&barcode)? else {
                    return Ok(ConflictResolution::unresolved(
                        ConflictType::DuplicateBarcode,
                        strategy,
                        data,
                        format!("条码 {} 无原持有者", barcode),
                    ));
                };
                if data.get(BARCODE_REASSIGN_FROM).and_then(Value::as_i64) == Some(owner.id) {
                    return Ok(ConflictResolution::unresolved(
                        ConflictType::DuplicateBarcode,
                        strategy,
                        data,
                        format!("条码 {} 改绑后仍冲突", barcode),
                    ));
                }

                let mut corrected = data.clone();
                corrected.insert(BARCODE_REASSIGN_FROM.to_string(), Value::from(owner.id));
                Ok(ConflictResolution::retry(ConflictType::DuplicateBarcode, strategy, corrected)
                    .with_message(format!("条码 {} 从变体 {} 改绑", barcode, owner.id)))
            }
            BarcodeStrategy::Skip => Ok(ConflictResolution::skip(
                ConflictType::DuplicateBarcode,
                strategy,
                data,
            )),
        }
    }
}
