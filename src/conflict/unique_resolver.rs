// ==========================================
// PIM 商品导入系统 - 通用唯一字段处理器
// ==========================================
// 按字段名选择策略（unique_resolution.fields 覆写,默认 append_suffix）
// ==========================================

use crate::config::{UniqueResolutionConfig, UniqueStrategy};
use crate::conflict::resolution::ConflictResolution;
use crate::conflict::resolver::{remember_original, string_field, suffix_candidates, StrategyResolver};
use crate::conflict::violation::{ConflictType, ConstraintViolation};
use crate::repository::{CatalogRepository, RepositoryResult};
use serde_json::{Map, Value};

pub struct UniqueConstraintResolver {
    config: UniqueResolutionConfig,
    max_suffix_attempts: u32,
}

impl UniqueConstraintResolver {
    pub fn new(config: UniqueResolutionConfig, max_suffix_attempts: u32) -> Self {
        Self {
            config,
            max_suffix_attempts,
        }
    }

    fn strategy_for(&self, violation: &ConstraintViolation) -> UniqueStrategy {
        violation
            .conflicting_field()
            .map(|field| self.config.strategy_for(field))
            .unwrap_or(self.config.strategy)
    }
}

/// 约束列在行数据中的键（父商品 sku 在行里叫 parent_sku）
fn data_key(table: &str, column: &str) -> String {
    match (table, column) {
        ("products", "sku") => "parent_sku".to_string(),
        ("products", "name") => "parent_name".to_string(),
        _ => column.to_string(),
    }
}

impl StrategyResolver for UniqueConstraintResolver {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::UniqueConstraint
    }

    fn strategy_name(&self, violation: &ConstraintViolation) -> &'static str {
        self.strategy_for(violation).as_str()
    }

    fn resolve(
        &self,
        violation: &ConstraintViolation,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution> {
        let strategy = self.strategy_for(violation);
        let Some(column) = violation.conflicting_field() else {
            return Ok(ConflictResolution::unresolved(
                ConflictType::UniqueConstraint,
                strategy.as_str(),
                data,
                "约束未给出冲突列",
            ));
        };
        let key = data_key(&violation.table, column);

        match strategy {
            UniqueStrategy::AppendSuffix => {
                let Some(value) =
                    string_field(data, &key).or_else(|| violation.conflicting_value.clone())
                else {
                    return Ok(ConflictResolution::unresolved(
                        ConflictType::UniqueConstraint,
                        strategy.as_str(),
                        data,
                        format!("行数据缺少字段 {}", key),
                    ));
                };

                for candidate in suffix_candidates(&value, self.max_suffix_attempts) {
                    if repo.value_exists(&violation.table, column, &candidate)? {
                        continue;
                    }
                    let mut corrected = data.clone();
                    remember_original(&mut corrected, &key, Value::from(value.clone()));
                    corrected.insert(key.clone(), Value::from(candidate));
                    return Ok(ConflictResolution::retry(
                        ConflictType::UniqueConstraint,
                        strategy.as_str(),
                        corrected,
                    ));
                }

                Ok(ConflictResolution::unresolved(
                    ConflictType::UniqueConstraint,
                    strategy.as_str(),
                    data,
                    format!("{} 次后缀尝试后 {} 仍冲突", self.max_suffix_attempts, key),
                ))
            }
            UniqueStrategy::RemoveField => {
                let mut corrected = data.clone();
                match corrected.remove(&key) {
                    Some(original) => {
                        remember_original(&mut corrected, &key, original);
                        Ok(ConflictResolution::retry(
                            ConflictType::UniqueConstraint,
                            strategy.as_str(),
                            corrected,
                        ))
                    }
                    None => Ok(ConflictResolution::unresolved(
                        ConflictType::UniqueConstraint,
                        strategy.as_str(),
                        data,
                        format!("行数据中没有可移除的字段 {}", key),
                    )),
                }
            }
            UniqueStrategy::Skip => Ok(ConflictResolution::skip(
                ConflictType::UniqueConstraint,
                strategy.as_str(),
                data,
            )),
        }
    }
}
