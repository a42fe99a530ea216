// ==========================================
// PIM 商品导入系统 - 单行处理器
// ==========================================
// 流程（每次尝试）:
//   begin → 执行管道 → 成功 commit / 否则 rollback
// 唯一约束冲突:
//   交给 ConflictResolver → Retry 用修正数据重跑 / Skip 跳过 /
//   Unresolved 或超过 conflict_max_retries → 无法解决
// 无法解决: halt_on_unresolvable_conflicts 时返回错误中止批次,否则跳过本行
// 处理器自身查询失败: 本行记为失败,批次继续
// ==========================================

use crate::actions::default_pipeline;
use crate::config::ImportConfig;
use crate::conflict::{ConflictResolution, ConflictResolver, ResolutionStats};
use crate::domain::RowStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::pipeline::{ActionContext, ActionError, Pipeline};
use crate::repository::{CatalogRepository, UnitOfWork};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub row_number: usize,
    pub status: RowStatus,
    pub message: Option<String>,
    pub data: Map<String, Value>,                 // 最后一次尝试结束时的行数据
    pub resolutions: Vec<ConflictResolution>,     // 本行应用过的冲突处理
    pub warnings: Vec<Value>,                     // 可选动作失败等
}

impl RowOutcome {
    fn new(row_number: usize, status: RowStatus, ctx: ActionContext) -> Self {
        let warnings = match ctx.get_metadata("optional_failures") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Self {
            row_number,
            status,
            message: None,
            data: ctx.into_data(),
            resolutions: Vec::new(),
            warnings,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn with_resolutions(mut self, resolutions: Vec<ConflictResolution>) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            RowStatus::Created | RowStatus::Updated | RowStatus::Unchanged
        )
    }
}

// ==========================================
// ImportRowProcessor
// ==========================================
pub struct ImportRowProcessor {
    pipeline: Pipeline,
    resolver: ConflictResolver,
    unit_of_work: Arc<dyn UnitOfWork>,
    handle_conflicts: bool,
    conflict_max_retries: u32,
    halt_on_unresolvable: bool,
}

impl ImportRowProcessor {
    pub fn new(
        config: &ImportConfig,
        pipeline: Pipeline,
        resolver: ConflictResolver,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            pipeline,
            resolver,
            unit_of_work,
            handle_conflicts: config.handle_conflicts,
            conflict_max_retries: config.conflict_max_retries,
            halt_on_unresolvable: config.halt_on_unresolvable_conflicts,
        }
    }

    /// 标准管道 + 冲突处理器
    pub fn from_config<R>(config: &ImportConfig, repo: Arc<R>) -> Self
    where
        R: CatalogRepository + UnitOfWork + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = repo.clone();
        let unit_of_work: Arc<dyn UnitOfWork> = repo.clone();
        let pipeline = default_pipeline(config, catalog.clone(), unit_of_work);
        let resolver = ConflictResolver::new(&config.conflict_resolution, catalog);
        Self::new(config, pipeline, resolver, repo)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> &ResolutionStats {
        self.resolver.stats()
    }

    pub fn reset_stats(&mut self) {
        self.resolver.reset_stats();
    }

    /// 处理一行
    ///
    /// # 返回
    /// - Ok(RowOutcome): 行级结果（含失败/跳过）
    /// - Err(UnresolvableConflict): 冲突无法解决且配置为中止批次
    /// - Err(Repository): 事务边界本身失败
    pub fn process_row(
        &mut self,
        row_number: usize,
        data: Map<String, Value>,
    ) -> ImportResult<RowOutcome> {
        let mut data = data;
        let mut resolutions: Vec<ConflictResolution> = Vec::new();
        let mut conflicts: u32 = 0;

        loop {
            self.unit_of_work.begin()?;
            let mut ctx = ActionContext::new(row_number, data);
            let executed = self.pipeline.execute(&mut ctx);

            let violation = match executed {
                Ok(result) if result.is_success() => {
                    self.unit_of_work.commit()?;
                    return Ok(Self::finished(row_number, ctx).with_resolutions(resolutions));
                }
                Ok(result) => {
                    self.unit_of_work.rollback()?;
                    let message = result.error().unwrap_or("未知失败").to_string();
                    debug!(row_number = row_number, error = %message, "行处理失败");
                    return Ok(RowOutcome::new(row_number, RowStatus::Failed, ctx)
                        .with_message(message)
                        .with_resolutions(resolutions));
                }
                Err(ActionError::Constraint(violation)) => {
                    self.unit_of_work.rollback()?;
                    violation
                }
                Err(err) => {
                    self.unit_of_work.rollback()?;
                    warn!(row_number = row_number, error = %err, "行处理异常");
                    return Ok(RowOutcome::new(row_number, RowStatus::Failed, ctx)
                        .with_message(err.to_string())
                        .with_resolutions(resolutions));
                }
            };

            if !self.handle_conflicts {
                return Ok(RowOutcome::new(row_number, RowStatus::Failed, ctx)
                    .with_message(format!("唯一约束冲突: {}", violation))
                    .with_resolutions(resolutions));
            }

            conflicts += 1;
            let snapshot = ctx.data().clone();

            let resolution = if conflicts > self.conflict_max_retries {
                self.resolver.record_unresolved(
                    &violation,
                    &snapshot,
                    format!("冲突处理已达上限 {} 次", self.conflict_max_retries),
                )
            } else {
                match self.resolver.resolve(&violation, &snapshot, conflicts) {
                    Ok(resolution) => resolution,
                    Err(err) => {
                        warn!(row_number = row_number, error = %err, "冲突处理查询失败");
                        return Ok(RowOutcome::new(row_number, RowStatus::Failed, ctx)
                            .with_message(format!("冲突处理失败: {}", err))
                            .with_resolutions(resolutions));
                    }
                }
            };
            resolutions.push(resolution.clone());

            if resolution.should_retry() {
                data = resolution.corrected_data;
                continue;
            }

            if resolution.should_skip() {
                let message = resolution.message.clone().unwrap_or_default();
                return Ok(RowOutcome::new(row_number, RowStatus::Skipped, ctx)
                    .with_message(message)
                    .with_resolutions(resolutions));
            }

            let message = format!(
                "{}: {}",
                violation,
                resolution.message.as_deref().unwrap_or("无法处理")
            );
            if self.halt_on_unresolvable {
                return Err(ImportError::UnresolvableConflict {
                    row: row_number,
                    message,
                });
            }
            warn!(row_number = row_number, reason = %message, "冲突无法解决,跳过本行");
            return Ok(RowOutcome::new(row_number, RowStatus::Skipped, ctx)
                .with_message(message)
                .with_resolutions(resolutions));
        }
    }

    fn finished(row_number: usize, ctx: ActionContext) -> RowOutcome {
        let status = RowStatus::from_variant_status(ctx.get_str("variant_status"));
        RowOutcome::new(row_number, status, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SkuStrategy, VariantStrategy};
    use crate::conflict::ConstraintViolation;
    use crate::pipeline::{ActionResult, FnAction};
    use crate::repository::SqliteCatalogRepository;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn processor(config: ImportConfig) -> (ImportRowProcessor, Arc<SqliteCatalogRepository>) {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        (ImportRowProcessor::from_config(&config, repo.clone()), repo)
    }

    fn create_only() -> ImportConfig {
        ImportConfig {
            import_mode: crate::domain::ImportMode::CreateOnly,
            ..ImportConfig::default()
        }
    }

    #[test]
    fn test_duplicate_sku_generates_unique() {
        let (mut p, repo) = processor(create_only());
        let first = p.process_row(1, row(json!({"sku": "TEE-RED-S"}))).unwrap();
        assert_eq!(first.status, RowStatus::Created);

        // 同 SKU 不同颜色: 只撞 sku 约束
        let second = p
            .process_row(2, row(json!({"sku": "TEE-RED-S", "color": "Blue"})))
            .unwrap();
        assert_eq!(second.status, RowStatus::Created);
        assert_eq!(second.data["sku"], json!("TEE-RED-S-1"));
        assert_eq!(second.data["original_sku"], json!("TEE-RED-S"));
        assert_eq!(second.resolutions.len(), 1);
        assert!(repo.sku_exists("TEE-RED-S-1").unwrap());
        assert_eq!(p.stats().resolved, 1);
    }

    #[test]
    fn test_skip_strategy_marks_row_skipped() {
        let mut config = create_only();
        config.conflict_resolution.sku_resolution.strategy = SkuStrategy::Skip;
        let (mut p, repo) = processor(config);

        p.process_row(1, row(json!({"sku": "A-RED"}))).unwrap();
        let outcome = p.process_row(2, row(json!({"sku": "A-RED", "size": "M"}))).unwrap();

        assert_eq!(outcome.status, RowStatus::Skipped);
        assert_eq!(p.stats().skipped, 1);
        assert!(repo.find_variant_by_sku("A-RED").unwrap().unwrap().size.is_none());
    }

    #[test]
    fn test_conflicts_disabled_fail_row() {
        let mut config = create_only();
        config.handle_conflicts = false;
        let (mut p, _) = processor(config);

        p.process_row(1, row(json!({"sku": "A-RED"}))).unwrap();
        let outcome = p.process_row(2, row(json!({"sku": "A-RED", "size": "M"}))).unwrap();
        assert_eq!(outcome.status, RowStatus::Failed);
        assert!(outcome.message.unwrap().contains("product_variants.sku"));
    }

    #[test]
    fn test_unresolvable_halts_when_configured() {
        let mut config = create_only();
        config.conflict_max_retries = 0;
        config.halt_on_unresolvable_conflicts = true;
        let (mut p, _) = processor(config);

        p.process_row(1, row(json!({"sku": "A-RED"}))).unwrap();
        let err = p.process_row(2, row(json!({"sku": "A-RED", "size": "M"}))).unwrap_err();
        assert!(matches!(err, ImportError::UnresolvableConflict { row: 2, .. }));
        assert_eq!(p.stats().unresolved, 1);
    }

    #[test]
    fn test_variant_merge_updates_existing() {
        let mut config = ImportConfig::default();
        config.conflict_resolution.variant_resolution.strategy = VariantStrategy::MergeData;
        let (mut p, repo) = processor(config);

        p.process_row(1, row(json!({"sku": "TEE-RED-S", "parent_sku": "TEE"})))
            .unwrap();
        // 新 SKU,但 (TEE, Red, S) 已存在
        let outcome = p
            .process_row(
                2,
                row(json!({"sku": "TEE-RS", "parent_sku": "TEE", "color": "Red", "size": "S", "price": "5"})),
            )
            .unwrap();

        assert_eq!(outcome.status, RowStatus::Updated);
        let stored = repo.find_variant_by_sku("TEE-RED-S").unwrap().unwrap();
        assert_eq!(stored.price, Some(5.0));
        assert!(!repo.sku_exists("TEE-RS").unwrap());
    }

    #[test]
    fn test_validation_failure_rolls_back() {
        let (mut p, repo) = processor(ImportConfig::default());
        let outcome = p
            .process_row(1, row(json!({"sku": "BAD-1", "price": "abc"})))
            .unwrap();
        assert_eq!(outcome.status, RowStatus::Failed);
        assert!(repo.find_product_by_sku("BAD-1").unwrap().is_none());
    }

    #[test]
    fn test_resolver_lookup_error_fails_row() {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        let config = ImportConfig::default();
        let pipeline = Pipeline::builder("broken_constraint")
            .action(FnAction::new("insert", |ctx| match ctx.get_str("code") {
                Some(code) => Err(ActionError::Constraint(
                    ConstraintViolation::new("catalog items", vec!["code".to_string()])
                        .with_value(code),
                )),
                None => Ok(ActionResult::ok()),
            }))
            .build();
        let catalog: Arc<dyn CatalogRepository> = repo.clone();
        let resolver = ConflictResolver::new(&config.conflict_resolution, catalog);
        let mut p = ImportRowProcessor::new(&config, pipeline, resolver, repo);

        // 表名非法,后缀查重在仓储层报错
        let outcome = p.process_row(7, row(json!({"code": "X-1"}))).unwrap();
        assert_eq!(outcome.status, RowStatus::Failed);
        assert!(outcome.message.unwrap().contains("冲突处理失败"));

        let next = p.process_row(8, row(json!({"sku": "OK-1"}))).unwrap();
        assert!(next.is_success());
    }
}
