// ==========================================
// PIM 商品导入系统 - 具体动作
// ==========================================
// 执行顺序:
//   ValidateRow → ExtractAttributes → ResolveProduct → AssignBarcode（可选）→ UpsertVariant
// 中间件顺序（外 → 内）:
//   Logging → Timing → ErrorHandling
//   重试在最内层,计时与日志覆盖全部尝试
// ==========================================

pub mod assign_barcode;
pub mod extract_attributes;
pub mod resolve_product;
pub mod upsert_variant;
pub mod validate_row;

pub use assign_barcode::AssignBarcodeAction;
pub use extract_attributes::ExtractAttributesAction;
pub use resolve_product::ResolveProductAction;
pub use upsert_variant::UpsertVariantAction;
pub use validate_row::ValidateRowAction;

use crate::config::ImportConfig;
use crate::pipeline::{
    ErrorHandlingMiddleware, LoggingMiddleware, Pipeline, PipelineBuilder, TimingMiddleware,
};
use crate::repository::{CatalogRepository, UnitOfWork};
use std::sync::Arc;

pub const DEFAULT_PIPELINE_NAME: &str = "product_import";

/// 按导入配置组装中间件（外 → 内）
pub fn with_default_middleware(
    builder: PipelineBuilder,
    config: &ImportConfig,
    unit_of_work: Arc<dyn UnitOfWork>,
) -> PipelineBuilder {
    builder
        .middleware(LoggingMiddleware::new(config.logging.clone()))
        .middleware(TimingMiddleware::from_seconds(config.timeout_seconds))
        .middleware(
            ErrorHandlingMiddleware::new(config.error_handling.clone()).with_unit_of_work(unit_of_work),
        )
}

/// 标准商品导入管道
pub fn default_pipeline(
    config: &ImportConfig,
    repo: Arc<dyn CatalogRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
) -> Pipeline {
    with_default_middleware(Pipeline::builder(DEFAULT_PIPELINE_NAME), config, unit_of_work)
        .action(ValidateRowAction::new(config.required_fields.clone()))
        .action(ExtractAttributesAction::new())
        .action(ResolveProductAction::new(repo.clone(), config.import_mode))
        .optional_action(AssignBarcodeAction::new(repo.clone(), config.allocate_barcodes))
        .action(UpsertVariantAction::new(repo, config.import_mode))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteCatalogRepository;

    #[test]
    fn test_default_pipeline_order() {
        let repo = Arc::new(SqliteCatalogRepository::in_memory().unwrap());
        let pipeline = default_pipeline(&ImportConfig::default(), repo.clone(), repo);

        assert_eq!(
            pipeline.action_names(),
            vec![
                "validate_row",
                "extract_attributes",
                "resolve_product",
                "assign_barcode",
                "upsert_variant"
            ]
        );
        assert_eq!(
            pipeline.middleware_names(),
            vec!["logging", "timing", "error_handling"]
        );
    }
}
