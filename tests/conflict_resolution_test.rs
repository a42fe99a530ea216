// ==========================================
// 冲突处理集成测试
// ==========================================
// 测试目标: 真实 SQLite 约束触发 → 策略修正 → 行重试
// ==========================================

mod test_helpers;

use pim_import::config::{BarcodeStrategy, ImportConfig, SkuStrategy, VariantStrategy};
use pim_import::conflict::{ConflictType, ResolutionAction};
use pim_import::domain::{ImportMode, RowStatus};
use pim_import::importer::ImportRowProcessor;
use pim_import::logging;
use pim_import::repository::{CatalogRepository, SqliteCatalogRepository};
use serde_json::json;
use std::sync::Arc;
use test_helpers::{memory_repo, row, test_config};

const EAN: &str = "4006381333931";

fn create_only() -> ImportConfig {
    ImportConfig {
        import_mode: ImportMode::CreateOnly,
        ..test_config()
    }
}

fn processor(config: &ImportConfig) -> (ImportRowProcessor, Arc<SqliteCatalogRepository>) {
    let repo = memory_repo();
    (ImportRowProcessor::from_config(config, repo.clone()), repo)
}

/// 第一行占用条码,第二行（不同 SKU、不同颜色）再用同一条码
fn import_barcode_pair(
    strategy: BarcodeStrategy,
) -> (ImportRowProcessor, Arc<SqliteCatalogRepository>, pim_import::importer::RowOutcome) {
    let mut config = create_only();
    config.conflict_resolution.barcode_resolution.strategy = strategy;
    let (mut p, repo) = processor(&config);

    let first = p
        .process_row(1, row(json!({"sku": "A-1", "parent_sku": "A", "barcode": EAN})))
        .unwrap();
    assert_eq!(first.status, RowStatus::Created);

    let second = p
        .process_row(
            2,
            row(json!({"sku": "A-2", "parent_sku": "A", "color": "Blue", "barcode": EAN})),
        )
        .unwrap();
    (p, repo, second)
}

#[test]
fn test_barcode_removed_and_row_retried() {
    logging::init_test();

    let (p, repo, outcome) = import_barcode_pair(BarcodeStrategy::RemoveBarcode);

    assert_eq!(outcome.status, RowStatus::Created);
    assert!(!outcome.data.contains_key("barcode"));
    assert_eq!(outcome.data["original_barcode"], json!(EAN));

    let stored = repo.find_variant_by_sku("A-2").unwrap().unwrap();
    assert!(stored.barcode.is_none());
    assert_eq!(
        repo.find_variant_by_sku("A-1").unwrap().unwrap().barcode.as_deref(),
        Some(EAN)
    );

    let stats = p.stats();
    assert_eq!(stats.total_conflicts, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.by_type.get("duplicate_barcode"), Some(&1));
    assert_eq!(stats.by_strategy.get("remove_barcode"), Some(&1));
}

#[test]
fn test_barcode_reassigned_to_new_row() {
    let (_p, repo, outcome) = import_barcode_pair(BarcodeStrategy::Reassign);

    assert_eq!(outcome.status, RowStatus::Created);
    assert_eq!(
        repo.find_variant_by_sku("A-2").unwrap().unwrap().barcode.as_deref(),
        Some(EAN)
    );
    assert!(repo.find_variant_by_sku("A-1").unwrap().unwrap().barcode.is_none());
}

#[test]
fn test_barcode_skip_leaves_catalog_untouched() {
    let (p, repo, outcome) = import_barcode_pair(BarcodeStrategy::Skip);

    assert_eq!(outcome.status, RowStatus::Skipped);
    assert_eq!(outcome.resolutions.len(), 1);
    assert_eq!(outcome.resolutions[0].action, ResolutionAction::Skip);
    assert!(repo.find_variant_by_sku("A-2").unwrap().is_none());
    assert_eq!(p.stats().skipped, 1);
}

#[test]
fn test_duplicate_sku_update_existing() {
    let mut config = create_only();
    config.conflict_resolution.sku_resolution.strategy = SkuStrategy::UpdateExisting;
    let (mut p, repo) = processor(&config);

    p.process_row(1, row(json!({"sku": "B-1", "parent_sku": "B", "price": "10"})))
        .unwrap();
    let outcome = p
        .process_row(
            2,
            row(json!({"sku": "B-1", "parent_sku": "B", "color": "Blue", "price": "12.5"})),
        )
        .unwrap();

    assert_eq!(outcome.status, RowStatus::Updated);
    assert_eq!(outcome.resolutions[0].conflict_type, ConflictType::DuplicateSku);
    let stored = repo.find_variant_by_sku("B-1").unwrap().unwrap();
    assert_eq!(stored.price, Some(12.5));
    assert_eq!(stored.color.as_deref(), Some("Blue"));
}

#[test]
fn test_duplicate_sku_use_existing_keeps_stored_row() {
    let mut config = create_only();
    config.conflict_resolution.sku_resolution.strategy = SkuStrategy::UseExisting;
    let (mut p, repo) = processor(&config);

    p.process_row(1, row(json!({"sku": "B-1", "parent_sku": "B", "price": "10"})))
        .unwrap();
    let outcome = p
        .process_row(
            2,
            row(json!({"sku": "B-1", "parent_sku": "B", "color": "Blue", "price": "99"})),
        )
        .unwrap();

    assert_eq!(outcome.status, RowStatus::Unchanged);
    let stored = repo.find_variant_by_sku("B-1").unwrap().unwrap();
    assert_eq!(stored.price, Some(10.0));
    assert!(stored.color.is_none());
}

#[test]
fn test_variant_attributes_modified() {
    let mut config = test_config();
    config.conflict_resolution.variant_resolution.strategy = VariantStrategy::ModifyAttributes;
    let (mut p, repo) = processor(&config);

    p.process_row(1, row(json!({"sku": "TEE-RED-S", "parent_sku": "TEE"})))
        .unwrap();
    let outcome = p
        .process_row(
            2,
            row(json!({"sku": "TEE-X", "parent_sku": "TEE", "color": "Red", "size": "S"})),
        )
        .unwrap();

    assert_eq!(outcome.status, RowStatus::Created);
    assert_eq!(outcome.data["size"], json!("S-1"));
    assert_eq!(outcome.data["original_size"], json!("S"));

    let stored = repo.find_variant_by_sku("TEE-X").unwrap().unwrap();
    assert_eq!(stored.color.as_deref(), Some("Red"));
    assert_eq!(stored.size.as_deref(), Some("S-1"));
}

#[test]
fn test_stats_reset_between_batches() {
    let (mut p, _repo, _) = import_barcode_pair(BarcodeStrategy::RemoveBarcode);
    assert!(!p.stats().is_empty());

    p.reset_stats();
    assert!(p.stats().is_empty());
    assert_eq!(p.stats().total_conflicts, 0);
}

#[test]
fn test_conflict_retry_limit_skips_row() {
    let mut config = create_only();
    config.conflict_max_retries = 0;
    let (mut p, repo) = processor(&config);

    p.process_row(1, row(json!({"sku": "C-1", "parent_sku": "C"}))).unwrap();
    let outcome = p
        .process_row(2, row(json!({"sku": "C-1", "parent_sku": "C", "color": "Red"})))
        .unwrap();

    assert_eq!(outcome.status, RowStatus::Skipped);
    assert_eq!(outcome.resolutions[0].action, ResolutionAction::Unresolved);
    assert!(repo.find_variant_by_sku("C-1").unwrap().unwrap().color.is_none());
    assert_eq!(p.stats().unresolved, 1);
}

#[test]
fn test_sku_and_barcode_conflicts_each_rerun_row() {
    let mut config = create_only();
    config.conflict_resolution.sku_resolution.strategy = SkuStrategy::GenerateUnique;
    config.conflict_resolution.barcode_resolution.strategy = BarcodeStrategy::RemoveBarcode;
    let (mut p, repo) = processor(&config);

    p.process_row(1, row(json!({"sku": "D-1", "parent_sku": "D", "barcode": EAN})))
        .unwrap();
    let outcome = p
        .process_row(
            2,
            row(json!({"sku": "D-1", "parent_sku": "D", "color": "Red", "barcode": EAN})),
        )
        .unwrap();

    assert_eq!(outcome.status, RowStatus::Created);
    assert_eq!(outcome.resolutions.len(), 2);
    // SQLite 同时命中多个唯一索引时只报其一,两次冲突各自触发一次重跑
    let mut types: Vec<ConflictType> = outcome.resolutions.iter().map(|r| r.conflict_type).collect();
    types.sort();
    assert_eq!(types, vec![ConflictType::DuplicateSku, ConflictType::DuplicateBarcode]);
    assert!(outcome
        .resolutions
        .iter()
        .all(|r| r.action == ResolutionAction::Retry));

    let stored = repo.find_variant_by_sku("D-1-1").unwrap().unwrap();
    assert!(stored.barcode.is_none());
    assert_eq!(stored.color.as_deref(), Some("Red"));
    assert_eq!(
        repo.find_variant_by_sku("D-1").unwrap().unwrap().barcode.as_deref(),
        Some(EAN)
    );
    assert_eq!(p.stats().resolved, 2);
}
