// ==========================================
// PIM 商品导入系统 - 批次导入器
// ==========================================
// 流程:
//   解析文件 → 字段映射 → SKU 模式分析（补齐 parent_sku / parent_name）
//   → 逐行处理 → 汇总 ImportSummary
// 批次开始时重置冲突统计
// ==========================================

use crate::analysis::{SkuPatternAnalyzer, SkuPatternResult};
use crate::config::ImportConfig;
use crate::conflict::ResolutionStats;
use crate::domain::RowStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use crate::importer::row_processor::{ImportRowProcessor, RowOutcome};
use crate::repository::{CatalogRepository, UnitOfWork};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportSummary - 批次汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<RowError>,
    pub conflict_stats: ResolutionStats,
    pub sku_pattern: Option<SkuPatternResult>,
    pub elapsed_ms: u64,
}

/// 行级错误/告警条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row_number: usize,
    pub status: RowStatus,
    pub message: String,
}

impl ImportSummary {
    fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            total_rows: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            conflict_stats: ResolutionStats::default(),
            sku_pattern: None,
            elapsed_ms: 0,
        }
    }

    fn record(&mut self, outcome: &RowOutcome) {
        self.total_rows += 1;
        match outcome.status {
            RowStatus::Created => self.created += 1,
            RowStatus::Updated => self.updated += 1,
            RowStatus::Unchanged => self.unchanged += 1,
            RowStatus::Skipped => self.skipped += 1,
            RowStatus::Failed => self.failed += 1,
        }

        if let Some(message) = &outcome.message {
            self.errors.push(RowError {
                row_number: outcome.row_number,
                status: outcome.status,
                message: message.clone(),
            });
        }
        for warning in &outcome.warnings {
            self.warnings.push(RowError {
                row_number: outcome.row_number,
                status: outcome.status,
                message: warning
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

// ==========================================
// BatchImporter
// ==========================================
pub struct BatchImporter {
    config: ImportConfig,
    processor: ImportRowProcessor,
    parser: UniversalFileParser,
    mapper: FieldMapper,
    analyzer: SkuPatternAnalyzer,
}

impl BatchImporter {
    pub fn new<R>(config: ImportConfig, repo: Arc<R>) -> Self
    where
        R: CatalogRepository + UnitOfWork + 'static,
    {
        let processor = ImportRowProcessor::from_config(&config, repo);
        Self::with_processor(config, processor)
    }

    /// 使用自定义行处理器（自定义管道/中间件）
    pub fn with_processor(config: ImportConfig, processor: ImportRowProcessor) -> Self {
        Self {
            config,
            processor,
            parser: UniversalFileParser,
            mapper: FieldMapper::new(),
            analyzer: SkuPatternAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 导入文件（.csv / .xlsx / .xls）
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(&mut self, file_path: P) -> ImportResult<ImportSummary> {
        let sheet = self.parser.parse(file_path.as_ref())?;

        if !sheet.records.is_empty() && !self.mapper.has_field(&sheet.headers, "sku") {
            return Err(ImportError::MissingColumn("sku".to_string()));
        }

        let rows = sheet
            .records
            .iter()
            .map(|record| (record.row_number, self.mapper.map_record(record)))
            .collect();
        self.import_rows(rows)
    }

    /// 导入已映射的行 (row_number, data)
    pub fn import_rows(&mut self, rows: Vec<(usize, Map<String, Value>)>) -> ImportResult<ImportSummary> {
        let timer = Instant::now();
        let mut summary = ImportSummary::new();
        let mut rows = rows;

        self.processor.reset_stats();
        info!(batch_id = %summary.batch_id, rows = rows.len(), "开始导入批次");

        if self.config.analyze_sku_patterns {
            let pattern = self.analyze_batch(&rows);
            if pattern.has_pattern {
                apply_pattern(&pattern, &mut rows);
            }
            summary.sku_pattern = Some(pattern);
        }

        for (row_number, data) in rows {
            let outcome = match self.processor.process_row(row_number, data) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(batch_id = %summary.batch_id, row_number, error = %err, "批次中止");
                    return Err(err);
                }
            };
            summary.record(&outcome);
        }

        summary.conflict_stats = self.processor.stats().clone();
        summary.elapsed_ms = timer.elapsed().as_millis() as u64;

        info!(
            batch_id = %summary.batch_id,
            total = summary.total_rows,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            conflicts = summary.conflict_stats.total_conflicts,
            elapsed_ms = summary.elapsed_ms,
            "批次导入完成"
        );
        Ok(summary)
    }

    fn analyze_batch(&self, rows: &[(usize, Map<String, Value>)]) -> SkuPatternResult {
        let skus: Vec<&str> = rows
            .iter()
            .filter_map(|(_, data)| data.get("sku").and_then(Value::as_str))
            .collect();
        self.analyzer.analyze(&skus)
    }
}

/// 为缺少 parent_sku / parent_name 的行补上模式分析给出的分组
fn apply_pattern(pattern: &SkuPatternResult, rows: &mut [(usize, Map<String, Value>)]) {
    for (_, data) in rows.iter_mut() {
        if data.contains_key("parent_sku") {
            continue;
        }
        let Some(group) = data
            .get("sku")
            .and_then(Value::as_str)
            .and_then(|sku| pattern.group_of(sku.trim()))
            .map(str::to_string)
        else {
            continue;
        };

        if !data.contains_key("parent_name") {
            data.insert(
                "parent_name".to_string(),
                Value::from(pattern.parent_name_for(&group)),
            );
        }
        data.insert("parent_sku".to_string(), Value::from(group));
    }
}
