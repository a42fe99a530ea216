// ==========================================
// PIM 商品导入系统 - 导入层
// ==========================================
// 职责: 外部文件 → 行数据 → 管道处理 → 批次汇总
// 支持: Excel, CSV
// ==========================================

pub mod batch_importer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod row_processor;

// 重导出核心类型
pub use batch_importer::{BatchImporter, ImportSummary, RowError};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, ParsedSheet, RawRecord, UniversalFileParser};
pub use row_processor::{ImportRowProcessor, RowOutcome};
