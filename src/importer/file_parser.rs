// ==========================================
// PIM 商品导入系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 约定: 首行为表头;完全空白的行跳过;单元格去首尾空白
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// RawRecord - 未映射的原始行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub row_number: usize,              // 数据行序号（从 1 开始,空白行也计数）
    pub fields: Vec<(String, String)>,  // (表头, 值),保持列顺序
}

impl RawRecord {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }
}

/// 解析结果: 表头 + 数据行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSheet {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn build_record(headers: &[String], row_number: usize, values: Vec<String>) -> RawRecord {
    let fields = headers
        .iter()
        .zip(values)
        .filter(|(h, _)| !h.is_empty())
        .map(|(h, v)| (h.clone(), v))
        .collect();
    RawRecord { row_number, fields }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let values = record.iter().map(|v| v.trim().to_string()).collect();
            let raw = build_record(&headers, idx + 1, values);

            if raw.is_blank() {
                continue;
            }
            records.push(raw);
        }

        Ok(ParsedSheet { headers, records })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 只读第一个 sheet
        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(ParsedSheet::default());
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let values = data_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();
            let raw = build_record(&headers, idx + 1, values);

            if raw.is_blank() {
                continue;
            }
            records.push(raw);
        }

        Ok(ParsedSheet { headers, records })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path),
            "xlsx" | "xls" => ExcelParser.parse(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
