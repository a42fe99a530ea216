// ==========================================
// PIM 商品导入系统 - 命令行入口
// ==========================================
// 用法:
//   pim-import <db_path> <file> [config.json]
// 未给配置文件时从数据库 config_kv 读取导入配置
// 汇总以 JSON 输出到 stdout
// ==========================================

use anyhow::{bail, Context};
use pim_import::{logging, BatchImporter, ConfigManager, ImportConfig, SqliteCatalogRepository};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (Some(db_path), Some(file_path)) = (args.next(), args.next()) else {
        bail!("用法: pim-import <db_path> <file> [config.json]");
    };
    let config_path = args.next();

    tracing::info!("{} v{}", pim_import::APP_NAME, pim_import::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let repo = Arc::new(
        SqliteCatalogRepository::new(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?,
    );

    let config = match config_path {
        Some(path) => ImportConfig::from_file(&path)
            .with_context(|| format!("无法加载配置文件: {}", path))?,
        None => ConfigManager::from_connection(repo.connection())?.get_import_config()?,
    };

    let mut importer = BatchImporter::new(config, repo);
    let summary = importer
        .import_file(&file_path)
        .with_context(|| format!("导入失败: {}", file_path))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
