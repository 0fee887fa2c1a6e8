// ==========================================
// 个人数据导入管道 - 命令行入口
// ==========================================
// 用法: pdi [--db PATH] [--provider NAME] [--json] [--locale L] FILES...
// 每个文件的导入结果以 JSON 行输出到 stdout
// ==========================================

use clap::Parser;
use personal_data_import::config::config_keys;
use personal_data_import::db::{get_default_db_path, open_sqlite_connection};
use personal_data_import::{
    logging, ConfigManager, ContentKind, DataImporter, DataImporterImpl, ImportOptions,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[derive(Debug, Parser)]
#[command(name = "pdi", version, about = "导入个人数据导出文件到本地 SQLite")]
struct Cli {
    /// 数据库路径（默认: $PDI_DB_PATH 或用户数据目录）
    #[arg(long)]
    db: Option<PathBuf>,

    /// 指定 Provider（跳过格式识别）: pge, tesla, sfcu, withings, google_timeline
    #[arg(long)]
    provider: Option<String>,

    /// 按 JSON 解码（默认按 .json 后缀判断）
    #[arg(long)]
    json: bool,

    /// 结果消息语言（写入配置）
    #[arg(long)]
    locale: Option<String>,

    /// JSON 格式日志
    #[arg(long)]
    log_json: bool,

    /// 待导入文件
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(cli).await {
        Ok(all_completed) => {
            if all_completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "导入失败");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, version = personal_data_import::VERSION, "使用数据库");

    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));
    let importer = DataImporterImpl::new(conn.clone(), ConfigManager::from_connection(conn.clone()))?;

    if let Some(locale) = &cli.locale {
        ConfigManager::from_connection(conn.clone())
            .set_global_config_value(config_keys::LOCALE, locale)?;
    }

    let mut options = ImportOptions::default();
    if let Some(provider) = cli.provider {
        options = options.with_provider(provider);
    }
    if cli.json {
        options = options.with_content_kind(ContentKind::Json);
    }

    let summaries = importer.import_files(cli.files, options).await;
    let mut all_completed = true;
    for summary in &summaries {
        all_completed &= summary.is_completed();
        println!("{}", serde_json::to_string(summary)?);
    }
    Ok(all_completed)
}
