// ==========================================
// 个人数据导入管道 - 导入协调器实现
// ==========================================
// 流程: 解码 → 剥离横幅 → 分词 / JSON 解码 → 格式识别
//       → 逐条映射 + 对账（单事务）→ 汇总 → 记录批次
// 约束:
// - 文件级失败返回零进度结果，不返回错误
// - 行级失败计入 error_count 后继续
// - 事务提交失败则整个文件回滚，已处理行全部计为错误
// ==========================================

use crate::config::ImportConfigReader;
use crate::db::ensure_schema;
use crate::domain::import::{ImportBatch, ImportOptions, ImportOutcome, ImportSummary, RowTally};
use crate::domain::record::{ParsedDocument, SourceItem};
use crate::domain::types::ContentKind;
use crate::i18n::t_in;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::format_selector::select_mapper;
use crate::importer::provider_trait::{DataImporter, MappingContext, ProviderMapper};
use crate::importer::providers::ProviderRegistry;
use crate::importer::reconciler::{ReconcileAction, Reconciler};
use crate::importer::time_parser::LocalZone;
use crate::importer::tokenizer::parse_rows;
use crate::repository::import_batch_repo::ImportBatchRepository;
use crate::repository::record_store::{RecordStore, SqliteRecordStore};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const BOM: char = '\u{feff}';

// ==========================================
// DataImporterImpl - 导入协调器
// ==========================================
pub struct DataImporterImpl<C>
where
    C: ImportConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: C,
    registry: ProviderRegistry,
    batch_repo: ImportBatchRepository,
}

/// 单个文件的落库结果
struct PersistOutcome {
    tally: RowTally,
    /// 提交失败（此时事务已回滚）
    commit_error: Option<ImportError>,
}

/// 单个文件的语言与映射上下文
struct FileContext {
    locale: String,
    mapping: MappingContext,
}

impl<C> DataImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建导入协调器（默认 Provider 注册表）
    ///
    /// # 参数
    /// - conn: 共享数据库连接
    /// - config: 配置读取器
    pub fn new(conn: Arc<Mutex<Connection>>, config: C) -> ImportResult<Self> {
        Self::with_registry(conn, config, ProviderRegistry::default())
    }

    /// 使用自定义 Provider 注册表创建
    pub fn with_registry(
        conn: Arc<Mutex<Connection>>,
        config: C,
        registry: ProviderRegistry,
    ) -> ImportResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ImportError::Internal(format!("锁获取失败: {}", e)))?;
            ensure_schema(&guard)?;
        }

        Ok(Self {
            batch_repo: ImportBatchRepository::new(conn.clone()),
            conn,
            config,
            registry,
        })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn batch_repository(&self) -> &ImportBatchRepository {
        &self.batch_repo
    }

    /// 读取本次导入的配置；读取失败时使用默认值
    async fn load_context(&self) -> FileContext {
        let default_account_id = self.config.get_default_account_id().await.unwrap_or_else(|e| {
            warn!(error = %e, "默认账户读取失败，使用 1");
            1
        });
        let zone = self.config.get_local_zone().await.unwrap_or_else(|e| {
            warn!(error = %e, "时区配置读取失败，使用系统时区");
            LocalZone::System
        });
        let locale = self.config.get_locale().await.unwrap_or_else(|e| {
            warn!(error = %e, "语言配置读取失败，使用 en");
            "en".to_string()
        });

        FileContext {
            locale,
            mapping: MappingContext {
                zone,
                default_account_id,
            },
        }
    }

    /// 剥离真实表头之前的横幅文本
    ///
    /// 任一 Provider 声明的表头签名出现在非首行的行首时，从该处截断
    fn strip_preamble<'t>(&self, text: &'t str) -> &'t str {
        for signature in self.registry.iter().filter_map(|m| m.header_signature()) {
            let mut offset = 0;
            for line in text.split_inclusive('\n') {
                if offset > 0 && line.trim_start_matches(BOM).starts_with(signature) {
                    debug!(signature, offset, "剥离表头前横幅");
                    return &text[offset..];
                }
                offset += line.len();
            }
        }
        text
    }

    /// 解码为文档
    fn decode(&self, content: &[u8], kind: ContentKind) -> ImportResult<ParsedDocument> {
        let text = std::str::from_utf8(content)?;
        let text = text.strip_prefix(BOM).unwrap_or(text);

        match kind {
            ContentKind::Json => {
                if text.trim().is_empty() {
                    return Ok(ParsedDocument::Json(serde_json::Value::Null));
                }
                Ok(ParsedDocument::Json(serde_json::from_str(text)?))
            }
            ContentKind::Tabular => {
                let text = self.strip_preamble(text);
                Ok(ParsedDocument::Rows(parse_rows(text)?))
            }
        }
    }

    /// 单事务内映射并对账全部条目
    fn persist(
        &self,
        mapper: &dyn ProviderMapper,
        items: &[SourceItem],
        ctx: &MappingContext,
    ) -> ImportResult<PersistOutcome> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::Internal(format!("锁获取失败: {}", e)))?;
        let tx = conn.unchecked_transaction()?;

        let tally = {
            let reconciler = Reconciler::new(SqliteRecordStore::new(&tx));
            reconcile_items(mapper, items, ctx, &reconciler)
        };

        let commit_error = tx.commit().err().map(|e| {
            warn!(error = %e, "事务提交失败，文件已回滚");
            ImportError::from(e)
        });

        Ok(PersistOutcome {
            tally,
            commit_error,
        })
    }

    /// 记录导入批次；失败只记日志
    fn record_batch(&self, file_name: &str, summary: &ImportSummary, updated: usize) {
        let batch = ImportBatch {
            batch_id: summary.batch_id.clone(),
            file_name: file_name.to_string(),
            provider: summary.provider.clone(),
            outcome: summary.outcome,
            success_rows: summary.success_count as i64,
            error_rows: summary.error_count as i64,
            skipped_rows: summary.skipped_count as i64,
            updated_rows: updated as i64,
            elapsed_ms: summary.elapsed_ms as i64,
            imported_at: Utc::now(),
        };
        if let Err(e) = self.batch_repo.insert_batch(&batch) {
            warn!(batch_id = %summary.batch_id, error = %e, "导入批次记录失败");
        }
    }

    /// 文件级失败的零进度结果
    fn file_failure(
        &self,
        file_name: &str,
        batch_id: &str,
        started: Instant,
        outcome: ImportOutcome,
        message: String,
    ) -> ImportSummary {
        let mut summary = ImportSummary::zero_progress(batch_id, outcome, message);
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        self.record_batch(file_name, &summary, 0);
        summary
    }
}

/// 逐条映射并对账，返回计数
///
/// # 规则
/// - 映射返回 None 或记录缺少时间戳 → skipped
/// - 映射错误、固定表不符、落库错误 → errors，继续下一条
/// - 插入与更新均计为 success
pub(crate) fn reconcile_items<S: RecordStore>(
    mapper: &dyn ProviderMapper,
    items: &[SourceItem],
    ctx: &MappingContext,
    reconciler: &Reconciler<S>,
) -> RowTally {
    let mut tally = RowTally::default();

    for (idx, item) in items.iter().enumerate() {
        let row_number = idx + 1;

        let record = match mapper.map_row(item, ctx) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tally.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(row_number, provider = mapper.name(), error = %e, "行映射失败");
                tally.errors += 1;
                continue;
            }
        };

        if record.timestamp().is_none() {
            tally.skipped += 1;
            continue;
        }

        if let Some(expected) = mapper.table() {
            if expected != record.table {
                let e = ImportError::RowMapping {
                    row: row_number,
                    message: format!("记录目标表 {} 与 Provider 固定表 {} 不符", record.table, expected),
                };
                warn!(row_number, error = %e, "行映射失败");
                tally.errors += 1;
                continue;
            }
        }

        let defaults = mapper.insert_defaults(record.table);
        match reconciler.reconcile(&record, &defaults) {
            Ok(ReconcileAction::Inserted(_)) => tally.success += 1,
            Ok(ReconcileAction::Updated(_)) | Ok(ReconcileAction::Unchanged(_)) => {
                tally.success += 1;
                tally.updated += 1;
            }
            Err(source) => {
                let e = ImportError::persistence(record.table.as_str(), source);
                warn!(row_number, table = %record.table, error = %e, "落库失败");
                tally.errors += 1;
            }
        }
    }

    tally
}

#[async_trait]
impl<C> DataImporter for DataImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, content, options), fields(batch_id = tracing::field::Empty, size = content.len()))]
    async fn import(&self, filename: &str, content: &[u8], options: ImportOptions) -> ImportSummary {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(file = %filename, "开始导入文件");

        let ctx = self.load_context().await;
        let locale = ctx.locale.as_str();

        // === 步骤 1: 解码 ===
        let kind = options.resolve_content_kind(filename);
        debug!(?kind, "步骤 1: 解码");
        let document = match self.decode(content, kind) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "文件解码失败");
                let message = t_in(locale, "import.parse_failed", &[("error", &e.to_string())]);
                return self.file_failure(
                    filename,
                    &batch_id,
                    started,
                    ImportOutcome::ContainerParseError,
                    message,
                );
            }
        };

        if document.is_empty() {
            info!("文件为空");
            let message = t_in(locale, "import.empty_file", &[]);
            return self.file_failure(filename, &batch_id, started, ImportOutcome::Empty, message);
        }

        // === 步骤 2: 格式识别 ===
        debug!("步骤 2: 格式识别");
        let mapper = match select_mapper(&self.registry, &document, options.provider.as_deref()) {
            Ok(mapper) => mapper,
            Err(e) => {
                info!(error = %e, "无法识别文件格式");
                let message = t_in(locale, "import.unknown_format", &[]);
                return self.file_failure(
                    filename,
                    &batch_id,
                    started,
                    ImportOutcome::UnknownFormat,
                    message,
                );
            }
        };
        info!(provider = mapper.name(), "识别到文件格式");

        // === 步骤 3: 映射 + 对账 ===
        let items = mapper.extract_items(document);
        debug!(items = items.len(), "步骤 3: 映射与对账");
        let outcome = match self.persist(mapper, &items, &ctx.mapping) {
            Ok(outcome) => outcome,
            Err(e) => PersistOutcome {
                tally: RowTally::default(),
                commit_error: Some(e),
            },
        };

        // === 步骤 4: 汇总 ===
        let tally = outcome.tally;
        let mut summary = match outcome.commit_error {
            None => ImportSummary {
                success_count: tally.success,
                error_count: tally.errors,
                skipped_count: tally.skipped,
                message: t_in(
                    locale,
                    "import.summary",
                    &[
                        ("provider", mapper.display_name()),
                        ("processed", &tally.success.to_string()),
                        ("errors", &tally.errors.to_string()),
                    ],
                ),
                outcome: ImportOutcome::Completed,
                provider: Some(mapper.name().to_string()),
                batch_id: batch_id.clone(),
                elapsed_ms: 0,
            },
            Some(e) => ImportSummary {
                success_count: 0,
                error_count: tally.processed(),
                skipped_count: 0,
                message: t_in(locale, "import.aborted", &[("error", &e.to_string())]),
                outcome: ImportOutcome::Aborted,
                provider: Some(mapper.name().to_string()),
                batch_id: batch_id.clone(),
                elapsed_ms: 0,
            },
        };
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        let updated = if summary.is_completed() { tally.updated } else { 0 };
        self.record_batch(filename, &summary, updated);

        info!(
            provider = mapper.name(),
            success = summary.success_count,
            errors = summary.error_count,
            skipped = summary.skipped_count,
            updated,
            elapsed_ms = summary.elapsed_ms,
            "文件导入完成"
        );
        summary
    }

    async fn import_path<P: AsRef<Path> + Send>(
        &self,
        path: P,
        options: ImportOptions,
    ) -> ImportSummary {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        match tokio::fs::read(path).await {
            Ok(content) => self.import(&filename, &content, options).await,
            Err(e) => {
                let e = ImportError::from(e);
                warn!(path = %path.display(), error = %e, "文件读取失败");
                let locale = self.load_context().await.locale;
                let batch_id = Uuid::new_v4().to_string();
                let message = t_in(&locale, "import.read_failed", &[("error", &e.to_string())]);
                self.file_failure(
                    &filename,
                    &batch_id,
                    Instant::now(),
                    ImportOutcome::ContainerParseError,
                    message,
                )
            }
        }
    }

    async fn import_files<P: AsRef<Path> + Send + Sync>(
        &self,
        paths: Vec<P>,
        options: ImportOptions,
    ) -> Vec<ImportSummary> {
        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            let summary = self.import_path(path.as_ref(), options.clone()).await;
            summaries.push(summary);
            tokio::task::yield_now().await;
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::CanonicalRecord;
    use crate::domain::types::Table;
    use crate::importer::providers::{SfcuMapper, WithingsMapper};
    use crate::importer::tokenizer::parse_rows;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use rusqlite::types::Value;

    /// 写入一律失败的存储
    struct RejectingStore;

    impl RecordStore for RejectingStore {
        fn find_row_id(&self, _: Table, _: &[(&str, &Value)]) -> RepositoryResult<Option<i64>> {
            Ok(None)
        }

        fn insert_row(&self, _: Table, _: &[(&str, Value)]) -> RepositoryResult<i64> {
            Err(RepositoryError::ConstraintViolation("CHECK constraint failed".into()))
        }

        fn update_row(&self, _: Table, _: i64, _: &[(&str, Value)]) -> RepositoryResult<usize> {
            Err(RepositoryError::ConstraintViolation("CHECK constraint failed".into()))
        }

        fn count_rows(&self, _: Table) -> RepositoryResult<i64> {
            Ok(0)
        }
    }

    fn items(csv: &str) -> Vec<SourceItem> {
        parse_rows(csv).unwrap().into_iter().map(SourceItem::Row).collect()
    }

    #[test]
    fn test_persistence_errors_are_tallied() {
        let rows = items("Date,Weight (kg)\n2026-01-10 08:00:00,75.5\n2026-01-11 08:00:00,75.7\n");
        let tally = reconcile_items(
            &WithingsMapper,
            &rows,
            &MappingContext::default(),
            &Reconciler::new(RejectingStore),
        );
        assert_eq!(tally.errors, 2);
        assert_eq!(tally.success, 0);
    }

    #[test]
    fn test_mapping_errors_and_skips_are_tallied() {
        let rows = items(
            "Account Number,Post Date,Check,Description,Debit,Credit\n\
1,11/28/2025,,ok,1.00,\n\
1,11/27/2025,,bad,12x,\n\
1,not a date,,skip,1.00,\n",
        );
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let tally = reconcile_items(
            &SfcuMapper,
            &rows,
            &MappingContext::default(),
            &Reconciler::new(SqliteRecordStore::new(&conn)),
        );
        assert_eq!(
            tally,
            RowTally {
                success: 1,
                errors: 1,
                skipped: 1,
                updated: 0
            }
        );
    }

    /// 声明固定表却产出其他表记录的 Mapper
    struct MismatchedMapper;

    impl ProviderMapper for MismatchedMapper {
        fn name(&self) -> &'static str {
            "mismatched"
        }
        fn display_name(&self) -> &'static str {
            "MismatchedImporter"
        }
        fn detect(&self, _: &ParsedDocument) -> bool {
            true
        }
        fn map_row(&self, _: &SourceItem, _: &MappingContext) -> ImportResult<Option<CanonicalRecord>> {
            Ok(Some(CanonicalRecord::new(Table::Weight, 1).with("weight_kg", 1.0)))
        }
        fn table(&self) -> Option<Table> {
            Some(Table::Height)
        }
    }

    #[test]
    fn test_fixed_table_mismatch_is_row_error() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let tally = reconcile_items(
            &MismatchedMapper,
            &items("a\n1\n"),
            &MappingContext::default(),
            &Reconciler::new(SqliteRecordStore::new(&conn)),
        );
        assert_eq!(tally.errors, 1);
        assert_eq!(tally.success, 0);
    }
}
