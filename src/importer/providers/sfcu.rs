// ==========================================
// 信用社账户流水（AccountHistory.csv）
// ==========================================
// 列: Account Number,Post Date,Check,Description,Debit,Credit,Status,Balance
// 金额: Debit 记为负数，Credit 记为正数
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedDocument, SourceItem};
use crate::domain::types::Table;
use crate::importer::data_cleaner::{normalize_null, parse_f64};
use crate::importer::error::ImportResult;
use crate::importer::provider_trait::{MappingContext, ProviderMapper};
use crate::importer::time_parser::parse_timestamp_millis;

pub struct SfcuMapper;

impl ProviderMapper for SfcuMapper {
    fn name(&self) -> &'static str {
        "sfcu"
    }

    fn display_name(&self) -> &'static str {
        "SfcuImporter"
    }

    fn detect(&self, document: &ParsedDocument) -> bool {
        document
            .first_row()
            .map(|row| {
                row.contains("Account Number")
                    && row.contains("Post Date")
                    && row.contains("Description")
            })
            .unwrap_or(false)
    }

    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>> {
        let Some(row) = item.as_row() else {
            return Ok(None);
        };
        let Some(timestamp) = row
            .get("Post Date")
            .and_then(|v| parse_timestamp_millis(v, &ctx.zone))
        else {
            return Ok(None);
        };

        let amount = if normalize_null(row.get("Debit")).is_some() {
            parse_f64(row.get("Debit"), "Debit")?.map(|v| -v)
        } else {
            parse_f64(row.get("Credit"), "Credit")?
        }
        .unwrap_or(0.0);

        Ok(Some(
            CanonicalRecord::new(Table::Transactions, timestamp)
                .with("description", row.get("Description").map(str::to_string))
                .with("amount", amount)
                .with("account_id", ctx.default_account_id),
        ))
    }

    fn table(&self) -> Option<Table> {
        Some(Table::Transactions)
    }
}
