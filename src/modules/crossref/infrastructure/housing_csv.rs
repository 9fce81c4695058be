//! Raw rows of the public-housing CSV. Parsing into typed records happens
//! in the workers so one bad row never stops the load.

use crate::shared::errors::AppResult;
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

/// One data row and its 1-based line number in the file.
#[derive(Debug, Clone)]
pub struct HousingRow {
    pub line: u64,
    pub record: StringRecord,
}

/// Data rows of the file, header skipped, at most `limit` of them.
pub fn load_rows(path: &Path, limit: Option<usize>) -> AppResult<Vec<HousingRow>> {
    load_rows_from(std::fs::File::open(path)?, limit)
}

pub fn load_rows_from<R: Read>(inner: R, limit: Option<usize>) -> AppResult<Vec<HousingRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(inner);

    let mut rows = Vec::new();
    for record in reader.records() {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(HousingRow { line, record });
    }
    Ok(rows)
}
