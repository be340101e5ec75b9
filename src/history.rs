//! Historical Dataset
//!
//! 初期学習用の過去の取引額をCSVから読み込む

use crate::error::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// CSVから数値列を読み込む
///
/// `column` を省略した場合は、数値として解釈できる列を持つ最初のレコードで列を決める。
/// 列数がヘッダーと合わない行、UTF-8でない行、数値として解釈できない行は読み飛ばす。
pub fn load_history(path: &Path, column: Option<&str>) -> Result<Vec<f64>> {
    let file = File::open(path).map_err(|e| {
        Error::DataSource(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .byte_headers()
        .map_err(|e| read_error(path, e))?
        .clone();
    let width = headers.len();

    let mut col_idx = match column {
        Some(name) => Some(
            headers
                .iter()
                .position(|h| std::str::from_utf8(h).map(str::trim) == Ok(name))
                .ok_or_else(|| {
                    Error::DataSource(format!("column '{}' not found in {}", name, path.display()))
                })?,
        ),
        None => None,
    };

    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;
    for record in reader.byte_records() {
        let record = record.map_err(|e| read_error(path, e))?;
        rows += 1;
        if record.len() != width {
            skipped += 1;
            continue;
        }

        let idx = match col_idx {
            Some(idx) => idx,
            None => match record.iter().position(|f| parse_field(f).is_some()) {
                Some(idx) => {
                    debug!(column = idx, "reading historical values");
                    col_idx = Some(idx);
                    idx
                }
                None => {
                    skipped += 1;
                    continue;
                }
            },
        };

        match record.get(idx).and_then(parse_field) {
            Some(v) => values.push(v),
            None => skipped += 1,
        }
    }

    if rows == 0 {
        return Err(Error::DataSource(format!(
            "{} contains no data rows",
            path.display()
        )));
    }
    if col_idx.is_none() {
        return Err(Error::DataSource(format!(
            "no numeric column in {}",
            path.display()
        )));
    }
    if values.is_empty() {
        return Err(Error::DataSource(format!(
            "no usable values in {}",
            path.display()
        )));
    }

    info!(
        values = values.len(),
        skipped,
        "loaded historical dataset from {}",
        path.display()
    );
    Ok(values)
}

/// 有限の数値として解釈できるフィールドのみ値を返す
fn parse_field(field: &[u8]) -> Option<f64> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn read_error(path: &Path, e: csv::Error) -> Error {
    Error::DataSource(format!("cannot read {}: {}", path.display(), e))
}
