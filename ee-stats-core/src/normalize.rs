//! Header rewriting, row normalization and sorting of the combined CSV.
//!
//! The header is never sorted. Rows are sorted as plain strings, so `10`
//! sorts before `9`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, error, info};

use crate::contract::NormalizeReport;
use crate::errors::PipelineError;

pub const DATASET_COLUMN: &str = "Dataset";
pub const DATASET_COLUMNS: &str = "Folder,Project,Type,Product,Version,ImageCollection";
pub const INTERVAL_COLUMN: &str = "Interval";
pub const INTERVAL_COLUMNS: &str = "Start,End";

const PATH_SEPARATOR: char = '/';
const FIELD_DELIMITER: &str = ",";

/// Expand the `Dataset` and `Interval` column groups. Plain substring
/// replacement, applied everywhere in the line.
pub fn normalize_header(header: &str) -> String {
    header
        .replace(DATASET_COLUMN, DATASET_COLUMNS)
        .replace(INTERVAL_COLUMN, INTERVAL_COLUMNS)
}

/// Turn every `/` into a field delimiter.
pub fn normalize_row(row: &str) -> String {
    row.replace(PATH_SEPARATOR, FIELD_DELIMITER)
}

/// Split `content` into a normalized header and the sorted, normalized rows.
/// Blank data rows are dropped rather than sorted to the top of the body.
/// Returns `None` for empty content.
pub fn normalize_content(content: &str) -> Option<(String, Vec<String>)> {
    let mut lines = content.lines();
    let header = lines.next()?;
    let mut rows: Vec<String> = lines
        .filter(|line| !line.is_empty())
        .map(normalize_row)
        .collect();
    rows.sort_unstable();
    Some((normalize_header(header), rows))
}

/// Rewrite `path` in place: normalized header first, then the sorted rows,
/// each terminated by `\n`. An empty file is left empty.
pub fn normalize_and_sort(path: &Path) -> Result<NormalizeReport, PipelineError> {
    let wrap = |source: io::Error| {
        error!(error = ?source, path = %path.display(), "Failed to normalize combined file");
        PipelineError::Normalize {
            path: path.to_path_buf(),
            source,
        }
    };

    let content = fs::read_to_string(path).map_err(wrap)?;
    let Some((header, rows)) = normalize_content(&content) else {
        info!(path = %path.display(), "[NORMALIZE] Combined file is empty, nothing to sort");
        return Ok(NormalizeReport {
            rows: 0,
            output: path.to_path_buf(),
        });
    };
    debug!(header = %header, rows = rows.len(), "Normalized header and rows");

    write_sorted(path, &header, &rows).map_err(wrap)?;

    info!(path = %path.display(), rows = rows.len(), "[NORMALIZE] Sorted combined file");
    Ok(NormalizeReport {
        rows: rows.len(),
        output: path.to_path_buf(),
    })
}

fn write_sorted(path: &Path, header: &str, rows: &[String]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut out = io::BufWriter::new(tmp.as_file_mut());
        writeln!(out, "{header}")?;
        for row in rows {
            writeln!(out, "{row}")?;
        }
        out.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
