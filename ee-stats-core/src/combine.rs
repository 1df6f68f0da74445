use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::contract::CombineReport;
use crate::errors::PipelineError;

/// Concatenate every regular file in `data_dir` whose name starts with
/// `prefix` into `output`.
///
/// Files are taken in lexicographic name order. The first file is copied as
/// is; in every later file, lines starting with `header_marker` are dropped
/// so the output carries a single header. With no matching files the output
/// is an empty file.
pub fn combine_files(
    data_dir: &Path,
    output: &Path,
    prefix: &str,
    header_marker: &str,
) -> Result<CombineReport, PipelineError> {
    let wrap = |source: io::Error| {
        error!(error = ?source, output = %output.display(), "Failed to combine files");
        PipelineError::Combine {
            path: output.to_path_buf(),
            source,
        }
    };

    let inputs = matching_files(data_dir, prefix).map_err(wrap)?;
    info!(
        data_dir = %data_dir.display(),
        prefix,
        files = inputs.len(),
        "[COMBINE] Combining files"
    );

    write_combined(&inputs, output, header_marker).map_err(wrap)?;

    info!(
        "Combined {} files into {}",
        inputs.len(),
        output.display()
    );
    Ok(CombineReport {
        file_count: inputs.len(),
        output: output.to_path_buf(),
    })
}

fn matching_files(data_dir: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!(name = ?entry.file_name(), "Skipping non UTF-8 file name");
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        if !entry.file_type()?.is_file() {
            debug!(path = %entry.path().display(), "Skipping non-file entry");
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

fn write_combined(inputs: &[PathBuf], output: &Path, header_marker: &str) -> io::Result<()> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut out = io::BufWriter::new(tmp.as_file_mut());
        for (index, path) in inputs.iter().enumerate() {
            let content = fs::read_to_string(path)?;
            let mut kept = 0usize;
            for line in content.split_inclusive('\n') {
                if index > 0 && line.starts_with(header_marker) {
                    continue;
                }
                out.write_all(line.as_bytes())?;
                if !line.ends_with('\n') {
                    out.write_all(b"\n")?;
                }
                kept += 1;
            }
            debug!(path = %path.display(), lines = kept, "Appended file");
        }
        out.flush()?;
    }
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}
