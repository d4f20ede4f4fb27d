use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::{GeneSummary, OutputNaming, PublicationCount};
use crate::error::GeneError;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Picks the file the batch will write to. Runs before any request is sent.
pub fn resolve_output_path(path: &Path, naming: OutputNaming) -> Result<PathBuf, GeneError> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }
    match naming {
        OutputNaming::FailIfExists => Err(GeneError::OutputExists(path.to_path_buf())),
        OutputNaming::AutoIncrement => next_free_path(path),
    }
}

/// `out.txt` -> `out1.txt`, `out2.txt`, ...; trailing digits on the stem are
/// replaced, so `output_file1.txt` continues with `output_file2.txt`.
fn next_free_path(path: &Path) -> Result<PathBuf, GeneError> {
    let path = Utf8Path::from_path(path)
        .ok_or_else(|| GeneError::Filesystem(format!("non UTF-8 path: {}", path.display())))?;
    let parent = path.parent().unwrap_or(Utf8Path::new(""));
    let stem = path.file_stem().unwrap_or("output");
    let base = stem.trim_end_matches(|ch: char| ch.is_ascii_digit());
    let suffix = path.extension().map(|ext| format!(".{ext}")).unwrap_or_default();

    let mut n = 1u64;
    loop {
        let candidate: Utf8PathBuf = parent.join(format!("{base}{n}{suffix}"));
        if !candidate.exists() {
            return Ok(candidate.into_std_path_buf());
        }
        n += 1;
    }
}

/// Writes tab-separated rows without a header through a temp file in the
/// target directory. Returns the path actually written.
pub fn write_tsv(
    path: &Path,
    rows: &[Vec<String>],
    naming: OutputNaming,
) -> Result<PathBuf, GeneError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file =
        NamedTempFile::new_in(dir).map_err(|err| GeneError::OutputWrite(err.to_string()))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        for row in rows {
            writer
                .write_all(format_row(row).as_bytes())
                .map_err(|err| GeneError::OutputWrite(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| GeneError::OutputWrite(err.to_string()))?;
    }

    let mut target = path.to_path_buf();
    loop {
        match file.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => match naming {
                OutputNaming::FailIfExists => return Err(GeneError::OutputExists(target)),
                OutputNaming::AutoIncrement => {
                    file = err.file;
                    target = resolve_output_path(&target, naming)?;
                }
            },
            Err(err) => return Err(GeneError::OutputWrite(err.error.to_string())),
        }
    }
}

/// One newline-terminated line; embedded tabs and line breaks become spaces.
pub fn format_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|field| field.as_ref().replace(['\t', '\r', '\n'], " "))
        .collect::<Vec<_>>()
        .join("\t");
    line.push('\n');
    line
}

pub fn summary_rows(records: &[GeneSummary], include_gene_id: bool) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let mut row = vec![record.key.to_string()];
            if include_gene_id {
                row.push(record.gene_id.to_string());
            }
            row.push(record.summary.clone());
            row
        })
        .collect()
}

/// With the dictionary check on, the warning column is always present (empty
/// for non-words).
pub fn count_rows(records: &[PublicationCount], with_warning: bool) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let mut row = vec![record.key.to_string(), record.count.to_string()];
            if with_warning {
                row.push(record.dictionary_warning.clone().unwrap_or_default());
            }
            row
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output: String,
    pub records: usize,
    pub unresolved: usize,
    pub failed: Vec<String>,
    pub finished_at: String,
}

impl RunSummary {
    pub fn new(output: &Path, records: usize, unresolved: usize, failed: Vec<String>) -> Self {
        Self {
            output: output.display().to_string(),
            records,
            unresolved,
            failed,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
