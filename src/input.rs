use std::fs;
use std::path::Path;

use crate::domain::{KeyFormat, QueryKey};
use crate::error::GeneError;

pub fn load_keys(path: &Path, format: KeyFormat) -> Result<Vec<QueryKey>, GeneError> {
    let content =
        fs::read_to_string(path).map_err(|_| GeneError::InputRead(path.to_path_buf()))?;
    Ok(parse_keys(&content, format))
}

pub fn parse_keys(content: &str, format: KeyFormat) -> Vec<QueryKey> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .filter_map(|line| match format {
            KeyFormat::Lines => QueryKey::new(line),
            KeyFormat::FirstColumn => line.split('\t').next().and_then(QueryKey::new),
        })
        .collect()
}
