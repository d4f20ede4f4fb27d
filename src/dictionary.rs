use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::GeneError;

pub const DICTIONARY_WARNING: &str = "WARNING: This gene is a dictionary word.";
pub const SYSTEM_WORD_LIST: &str = "/usr/share/dict/words";

/// English word list used to flag gene symbols that double as words.
///
/// Entries keep their case and only the key is lowercased, so a word the list
/// carries only capitalised (a proper noun) never matches.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    /// One word per line; `.gz` files are decompressed on the fly.
    pub fn load(path: &Path) -> Result<Self, GeneError> {
        let file = File::open(path).map_err(|_| GeneError::DictionaryRead(path.to_path_buf()))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let mut words = HashSet::new();
        for line in BufReader::new(reader).lines() {
            let line = line.map_err(|_| GeneError::DictionaryRead(path.to_path_buf()))?;
            let word = line.trim();
            if !word.is_empty() {
                words.insert(word.to_string());
            }
        }
        Ok(Self { words })
    }

    /// Explicit path first, then the system word list.
    pub fn locate(path: Option<&Path>) -> Result<Self, GeneError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(SYSTEM_WORD_LIST));
        Self::load(&path)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|word| word.as_ref().trim().to_string())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.words.contains(&key.to_lowercase())
    }

    pub fn warning_for(&self, key: &str) -> Option<&'static str> {
        self.contains(key).then_some(DICTIONARY_WARNING)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
