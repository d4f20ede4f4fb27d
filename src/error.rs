use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GeneError {
    #[error("failed to read input file at {0}")]
    InputRead(PathBuf),

    #[error(
        "species is not provided in the proper format: {0} (expected genus_species, e.g. homo_sapiens)"
    )]
    #[diagnostic(help("use two words separated by an underscore: homo_sapiens, mus_musculus"))]
    InvalidSpecies(String),

    #[error("output file already exists: {0}")]
    #[diagnostic(help("please specify a unique output file name"))]
    OutputExists(PathBuf),

    #[error("failed to write output: {0}")]
    OutputWrite(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read dictionary word list at {0}")]
    #[diagnostic(help("pass --dictionary <path> or --no-dictionary-check"))]
    DictionaryRead(PathBuf),

    #[error("invalid gene id: {0}")]
    InvalidGeneId(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl GeneError {
    /// Errors raised while validating arguments and local files, before any request is sent.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GeneError::InputRead(_)
                | GeneError::InvalidSpecies(_)
                | GeneError::OutputExists(_)
                | GeneError::ConfigRead(_)
                | GeneError::ConfigParse(_)
                | GeneError::DictionaryRead(_)
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, GeneError::NcbiHttp(_) | GeneError::NcbiStatus { .. })
    }
}
