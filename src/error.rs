// Error types for loading reference data, expanding prefix masks and merging
//
// Only a load can fail as a whole. Mask and merge errors are record-level:
// callers log them and move on. Resolution never fails.

use thiserror::Error;

/// A reference file could not be turned into a usable data set.
///
/// Any `Err` from a reader means nothing was produced; partially parsed
/// records are dropped with the builder.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading reference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("mandatory section missing: {0}")]
    MissingSection(&'static str),

    #[error("required column missing: {0}")]
    MissingColumn(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("reference file contained no entities")]
    Empty,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<quick_xml::Error> for LoadError {
    fn from(e: quick_xml::Error) -> Self {
        LoadError::Xml(e.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        // csv wraps I/O failures; keep them distinguishable from grammar errors
        if !e.is_io_error() {
            return LoadError::Csv(e.to_string());
        }
        match e.into_kind() {
            csv::ErrorKind::Io(io) => LoadError::Io(io),
            other => LoadError::Csv(format!("{:?}", other)),
        }
    }
}

/// A prefix mask that cannot be expanded into literal prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("mask '{0}' has more than one wildcard token")]
    MultipleWildcards(String),

    #[error("mask '{0}' has an unclosed character class")]
    UnclosedClass(String),

    #[error("mask '{0}' has an empty character class")]
    EmptyClass(String),

    #[error("mask '{0}' has a malformed range")]
    BadRange(String),

    #[error("mask '{0}' expands to more than {1} prefixes")]
    TooLarge(String, usize),

    #[error("mask '{0}' contains invalid character '{1}'")]
    InvalidChar(String, char),

    #[error("empty mask")]
    Empty,
}

/// Two elements that describe different kinds of record cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("cannot merge {into} with {from}")]
    KindMismatch {
        into: &'static str,
        from: &'static str,
    },

    #[error("cannot merge records for different keys: {0} vs {1}")]
    KeyMismatch(String, String),
}
