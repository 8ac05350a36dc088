//! Error kinds shared by every engine operation.
//!
//! All fallible operations return [`Result`]. File-position context is
//! attached at the frame that read the file, so callers see the offending
//! path and line without threading it through every layer.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a word was rejected by word validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidWordReason {
    Empty,
    NoLetters,
    IllegalLeadingChar(u8),
    IllegalTrailingChar(u8),
    IllegalMiddleChar(u8),
}

impl fmt::Display for InvalidWordReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InvalidWordReason::Empty => write!(f, "empty string"),
            InvalidWordReason::NoLetters => write!(f, "does not contain any letters"),
            InvalidWordReason::IllegalLeadingChar(c) => write!(
                f,
                "the character '{}' may not appear at the beginning of a word",
                c as char
            ),
            InvalidWordReason::IllegalTrailingChar(c) => write!(
                f,
                "the character '{}' may not appear at the end of a word",
                c as char
            ),
            InvalidWordReason::IllegalMiddleChar(c) => write!(
                f,
                "the character '{}' may not appear in the middle of a word",
                c as char
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: expected {expected}, found {found}", path.display())]
    BadFileFormat {
        path: PathBuf,
        line: u32,
        expected: String,
        found: String,
    },

    #[error("unknown language \"{0}\"")]
    UnknownLanguage(String),

    #[error("language mismatch: expected \"{expected}\", got \"{got}\"")]
    LanguageMismatch { expected: String, got: String },

    #[error("unknown encoding \"{0}\"")]
    UnknownEncoding(String),

    #[error("encoding conversion failed")]
    EncodingConversionFailed,

    #[error("invalid word \"{word}\": {reason}")]
    InvalidWord { word: String, reason: InvalidWordReason },

    #[error("invalid affix flag '{flag}' in {rule_source}")]
    InvalidFlag { flag: char, rule_source: String },

    #[error("bad value \"{value}\" for {key}: expected {expected}")]
    BadValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("unknown configuration key \"{0}\"")]
    UnknownKey(String),

    #[error("the value of \"{0}\" can not be changed")]
    CantChangeValue(String),

    #[error("mismatched soundslike: dictionary was built with {got}, language uses {expected}")]
    MismatchedSoundslike { expected: String, got: String },
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Error {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn bad_format(
        path: impl AsRef<Path>,
        line: u32,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Error {
        Error::BadFileFormat {
            path: path.as_ref().to_path_buf(),
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_word(word: &[u8], reason: InvalidWordReason) -> Error {
        Error::InvalidWord {
            word: String::from_utf8_lossy(word).into_owned(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_path_and_line() {
        let e = Error::bad_format("/tmp/en.dat", 7, "name <string>", "nmae en");
        let msg = e.to_string();
        assert!(msg.contains("/tmp/en.dat:7"));
        assert!(msg.contains("name <string>"));
    }

    #[test]
    fn invalid_word_reason_display() {
        let e = Error::invalid_word(b"-foo", InvalidWordReason::IllegalLeadingChar(b'-'));
        assert!(e.to_string().contains("beginning of a word"));
    }
}
