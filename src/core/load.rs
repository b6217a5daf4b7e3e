//! Purpose: Load one JSON record from a file path or stdin.
//! Exports: `RecordSource`, `load_record`.
//! Role: IO boundary for the CLI; every failure is mapped onto `core::error`.
//! Invariants: Any well-formed JSON document is accepted, scalars included.
//! Invariants: Parse errors carry 1-based line/column and the path when known.
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordSource {
    Stdin,
    Path(PathBuf),
}

impl RecordSource {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            RecordSource::Stdin
        } else {
            RecordSource::Path(PathBuf::from(arg))
        }
    }

    pub fn label(&self) -> String {
        match self {
            RecordSource::Stdin => "stdin".to_string(),
            RecordSource::Path(path) => path.display().to_string(),
        }
    }
}

pub fn load_record(source: &RecordSource) -> Result<Value, Error> {
    match source {
        RecordSource::Stdin => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read stdin")
                        .with_source(err)
                })?;
            debug!(bytes = text.len(), "record read from stdin");
            parse_record(&text, None)
        }
        RecordSource::Path(path) => {
            let text = fs::read_to_string(path).map_err(|err| read_error(err, path))?;
            debug!(bytes = text.len(), path = %path.display(), "record read");
            parse_record(&text, Some(path))
        }
    }
}

fn read_error(err: io::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    };
    Error::new(kind)
        .with_message("failed to read record")
        .with_path(path)
        .with_source(err)
}

fn parse_record(text: &str, path: Option<&Path>) -> Result<Value, Error> {
    serde_json::from_str(text).map_err(|err| {
        let mut error = Error::new(ErrorKind::Parse)
            .with_message("record is not valid JSON")
            .with_line_column(err.line() as u64, err.column() as u64);
        if let Some(path) = path {
            error = error.with_path(path);
        }
        error.with_source(err)
    })
}
