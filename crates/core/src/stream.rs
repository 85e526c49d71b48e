//! Line-oriented reader for the decoder's operation stream.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::operation::Operation;

/// Failure to read the operation stream. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The underlying reader failed.
    #[error("failed to read operation stream at line {line}: {source}")]
    Io {
        /// 1-based line number.
        line: usize,
        /// I/O failure.
        #[source]
        source: io::Error,
    },
    /// A line is not a valid operation record.
    #[error("malformed operation at line {line}: {source}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Iterates the operations of a JSON-lines stream in order.
///
/// Blank lines are skipped. Once an error has been yielded the reader is
/// exhausted.
pub struct OperationReader<R> {
    lines: io::Lines<R>,
    line: usize,
    failed: bool,
}

impl<R: BufRead> OperationReader<R> {
    /// Read operations from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            failed: false,
        }
    }
}

impl OperationReader<BufReader<File>> {
    /// Open a stream file on disk.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for OperationReader<R> {
    type Item = Result<Operation, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let raw = self.lines.next()?;
            self.line += 1;
            let line = self.line;
            let result = raw
                .map_err(|source| StreamError::Io { line, source })
                .and_then(|text| {
                    if text.trim().is_empty() {
                        return Ok(None);
                    }
                    serde_json::from_str(&text)
                        .map(Some)
                        .map_err(|source| StreamError::Malformed { line, source })
                });
            match result {
                Ok(Some(operation)) => return Some(Ok(operation)),
                Ok(None) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
