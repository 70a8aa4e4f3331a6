use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use audec::auto_decompress;
use log::debug;
use thiserror::Error;

use crate::event::EventRecord;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed event record in {path:?}, line {line}: {source}")]
    Json {
        path: PathBuf,
        line: u64,
        source: serde_json::Error,
    },
}

/// Reader for a single event file
///
/// One JSON event record per line, blank lines ignored. Compressed files
/// are decompressed on the fly.
pub struct EventFileReader {
    source: Box<dyn BufRead>,
    path: PathBuf,
    line: u64,
}

impl EventFileReader {
    /// Open the (potentially compressed) event file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CreateError> {
        let path = path.as_ref().to_owned();
        debug!("Reading events from {path:?}");
        let file = File::open(&path)?;
        let source = auto_decompress(BufReader::new(file));
        Ok(Self {
            source,
            path,
            line: 0,
        })
    }
}

impl Iterator for EventFileReader {
    type Item = Result<EventRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            self.line += 1;
            match self.source.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record = serde_json::from_str(&line).map_err(
                        |source| ReadError::Json {
                            path: self.path.clone(),
                            line: self.line,
                            source,
                        },
                    );
                    return Some(record);
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

/// Reader consuming several event files in sequence
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CombinedReader<R> {
    readers: Vec<R>,
    current: usize,
}

impl<R> CombinedReader<R> {
    pub fn new(readers: Vec<R>) -> Self {
        Self {
            readers,
            current: 0,
        }
    }
}

impl<R: Iterator> Iterator for CombinedReader<R> {
    type Item = <R as Iterator>::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(reader) = self.readers.get_mut(self.current) {
            if let Some(next) = reader.next() {
                return Some(next);
            }
            self.current += 1;
        }
        None
    }
}

impl CombinedReader<EventFileReader> {
    /// Construct a new reader reading from the files with the given names
    pub fn from_files<I, P>(files: I) -> Result<Self, CreateError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let readers: Result<_, _> =
            files.into_iter().map(EventFileReader::open).collect();
        Ok(Self::new(readers?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_events(path: &Path, lines: &[&str]) {
        let mut file = File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        write_events(
            &path,
            &[
                r#"{"collections": {"ak8_gn": [{"px": 200.0, "py": 0.0, "pz": 0.0, "e": 250.0}]}, "rho": 21.0}"#,
                "",
                r#"{"vertices": [{"ndof": 10.0}]}"#,
            ],
        );

        let events: Vec<_> = EventFileReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rho, 21.0);
        assert_eq!(events[1].npv(), 1);
    }

    #[test]
    fn malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        write_events(&path, &["{}", "not json"]);

        let results: Vec<_> = EventFileReader::open(&path).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ReadError::Json { line: 2, .. })
        ));
    }

    #[test]
    fn combined() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        write_events(&first, &["{}", "{}"]);
        write_events(&second, &["{}"]);

        let reader = CombinedReader::from_files([&first, &second]).unwrap();
        assert_eq!(reader.count(), 3);

        let empty: CombinedReader<EventFileReader> =
            CombinedReader::new(Vec::new());
        assert_eq!(empty.count(), 0);
    }
}
