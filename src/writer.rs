use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::debug;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::compression::{compress_writer, Compression};
use crate::sink::Row;
use crate::traits::WriteRow;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to create output file: {0}")]
    Create(std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writer of the events table to a JSON-lines file
///
/// One JSON object per committed row, columns in registration order,
/// each cell a numeric array. The output file is created lazily, so
/// building the writer is infallible.
#[derive(TypedBuilder)]
pub struct FileWriter {
    filename: PathBuf,
    #[builder(default)]
    compression: Option<Compression>,
    #[builder(default, setter(skip))]
    out: Option<Box<dyn Write>>,
}

impl FileWriter {
    fn out(&mut self) -> Result<&mut (dyn Write + 'static), WriteError> {
        if self.out.is_none() {
            debug!("Writing events table to {:?}", self.filename);
            let file =
                File::create(&self.filename).map_err(WriteError::Create)?;
            let out = compress_writer(BufWriter::new(file), self.compression)?;
            self.out = Some(out);
        }
        Ok(self.out.as_mut().unwrap().as_mut())
    }
}

impl WriteRow for FileWriter {
    type Error = WriteError;

    fn write_row(&mut self, row: Row<'_>) -> Result<(), Self::Error> {
        let mut out = self.out()?;
        out.write_all(b"{")?;
        for (n, (name, values)) in row.columns().enumerate() {
            if n > 0 {
                out.write_all(b",")?;
            }
            serde_json::to_writer(&mut out, name)?;
            out.write_all(b":")?;
            serde_json::to_writer(&mut out, values)?;
        }
        out.write_all(b"}\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }
}

/// Writer keeping all committed rows in memory
///
/// Mostly useful for tests and embedders that post-process rows directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryWriter {
    rows: Vec<BTreeMap<String, Vec<f64>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[BTreeMap<String, Vec<f64>>] {
        &self.rows
    }
}

impl WriteRow for MemoryWriter {
    type Error = Infallible;

    fn write_row(&mut self, row: Row<'_>) -> Result<(), Self::Error> {
        let row = row
            .columns()
            .map(|(name, values)| (name.to_owned(), values.to_owned()))
            .collect();
        self.rows.push(row);
        Ok(())
    }
}
