use std::collections::HashMap;

use thiserror::Error;

use crate::schema::{CollectionId, SchemaRegistry};
use crate::traits::WriteRow;

/// One output column together with its accumulation buffer
///
/// Buffers live for the whole run: cleared at the start of each event,
/// appended to during extraction, read at commit time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Read-only view of all buffers at commit time; one logical event
#[derive(Copy, Clone, Debug)]
pub struct Row<'a> {
    columns: &'a [Column],
}

impl<'a> Row<'a> {
    /// All (column name, cell) pairs, in registration order
    pub fn columns(&self) -> impl Iterator<Item = (&'a str, &'a [f64])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SinkError {
    #[error("Append to unregistered column `{collection}_{variable}`")]
    UnknownColumn {
        collection: String,
        variable: String,
    },
    #[error("Append to unregistered event variable `{0}`")]
    UnknownEventVariable(String),
    #[error("Buffer access outside an event (missing begin_event)")]
    OutsideEvent,
}

#[derive(Debug, Error)]
pub enum CommitError<E> {
    #[error("Row committed outside an event (missing begin_event)")]
    OutsideEvent,
    #[error("Failed to write row: {0}")]
    Write(E),
}

/// Owner of all accumulation buffers; guarantees one consistent row per
/// event
///
/// The per-event cycle is `begin_event` → any number of `append`s →
/// `commit_row`. Appends outside this cycle and appends to columns the
/// [SchemaRegistry] does not know are errors: a typo cannot silently
/// create a new, unschematized column.
pub struct TabulationSink<W> {
    columns: Vec<Column>,
    object_index: HashMap<CollectionId, HashMap<String, usize>>,
    event_index: HashMap<String, usize>,
    in_event: bool,
    rows_committed: u64,
    writer: W,
}

impl<W: WriteRow> TabulationSink<W> {
    /// Allocate one buffer per registered (collection, variable) pair
    ///
    /// Object columns are named `<name>_<source>_<variable>`, event
    /// columns just `<variable>`.
    pub fn new(registry: &SchemaRegistry, writer: W) -> Self {
        let mut columns = Vec::new();
        let mut object_index = HashMap::new();
        let mut event_index = HashMap::new();
        for (id, variables) in registry.collections() {
            let index: &mut HashMap<String, usize> =
                object_index.entry(id.clone()).or_default();
            for variable in variables {
                index.insert(variable.clone(), columns.len());
                columns.push(Column {
                    name: format!("{id}_{variable}"),
                    values: Vec::new(),
                });
            }
        }
        for variable in registry.event_variables() {
            event_index.insert(variable.clone(), columns.len());
            columns.push(Column {
                name: variable.clone(),
                values: Vec::new(),
            });
        }
        Self {
            columns,
            object_index,
            event_index,
            in_event: false,
            rows_committed: 0,
            writer,
        }
    }

    /// Clear every buffer and open a new event
    ///
    /// Must run before any append for that event; skipping it would leak
    /// values from the previous event into the next row. Calling it twice
    /// is the same as calling it once.
    pub fn begin_event(&mut self) {
        for column in &mut self.columns {
            column.values.clear();
        }
        self.in_event = true;
    }

    /// Append one value to an object-collection buffer
    pub fn append(
        &mut self,
        id: &CollectionId,
        variable: &str,
        value: f64,
    ) -> Result<(), SinkError> {
        if !self.in_event {
            return Err(SinkError::OutsideEvent);
        }
        let idx = self
            .object_index
            .get(id)
            .and_then(|vars| vars.get(variable))
            .ok_or_else(|| SinkError::UnknownColumn {
                collection: id.to_string(),
                variable: variable.to_owned(),
            })?;
        self.columns[*idx].values.push(value);
        Ok(())
    }

    /// Append one value to an event-variable buffer
    pub fn append_event(
        &mut self,
        variable: &str,
        value: f64,
    ) -> Result<(), SinkError> {
        if !self.in_event {
            return Err(SinkError::OutsideEvent);
        }
        let idx = self.event_index.get(variable).ok_or_else(|| {
            SinkError::UnknownEventVariable(variable.to_owned())
        })?;
        self.columns[*idx].values.push(value);
        Ok(())
    }

    /// Write the current buffers as one row and close the event
    ///
    /// Every registered column appears in the row, empty cells included.
    pub fn commit_row(&mut self) -> Result<(), CommitError<W::Error>> {
        if !self.in_event {
            return Err(CommitError::OutsideEvent);
        }
        self.writer
            .write_row(Row {
                columns: &self.columns,
            })
            .map_err(CommitError::Write)?;
        self.in_event = false;
        self.rows_committed += 1;
        Ok(())
    }

    /// Number of rows committed so far
    pub fn rows_committed(&self) -> u64 {
        self.rows_committed
    }

    /// Flush the underlying writer
    pub fn finish(&mut self) -> Result<(), W::Error> {
        self.writer.finish()
    }

    /// Access the underlying writer
    pub fn writer(&self) -> &W {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JetAlgo, Source};
    use crate::writer::MemoryWriter;

    fn sink() -> (TabulationSink<MemoryWriter>, CollectionId) {
        let mut registry = SchemaRegistry::new();
        let id = CollectionId::jets(JetAlgo::Ak8, Source::Pf);
        registry.register(id.clone(), &["pt", "ht"]).unwrap();
        registry
            .register(CollectionId::jets(JetAlgo::Ca12, Source::Maod), &["pt"])
            .unwrap();
        registry.register_event(&["nevent"]).unwrap();
        (TabulationSink::new(&registry, MemoryWriter::new()), id)
    }

    #[test]
    fn unknown_columns_rejected() {
        let (mut sink, id) = sink();
        sink.begin_event();
        assert_eq!(
            sink.append(&id, "met", 1.),
            Err(SinkError::UnknownColumn {
                collection: "ak8_pf".to_string(),
                variable: "met".to_string()
            })
        );
        assert!(matches!(
            sink.append_event("met", 1.),
            Err(SinkError::UnknownEventVariable(_))
        ));
    }

    #[test]
    fn append_needs_open_event() {
        let (mut sink, id) = sink();
        assert_eq!(sink.append(&id, "pt", 1.), Err(SinkError::OutsideEvent));
        assert!(matches!(
            sink.commit_row(),
            Err(CommitError::OutsideEvent)
        ));
    }

    #[test]
    fn begin_event_is_idempotent() {
        let (mut sink, id) = sink();
        sink.begin_event();
        sink.append(&id, "pt", 1.).unwrap();
        sink.begin_event();
        sink.begin_event();
        sink.append_event("nevent", 1.).unwrap();
        sink.commit_row().unwrap();
        let rows = sink.writer().rows();
        assert!(rows[0]["ak8_pf_pt"].is_empty());
    }

    #[test]
    fn no_leak_between_events() {
        let (mut sink, id) = sink();
        sink.begin_event();
        sink.append(&id, "pt", 250.).unwrap();
        sink.append(&id, "pt", 170.).unwrap();
        sink.commit_row().unwrap();
        sink.begin_event();
        sink.commit_row().unwrap();

        let rows = sink.writer().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ak8_pf_pt"], vec![250., 170.]);
        assert!(rows[1]["ak8_pf_pt"].is_empty());
        // unfilled collections are still present in every row
        assert!(rows[0].contains_key("ca12_maod_pt"));
        assert!(rows[1].contains_key("ca12_maod_pt"));
        assert_eq!(sink.rows_committed(), 2);
    }
}
