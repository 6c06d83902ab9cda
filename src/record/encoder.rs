//! # Struct Encoder
//!
//! Appends record values to a table through its column plan. On the first
//! encode against a table with no fields the encoder derives the field
//! table from the plan and writes the file structure, so a fresh stream
//! plus a record type is all a new file needs.
//!
//! Values are assigned to columns by plan position. `None` elements in
//! [`Encoder::encode_all`] append empty records.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};

use eyre::{ensure, Result, WrapErr};
use tracing::debug;

use crate::error::Error;
use crate::record::plan::plan_of;
use crate::record::tag::DEFAULT_TAG;
use crate::record::TableRecord;
use crate::table::Table;
use crate::value::Value;

/// Append-only bridge from record values to a [`Table`].
pub struct Encoder<'a, S = File> {
    table: &'a mut Table<S>,
    tag: String,
}

impl<'a, S: Read + Write + Seek> Encoder<'a, S> {
    pub fn new(table: &'a mut Table<S>) -> Self {
        Self::with_tag(table, DEFAULT_TAG)
    }

    /// An encoder resolving plans under a non-default tag name.
    pub fn with_tag(table: &'a mut Table<S>, tag: &str) -> Self {
        Encoder {
            table,
            tag: tag.to_owned(),
        }
    }

    /// Appends one record: add, set every plan column, save, flush.
    pub fn encode<T: TableRecord>(&mut self, record: &T) -> Result<()> {
        self.ensure_structure::<T>()?;
        let plan = plan_of::<T>(&self.tag);

        self.table.add()?;
        for (i, entry) in plan.entries.iter().enumerate() {
            let value = record.read_path(&entry.path).unwrap_or(Value::Null);
            self.table.set_field_direct(i + 1, &value)?;
        }
        self.table.save()?;
        self.table.flush()
    }

    /// Appends an empty record (the `None` element).
    pub fn encode_empty(&mut self) -> Result<()> {
        ensure!(self.table.field_count() > 0, Error::StructureUndefined);
        self.table.add()?;
        self.table.save()
    }

    /// Encodes elements in order; `None` appends an empty record.
    pub fn encode_all<'r, T, I>(&mut self, records: I) -> Result<()>
    where
        T: TableRecord,
        I: IntoIterator<Item = Option<&'r T>>,
    {
        self.ensure_structure::<T>()?;
        for record in records {
            match record {
                Some(record) => self.encode(record)?,
                None => self.encode_empty()?,
            }
        }
        Ok(())
    }

    fn ensure_structure<T: TableRecord>(&mut self) -> Result<()> {
        if self.table.field_count() > 0 {
            return Ok(());
        }
        let plan = plan_of::<T>(&self.tag);
        for entry in &plan.entries {
            let field_type = entry
                .field_type
                .ok_or(Error::InvalidFieldType { got: ' ' })
                .wrap_err_with(|| format!("column {:?} declares no field type", entry.name))?;
            self.table
                .add_field(&entry.name, field_type, entry.length, entry.decimals)?;
        }
        debug!(columns = plan.entries.len(), "derived field table from record type");
        self.table.init_structure()
    }
}

/// Encodes a slice of records into a complete in-memory file image. The
/// structure is written even for an empty slice.
pub fn marshal<T: TableRecord>(records: &[T]) -> Result<Vec<u8>> {
    let mut table = Table::from_stream(Cursor::new(Vec::new()))?;
    let mut encoder = Encoder::new(&mut table);
    encoder.ensure_structure::<T>()?;
    for record in records {
        encoder.encode(record)?;
    }
    let stream = table
        .into_stream()?
        .ok_or_else(|| eyre::eyre!("marshal stream already released"))?;
    Ok(stream.into_inner())
}
