//! # Struct Decoder
//!
//! Fills a record value from the table's current record. Columns are
//! matched by name against the record type's plan; plan entries naming a
//! column the file does not have are skipped. Disk values that do not parse
//! into the leaf type surface as unmarshal-type errors carrying the string
//! value and the target type.

use std::fs::File;
use std::io::{Read, Seek, Write};

use eyre::{Result, WrapErr};

use crate::record::plan::plan_of;
use crate::record::tag::DEFAULT_TAG;
use crate::record::TableRecord;
use crate::table::Table;

/// Read-side bridge from the current record to a record value.
pub struct Decoder<'a, S = File> {
    table: &'a mut Table<S>,
    tag: String,
}

impl<'a, S: Read + Write + Seek> Decoder<'a, S> {
    pub fn new(table: &'a mut Table<S>) -> Self {
        Self::with_tag(table, DEFAULT_TAG)
    }

    /// A decoder resolving plans under a non-default tag name.
    pub fn with_tag(table: &'a mut Table<S>, tag: &str) -> Self {
        Decoder {
            table,
            tag: tag.to_owned(),
        }
    }

    /// Fills `record` from the current record.
    pub fn decode<T: TableRecord>(&mut self, record: &mut T) -> Result<()> {
        let plan = plan_of::<T>(&self.tag);
        for entry in &plan.entries {
            let field_no = self.table.field_no(&entry.name);
            if field_no == 0 {
                continue;
            }
            let value = self
                .table
                .read_field_value(field_no, entry.kind)
                .wrap_err_with(|| format!("xbase: decode: column {:?}", entry.name))?;
            record
                .write_path(&entry.path, &value)
                .wrap_err_with(|| format!("xbase: decode: column {:?}", entry.name))?;
        }
        Ok(())
    }
}
