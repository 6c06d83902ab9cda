//! # Table Engine
//!
//! The cursor over a table file. A [`Table`] owns the header, the field
//! descriptor list, a single record buffer and a seekable byte stream, and
//! exposes the classic navigation surface: position to a record by 1-based
//! number, read and modify fields by ordinal, append, save, flush.
//!
//! ## Lifecycle
//!
//! ```text
//!            add_field × N          create_file
//! Table::new ───────────────► ... ─────────────► bound, empty
//!
//! Table::open / Table::from_stream ────────────► bound, parsed
//!
//! go_to/first/last/next/prev   position the cursor (reads the record)
//! add → set_field_value × N → save   append a record
//! go_to → set_field_value × N → save overwrite a record in place
//! flush / close                stamp the header, terminate the file
//! ```
//!
//! ## Sticky errors
//!
//! Field accessors do not return `Result`: the first failure is recorded on
//! the engine and every later field operation short-circuits to the zero
//! value, so long set/get batches need a single [`Table::error`] check at
//! the end (or the error returned by [`Table::save`]). [`Table::clear`]
//! resets the channel.
//!
//! ## Record numbering
//!
//! Records are numbered from 1; 0 means "no current record". BOF/EOF are
//! reported both as positioning errors and through the [`Table::bof`] /
//! [`Table::eof`] predicates.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{Local, NaiveDate};
use eyre::{bail, ensure, Result, WrapErr};
use tracing::{debug, trace};

use crate::codepage::{translator_by_page, Translator};
use crate::error::Error;
use crate::field::{Field, FieldType};
use crate::header::{Header, FILE_END, HEADER_END};
use crate::record::{Decoder, Encoder, TableRecord};
use crate::value::{Value, ValueKind};

/// Cursor-oriented engine over a table file.
///
/// Generic over the underlying stream; `Table` without a parameter is a
/// table over a [`File`]. Any `Read + Write + Seek` stream works, e.g.
/// `std::io::Cursor<Vec<u8>>` for in-memory files.
pub struct Table<S = File> {
    header: Header,
    fields: Vec<Field>,
    stream: Option<S>,
    buffer: Vec<u8>,
    err: Option<eyre::Report>,
    /// 1-based number of the current record, 0 when no record is current.
    record_num: u32,
    adding: bool,
    modified: bool,
    translator: Option<&'static Translator>,
}

impl<S> std::fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("header", &self.header)
            .field("fields", &self.fields)
            .field("record_num", &self.record_num)
            .field("adding", &self.adding)
            .field("modified", &self.modified)
            .finish()
    }
}

fn no_stream() -> eyre::Report {
    eyre::eyre!("no stream bound to the table")
}

impl Table {
    /// Creates an unbound table: add fields, then [`Table::create_file`].
    pub fn new() -> Self {
        Self::unbound()
    }

    /// Opens an existing table file.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = if read_only {
            File::open(path)
        } else {
            OpenOptions::new().read(true).write(true).open(path)
        }
        .wrap_err_with(|| format!("failed to open table file '{}'", path.display()))?;
        debug!(path = %path.display(), read_only, "opening table file");
        Self::from_stream(file)
    }

    /// Creates (or truncates) the file and writes the header, the field
    /// table and the header terminator. Requires at least one field.
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.check_fields()?;
        let path = path.as_ref();
        let file = File::create(path)
            .wrap_err_with(|| format!("failed to create table file '{}'", path.display()))?;
        debug!(path = %path.display(), fields = self.fields.len(), "creating table file");
        self.stream = Some(file);
        self.init_structure()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Read + Write + Seek> Table<S> {
    fn unbound() -> Self {
        Table {
            header: Header::new(),
            fields: Vec::new(),
            stream: None,
            buffer: Vec::new(),
            err: None,
            record_num: 0,
            adding: false,
            modified: false,
            translator: None,
        }
    }

    /// Binds a stream and parses its header and field table. An empty
    /// stream yields an unbound-like table that a first encode (or
    /// in-crate structure write) can initialize.
    pub fn from_stream(stream: S) -> Result<Self> {
        let mut table = Self::unbound();
        table.stream = Some(stream);
        match table.read_structure() {
            Ok(()) => {}
            Err(err) => {
                let empty = err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::UnexpectedEof);
                if !empty {
                    return Err(err);
                }
            }
        }
        Ok(table)
    }

    fn read_structure(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        self.header = Header::read_from(stream)?;

        let mut offset = 1usize;
        for _ in 0..self.header.field_count() {
            let stream = self.stream.as_mut().ok_or_else(no_stream)?;
            let mut field = Field::read_from(stream)?;
            field.set_offset(offset);
            offset += field.length();
            self.fields.push(field);
        }

        self.make_buffer();
        self.set_code_page(self.code_page());
        Ok(())
    }

    /// Appends a field descriptor. Only meaningful before binding a new
    /// file; the length is forced for `L` (1) and `D` (8) fields.
    pub fn add_field(
        &mut self,
        name: &str,
        ftype: FieldType,
        length: usize,
        decimals: usize,
    ) -> Result<()> {
        let field = Field::new(name, ftype, length, decimals)?;
        self.fields.push(field);
        Ok(())
    }

    /// Writes header, field table and header terminator to a freshly bound
    /// stream and allocates the record buffer.
    pub(crate) fn init_structure(&mut self) -> Result<()> {
        self.check_fields()?;
        self.write_header()?;
        self.write_fields()?;
        self.make_buffer();
        self.modified = true;
        Ok(())
    }

    // Code page.

    /// Installs the translator for `page` and records it in the header.
    /// Unknown pages are a no-op, preserving whatever was installed before.
    pub fn set_code_page(&mut self, page: u32) {
        let Some(translator) = translator_by_page(page) else {
            return;
        };
        self.translator = Some(translator);
        self.header.set_code_page(page);
    }

    /// Code page recorded in the header, 0 when unset or unknown.
    pub fn code_page(&self) -> u32 {
        self.header.code_page()
    }

    /// Last-modification date from the header.
    pub fn mod_date(&self) -> Option<NaiveDate> {
        self.header.mod_date()
    }

    // Positioning.

    /// Positions to a record by its 1-based number and reads it into the
    /// record buffer. An out-of-range number parks the cursor at the end it
    /// ran past, so [`Table::bof`] / [`Table::eof`] report it, and returns
    /// the matching sentinel.
    pub fn go_to(&mut self, rec_no: u32) -> Result<()> {
        if rec_no < 1 {
            self.record_num = 0;
            bail!(Error::Bof);
        }
        if rec_no > self.rec_count() {
            self.record_num = self.rec_count() + 1;
            bail!(Error::Eof);
        }
        self.record_num = rec_no;
        self.seek_record(rec_no)?;
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        match stream.read_exact(&mut self.buffer) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => bail!(Error::Eof),
            Err(err) => return Err(err).wrap_err("failed to read record"),
        }
        trace!(rec_no, "positioned to record");
        Ok(())
    }

    /// Positions to the first record.
    pub fn first(&mut self) -> Result<()> {
        self.go_to(1)
    }

    /// Positions to the last record.
    pub fn last(&mut self) -> Result<()> {
        self.go_to(self.rec_count())
    }

    /// Positions to the next record.
    pub fn next(&mut self) -> Result<()> {
        self.go_to(self.record_num + 1)
    }

    /// Positions to the previous record.
    pub fn prev(&mut self) -> Result<()> {
        self.go_to(self.record_num.saturating_sub(1))
    }

    /// 1-based number of the current record, 0 when none.
    pub fn rec_no(&self) -> u32 {
        self.record_num
    }

    /// True when positioned past the last record (or the file is empty).
    pub fn eof(&self) -> bool {
        self.record_num > self.rec_count() || self.rec_count() == 0
    }

    /// True when positioned before the first record (or the file is empty).
    pub fn bof(&self) -> bool {
        self.record_num == 0 || self.rec_count() == 0
    }

    /// Number of records in the file.
    pub fn rec_count(&self) -> u32 {
        self.header.rec_count()
    }

    // Field metadata.

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// 1-based ordinal of a field by name, 0 when absent.
    pub fn field_no(&self, name: &str) -> usize {
        let name = name.trim().to_uppercase();
        self.fields
            .iter()
            .position(|f| f.name() == name)
            .map_or(0, |i| i + 1)
    }

    /// Field names in file order.
    pub fn fields(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_owned()).collect()
    }

    // Field access. These record failures on the sticky error channel and
    // return the zero value; check `error()` after a batch.

    /// String value of a field of the current record.
    pub fn field_value_as_string(&mut self, field_no: usize) -> String {
        if self.err.is_some() {
            return String::new();
        }
        match self
            .field_by_no(field_no)
            .and_then(|f| f.string_value(&self.buffer, self.translator))
        {
            Ok(value) => value,
            Err(err) => {
                self.record_field_error("field_value_as_string", field_no, err);
                String::new()
            }
        }
    }

    /// Integer value of a numeric (`N`) field of the current record.
    pub fn field_value_as_int(&mut self, field_no: usize) -> i64 {
        if self.err.is_some() {
            return 0;
        }
        match self.field_by_no(field_no).and_then(|f| f.int_value(&self.buffer)) {
            Ok(value) => value,
            Err(err) => {
                self.record_field_error("field_value_as_int", field_no, err);
                0
            }
        }
    }

    /// Float value of a float (`F`) field of the current record.
    pub fn field_value_as_float(&mut self, field_no: usize) -> f64 {
        if self.err.is_some() {
            return 0.0;
        }
        match self
            .field_by_no(field_no)
            .and_then(|f| f.float_value(&self.buffer))
        {
            Ok(value) => value,
            Err(err) => {
                self.record_field_error("field_value_as_float", field_no, err);
                0.0
            }
        }
    }

    /// Boolean value of a logical (`L`) field of the current record.
    pub fn field_value_as_bool(&mut self, field_no: usize) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.field_by_no(field_no).and_then(|f| f.bool_value(&self.buffer)) {
            Ok(value) => value,
            Err(err) => {
                self.record_field_error("field_value_as_bool", field_no, err);
                false
            }
        }
    }

    /// Date value of a date (`D`) field; `None` for an all-space field.
    pub fn field_value_as_date(&mut self, field_no: usize) -> Option<NaiveDate> {
        if self.err.is_some() {
            return None;
        }
        match self.field_by_no(field_no).and_then(|f| f.date_value(&self.buffer)) {
            Ok(value) => value,
            Err(err) => {
                self.record_field_error("field_value_as_date", field_no, err);
                None
            }
        }
    }

    /// Sets a field of the current record from any [`Value`] convertible.
    /// The change stays in the buffer until [`Table::save`].
    pub fn set_field_value<'v>(&mut self, field_no: usize, value: impl Into<Value<'v>>) {
        if self.err.is_some() {
            return;
        }
        let value = value.into();
        if field_no < 1 || field_no > self.fields.len() {
            self.record_field_error("set_field_value", field_no, Error::FieldNumberOutOfRange.into());
            return;
        }
        let field = &self.fields[field_no - 1];
        if let Err(err) = field.set_value(&mut self.buffer, &value, self.translator) {
            self.record_field_error("set_field_value", field_no, err);
        }
    }

    // Mutation.

    /// Starts a new empty record. The record reaches the file on
    /// [`Table::save`]; a second `add` before that is an error.
    pub fn add(&mut self) -> Result<()> {
        ensure!(!self.adding, Error::AlreadyAdding);
        self.adding = true;
        self.clear_buffer();
        Ok(())
    }

    /// Writes the record buffer to the file: appends when in adding mode,
    /// overwrites the current record otherwise. Returns the sticky error if
    /// one is pending.
    pub fn save(&mut self) -> Result<()> {
        if let Some(err) = &self.err {
            bail!("unresolved field error: {err:#}");
        }
        if self.adding {
            self.seek_record(self.rec_count() + 1)?;
            self.write_buffer()?;
            self.record_num += 1;
            let count = self.rec_count() + 1;
            self.header.set_rec_count(count);
            self.adding = false;
        } else {
            // No current record: the cursor is unset or parked past an end
            // after a failed move.
            if self.record_num == 0 || self.record_num > self.rec_count() {
                return Ok(());
            }
            self.seek_record(self.record_num)?;
            self.write_buffer()?;
        }
        self.modified = true;
        trace!(rec_no = self.record_num, "record saved");
        Ok(())
    }

    /// Marks the current record as deleted. The record stays in the file
    /// and can be restored with [`Table::recall`].
    pub fn delete(&mut self) {
        if let Some(flag) = self.buffer.first_mut() {
            *flag = b'*';
        }
    }

    /// Removes the deletion mark from the current record.
    pub fn recall(&mut self) {
        if let Some(flag) = self.buffer.first_mut() {
            *flag = b' ';
        }
    }

    /// Deletion flag of the current record.
    pub fn rec_deleted(&self) -> bool {
        self.buffer.first() == Some(&b'*')
    }

    /// Space-fills the record buffer, clears the sticky error and leaves
    /// adding mode.
    pub fn clear(&mut self) {
        self.clear_buffer();
        self.err = None;
        self.adding = false;
    }

    /// Commits header and file terminator when anything was modified.
    pub fn flush(&mut self) -> Result<()> {
        if !self.modified {
            return Ok(());
        }
        self.header.set_mod_date(Local::now().date_naive());
        self.write_header()?;
        self.write_file_end()?;
        self.modified = false;
        debug!(records = self.rec_count(), "table flushed");
        Ok(())
    }

    /// Flushes and releases the stream. The stream is released even when
    /// the flush fails.
    pub fn close(&mut self) -> Result<()> {
        let result = self.flush();
        if self.stream.take().is_some() {
            debug!("table stream released");
        }
        result
    }

    /// Sticky error recorded by the field accessors, if any.
    pub fn error(&self) -> Option<&eyre::Report> {
        self.err.as_ref()
    }

    // Struct codec conveniences.

    /// Appends a record value through the struct encoder. On a fresh
    /// stream the first append derives the field table from the record
    /// type and writes the file structure.
    pub fn append<T: TableRecord>(&mut self, record: &T) -> Result<()> {
        Encoder::new(self).encode(record)
    }

    /// Fills a record value from the current record.
    pub fn decode_record<T: TableRecord>(&mut self, record: &mut T) -> Result<()> {
        Decoder::new(self).decode(record)
    }

    /// Iterator over the remaining records as trimmed raw strings,
    /// advancing the cursor. Values are not code-page decoded.
    pub fn records(&mut self) -> Records<'_, S> {
        Records { table: self }
    }

    /// Flushes and hands the stream back (in-memory encoding support).
    pub(crate) fn into_stream(mut self) -> Result<Option<S>> {
        self.flush()?;
        Ok(self.stream.take())
    }

    // Direct field access for the struct codec: errors are returned, not
    // recorded on the sticky channel.

    pub(crate) fn set_field_direct(&mut self, field_no: usize, value: &Value<'_>) -> Result<()> {
        ensure!(
            field_no >= 1 && field_no <= self.fields.len(),
            Error::FieldNumberOutOfRange
        );
        let field = &self.fields[field_no - 1];
        let result = field.set_value(&mut self.buffer, value, self.translator);
        result.wrap_err_with(|| format!("xbase: encode: field {field_no} {:?}", field.name()))
    }

    pub(crate) fn read_field_value(
        &self,
        field_no: usize,
        kind: ValueKind,
    ) -> Result<Value<'static>> {
        let field = self.field_by_no(field_no)?;
        match kind {
            ValueKind::Str => Ok(Value::Str(
                field.string_value(&self.buffer, self.translator)?.into(),
            )),
            ValueKind::Int => match field.int_value(&self.buffer) {
                Ok(v) => Ok(Value::Int(v)),
                Err(err) => Err(self.unmarshal_or(err, field, "i64")),
            },
            ValueKind::Float => match field.float_value(&self.buffer) {
                Ok(v) => Ok(Value::Float(v)),
                Err(err) => Err(self.unmarshal_or(err, field, "f64")),
            },
            ValueKind::Bool => Ok(Value::Bool(field.bool_value(&self.buffer)?)),
            ValueKind::Date => match field.date_value(&self.buffer) {
                Ok(Some(d)) => Ok(Value::Date(d)),
                Ok(None) => Ok(Value::Null),
                Err(err) => Err(self.unmarshal_or(err, field, "NaiveDate")),
            },
        }
    }

    /// Type mismatches pass through; parse failures become unmarshal-type
    /// errors carrying the on-disk string.
    fn unmarshal_or(&self, err: eyre::Report, field: &Field, target: &'static str) -> eyre::Report {
        if matches!(err.downcast_ref::<Error>(), Some(Error::TypeMismatch { .. })) {
            return err;
        }
        Error::UnmarshalType {
            value: field
                .string_value(&self.buffer, None)
                .unwrap_or_default()
                .trim()
                .to_owned(),
            target,
        }
        .into()
    }

    // Internals.

    fn field_by_no(&self, field_no: usize) -> Result<&Field> {
        if field_no < 1 || field_no > self.fields.len() {
            bail!(Error::FieldNumberOutOfRange);
        }
        Ok(&self.fields[field_no - 1])
    }

    fn record_field_error(&mut self, op: &str, field_no: usize, err: eyre::Report) {
        let context = if field_no >= 1 && field_no <= self.fields.len() {
            format!(
                "xbase: {op}: field {field_no} {:?}",
                self.fields[field_no - 1].name()
            )
        } else {
            format!("xbase: {op}: field {field_no}")
        };
        self.err = Some(err.wrap_err(context));
    }

    fn check_fields(&self) -> Result<()> {
        ensure!(!self.fields.is_empty(), Error::StructureUndefined);
        Ok(())
    }

    fn make_buffer(&mut self) {
        self.buffer = vec![b' '; self.header.rec_size() as usize];
    }

    fn clear_buffer(&mut self) {
        self.buffer.fill(b' ');
    }

    fn seek_record(&mut self, rec_no: u32) -> Result<()> {
        let offset = u64::from(self.header.data_offset())
            + u64::from(self.header.rec_size()) * u64::from(rec_no - 1);
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        stream
            .seek(SeekFrom::Start(offset))
            .wrap_err("failed to seek to record")?;
        Ok(())
    }

    fn write_buffer(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        stream
            .write_all(&self.buffer)
            .wrap_err("failed to write record")
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header.data_offset() == 0 {
            self.header.set_field_count(self.fields.len());
        }
        if self.header.rec_size() == 0 {
            let size = 1 + self.fields.iter().map(Field::length).sum::<usize>();
            self.header.set_rec_size(size as u16);
        }
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        stream
            .seek(SeekFrom::Start(0))
            .wrap_err("failed to seek to header")?;
        self.header.write_to(stream)
    }

    fn write_fields(&mut self) -> Result<()> {
        let mut offset = 1usize;
        for field in &mut self.fields {
            field.set_offset(offset);
            offset += field.length();
        }
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        for field in &self.fields {
            field.write_to(stream)?;
        }
        stream
            .write_all(&[HEADER_END])
            .wrap_err("failed to write header terminator")
    }

    /// Appends the file terminator, unless an outside writer changed the
    /// stream length (then the tail is trusted as-is).
    fn write_file_end(&mut self) -> Result<()> {
        let expected = u64::from(self.header.data_offset())
            + u64::from(self.rec_count()) * u64::from(self.header.rec_size());
        let stream = self.stream.as_mut().ok_or_else(no_stream)?;
        let len = stream
            .seek(SeekFrom::End(0))
            .wrap_err("failed to seek to file end")?;
        if len != expected {
            return Ok(());
        }
        stream
            .write_all(&[FILE_END])
            .wrap_err("failed to write file terminator")
    }
}

/// Iterator returned by [`Table::records`].
pub struct Records<'a, S> {
    table: &'a mut Table<S>,
}

impl<S: Read + Write + Seek> Iterator for Records<'_, S> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.table.next() {
            Ok(()) => {}
            Err(err) => {
                return match err.downcast_ref::<Error>() {
                    Some(Error::Eof) | Some(Error::Bof) => None,
                    _ => Some(Err(err)),
                };
            }
        }
        let row = self
            .table
            .fields
            .iter()
            .map(|f| {
                let raw = &self.table.buffer[f.offset()..f.offset() + f.length()];
                String::from_utf8_lossy(raw).trim().to_owned()
            })
            .collect();
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_table() -> Table<Cursor<Vec<u8>>> {
        let mut table = Table::from_stream(Cursor::new(Vec::new())).unwrap();
        table.add_field("NAME", FieldType::Character, 20, 0).unwrap();
        table.add_field("FLAG", FieldType::Logical, 0, 0).unwrap();
        table.add_field("COUNT", FieldType::Numeric, 5, 0).unwrap();
        table.add_field("PRICE", FieldType::Float, 9, 2).unwrap();
        table.add_field("DATE", FieldType::Date, 0, 0).unwrap();
        table.set_code_page(866);
        table.init_structure().unwrap();
        table
    }

    fn file_bytes(table: Table<Cursor<Vec<u8>>>) -> Vec<u8> {
        table.into_stream().unwrap().unwrap().into_inner()
    }

    #[test]
    fn create_writes_header_fields_and_terminators() {
        let table = sample_table();
        assert_eq!(table.rec_count(), 0);
        assert_eq!(table.field_count(), 5);
        assert_eq!(table.rec_no(), 0);
        assert!(table.eof());
        assert!(table.bof());

        let bytes = file_bytes(table);
        assert_eq!(bytes.len(), 194);
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[8..10], &193u16.to_le_bytes());
        assert_eq!(&bytes[10..12], &44u16.to_le_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(bytes[29], 0x65);
        assert_eq!(&bytes[32..36], b"NAME");
        assert_eq!(bytes[32 + 11], b'C');
        assert_eq!(bytes[32 + 16], 20);
        assert_eq!(bytes[192], HEADER_END);
        assert_eq!(bytes[193], FILE_END);
    }

    #[test]
    fn empty_record_is_all_spaces() {
        let mut table = sample_table();
        table.add().unwrap();
        table.save().unwrap();

        assert_eq!(table.rec_count(), 1);
        assert_eq!(table.rec_no(), 1);
        assert!(!table.eof());
        assert!(!table.bof());

        let bytes = file_bytes(table);
        assert_eq!(bytes.len(), 194 + 44);
        assert!(bytes[193..237].iter().all(|&b| b == b' '));
        assert_eq!(bytes[237], FILE_END);
    }

    #[test]
    fn heterogeneous_records_round_trip() {
        let date = NaiveDate::from_ymd_opt(2021, 2, 12).unwrap();

        let mut table = sample_table();
        table.add().unwrap();
        table.set_field_value(1, "Abc");
        table.set_field_value(2, true);
        table.set_field_value(3, 123);
        table.set_field_value(4, 123.45);
        table.set_field_value(5, date);
        table.save().unwrap();

        table.add().unwrap();
        table.save().unwrap();

        table.add().unwrap();
        table.set_field_value(1, "Мышь");
        table.set_field_value(2, false);
        table.set_field_value(3, -321);
        table.set_field_value(4, -54.32);
        table.set_field_value(5, date);
        table.save().unwrap();

        assert_eq!(table.rec_count(), 3);
        assert!(table.error().is_none());

        let bytes = file_bytes(table);
        let mut table = Table::from_stream(Cursor::new(bytes)).unwrap();
        assert_eq!(table.rec_count(), 3);
        assert_eq!(table.code_page(), 866);

        table.first().unwrap();
        assert_eq!(table.field_value_as_string(1), "Abc");
        assert!(table.field_value_as_bool(2));
        assert_eq!(table.field_value_as_int(3), 123);
        assert_eq!(table.field_value_as_float(4), 123.45);
        assert_eq!(table.field_value_as_date(5), Some(date));

        table.next().unwrap();
        assert_eq!(table.field_value_as_string(1), "");
        assert!(!table.field_value_as_bool(2));
        assert_eq!(table.field_value_as_int(3), 0);
        assert_eq!(table.field_value_as_float(4), 0.0);
        assert_eq!(table.field_value_as_date(5), None);

        table.next().unwrap();
        assert_eq!(table.field_value_as_string(1), "Мышь");
        assert_eq!(table.field_value_as_int(3), -321);
        assert_eq!(table.field_value_as_float(4), -54.32);
        assert!(table.error().is_none());
    }

    #[test]
    fn positioning_reports_bof_and_eof() {
        let mut table = sample_table();
        for _ in 0..3 {
            table.add().unwrap();
            table.save().unwrap();
        }

        table.last().unwrap();
        assert_eq!(table.rec_no(), 3);
        let err = table.next().unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Eof));
        assert!(table.eof());

        table.first().unwrap();
        let err = table.prev().unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Bof));
        assert!(table.bof());
        assert_eq!(table.rec_no(), 0);

        // The cursor parked past the end; a further step stays there.
        table.last().unwrap();
        table.next().unwrap_err();
        table.next().unwrap_err();
        assert!(table.eof());
        assert_eq!(table.rec_no(), 4);
    }

    #[test]
    fn positioning_on_empty_table_is_eof_and_bof() {
        let mut table = sample_table();
        assert!(table.first().is_err());
        assert!(table.last().is_err());
        assert!(table.next().is_err());
        assert!(table.eof());
        assert!(table.bof());
    }

    #[test]
    fn save_in_edit_mode_overwrites_in_place() {
        let mut table = sample_table();
        for _ in 0..3 {
            table.add().unwrap();
            table.save().unwrap();
        }

        table.go_to(2).unwrap();
        table.set_field_value(1, "Edit");
        table.save().unwrap();
        assert_eq!(table.rec_count(), 3);

        table.first().unwrap();
        assert_eq!(table.field_value_as_string(1), "");
        table.next().unwrap();
        assert_eq!(table.field_value_as_string(1), "Edit");
        assert!(table.error().is_none());
    }

    #[test]
    fn add_twice_without_save_is_an_error() {
        let mut table = sample_table();
        table.add().unwrap();
        let err = table.add().unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::AlreadyAdding));
    }

    #[test]
    fn delete_and_recall_toggle_the_flag() {
        let mut table = sample_table();
        table.add().unwrap();
        table.save().unwrap();

        assert!(!table.rec_deleted());
        table.delete();
        assert!(table.rec_deleted());
        table.recall();
        assert!(!table.rec_deleted());
    }

    #[test]
    fn sticky_error_short_circuits_and_reports_context() {
        let mut table = sample_table();
        table.add().unwrap();

        table.set_field_value(0, true);
        let err = table.error().expect("sticky error expected");
        assert_eq!(
            format!("{err:#}"),
            "xbase: set_field_value: field 0: field number out of range"
        );

        // Later operations are no-ops while the error is set.
        table.set_field_value(1, "Abc");
        assert_eq!(table.field_value_as_string(1), "");
        assert!(table.save().is_err());

        table.clear();
        assert!(table.error().is_none());
        table.set_field_value(1, "Abc");
        assert!(table.error().is_none());
    }

    #[test]
    fn sticky_error_includes_field_name_when_in_range() {
        let mut table = sample_table();
        table.add().unwrap();

        // Boolean into the character field: a type mismatch.
        table.set_field_value(1, true);
        let err = table.error().expect("sticky error expected");
        let text = format!("{err:#}");
        assert!(text.starts_with("xbase: set_field_value: field 1 \"NAME\""), "{text}");
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::TypeMismatch {
                got: 'L',
                want: 'C'
            })
        );
    }

    #[test]
    fn value_overflow_is_sticky_not_fatal() {
        let mut table = sample_table();
        table.add().unwrap();
        table.set_field_value(3, 123456);
        assert!(matches!(
            table.error().and_then(|e| e.downcast_ref::<Error>()),
            Some(Error::ValueOverflow { .. })
        ));
    }

    #[test]
    fn field_no_is_case_insensitive_and_zero_when_absent() {
        let table = sample_table();
        assert_eq!(table.field_no("name"), 1);
        assert_eq!(table.field_no(" PRICE "), 4);
        assert_eq!(table.field_no("MISSING"), 0);
        assert_eq!(
            table.fields(),
            vec!["NAME", "FLAG", "COUNT", "PRICE", "DATE"]
        );
    }

    #[test]
    fn unknown_code_page_is_a_noop() {
        let mut table = sample_table();
        assert_eq!(table.code_page(), 866);
        table.set_code_page(936);
        assert_eq!(table.code_page(), 866);
    }

    #[test]
    fn open_then_close_without_mutation_preserves_bytes() {
        let mut table = sample_table();
        table.add().unwrap();
        table.set_field_value(1, "Abc");
        table.save().unwrap();
        let bytes = file_bytes(table);

        let mut reopened = Table::from_stream(Cursor::new(bytes.clone())).unwrap();
        reopened.first().unwrap();
        let _ = reopened.field_value_as_string(1);
        reopened.flush().unwrap();
        let preserved = reopened.into_stream().unwrap().unwrap().into_inner();
        assert_eq!(preserved, bytes);
    }

    #[test]
    fn flush_trusts_an_outside_writer() {
        let mut table = sample_table();
        table.add().unwrap();
        table.save().unwrap();

        // Simulate an outside append beyond the expected end.
        let stream = table.stream.as_mut().unwrap();
        stream.seek(SeekFrom::End(0)).unwrap();
        stream.write_all(b"tail").unwrap();

        table.flush().unwrap();
        let bytes = file_bytes(table);
        assert!(bytes.ends_with(b"tail"));
    }

    #[test]
    fn records_iterates_trimmed_rows() {
        let mut table = sample_table();
        table.add().unwrap();
        table.set_field_value(1, "Abc");
        table.set_field_value(3, 123);
        table.save().unwrap();
        table.add().unwrap();
        table.save().unwrap();

        let bytes = file_bytes(table);
        let mut table = Table::from_stream(Cursor::new(bytes)).unwrap();

        let rows: Vec<_> = table.records().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Abc", "", "123", "", ""]);
        assert_eq!(rows[1], vec!["", "", "", "", ""]);
    }

    #[test]
    fn field_slices_tile_the_record_exactly() {
        let table = sample_table();
        let mut offset = 1usize;
        for field in &table.fields {
            assert_eq!(field.offset(), offset);
            offset += field.length();
        }
        assert_eq!(offset, table.header.rec_size() as usize);
    }

    #[test]
    fn fresh_table_reports_no_record() {
        let table = Table::new();
        assert_eq!(table.rec_no(), 0);
        assert_eq!(table.rec_count(), 0);
        assert!(table.eof());
        assert!(table.bof());
        assert_eq!(table.mod_date(), Some(Local::now().date_naive()));
    }

    #[test]
    fn create_file_without_fields_is_rejected() {
        let mut table = Table::new();
        let err = table.create_file("/nonexistent/never-created.dbf").unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::StructureUndefined)
        );
    }
}
