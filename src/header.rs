//! # Table-File Header
//!
//! Every table file starts with a 32-byte header:
//!
//! ```text
//! Offset  Size  Description
//! 0       1     File-type tag, always 0x03
//! 1       3     Last-modification date: year-1900, month, day
//! 4       4     Record count (u32)
//! 8       2     Data offset: header + field table + terminator (u16)
//! 10      2     Record size in bytes, incl. the deletion flag (u16)
//! 12      17    Reserved
//! 29      1     Code-page tag
//! 30      2     Reserved
//! ```
//!
//! All multi-byte fields are little-endian; the struct uses zerocopy's
//! `U16`/`U32` wrappers so the in-memory form is the on-disk form.
//!
//! The field count is not stored: it derives from the data offset as
//! `(data_offset - 32 - 1) / 32`, one 32-byte descriptor per field plus the
//! one-byte header terminator.

use std::io::{Read, Write};

use chrono::{Datelike, Local, NaiveDate};
use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codepage;
use crate::error::Error;

/// File-type tag of a dBase III table file without memo stream.
pub(crate) const TABLE_FILE_ID: u8 = 0x03;

/// Byte closing the field descriptor table.
pub(crate) const HEADER_END: u8 = 0x0D;

/// Byte closing the record area.
pub(crate) const FILE_END: u8 = 0x1A;

pub(crate) const HEADER_SIZE: usize = 32;
pub(crate) const FIELD_SIZE: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct Header {
    file_type: u8,
    mod_year: u8,
    mod_month: u8,
    mod_day: u8,
    rec_count: U32,
    data_offset: U16,
    rec_size: U16,
    reserved: [u8; 17],
    code_page: u8,
    reserved2: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<Header>() == HEADER_SIZE);

impl Header {
    /// A fresh header stamped with today's date.
    pub(crate) fn new() -> Self {
        let mut h = Self {
            file_type: TABLE_FILE_ID,
            mod_year: 0,
            mod_month: 0,
            mod_day: 0,
            rec_count: U32::ZERO,
            data_offset: U16::ZERO,
            rec_size: U16::ZERO,
            reserved: [0u8; 17],
            code_page: 0,
            reserved2: [0u8; 2],
        };
        h.set_mod_date(Local::now().date_naive());
        h
    }

    /// Reads and validates a header from the stream.
    pub(crate) fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut buf)
            .wrap_err("failed to read table header")?;
        let header = Header::read_from_bytes(&buf)
            .map_err(|e| eyre::eyre!("failed to parse table header: {e:?}"))?;
        ensure!(header.file_type == TABLE_FILE_ID, Error::NotTableFile);
        Ok(header)
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(self.as_bytes())
            .wrap_err("failed to write table header")
    }

    pub(crate) fn rec_count(&self) -> u32 {
        self.rec_count.get()
    }

    pub(crate) fn set_rec_count(&mut self, count: u32) {
        self.rec_count = U32::new(count);
    }

    pub(crate) fn data_offset(&self) -> u16 {
        self.data_offset.get()
    }

    pub(crate) fn rec_size(&self) -> u16 {
        self.rec_size.get()
    }

    pub(crate) fn set_rec_size(&mut self, size: u16) {
        self.rec_size = U16::new(size);
    }

    /// Number of field descriptors, derived from the data offset.
    pub(crate) fn field_count(&self) -> usize {
        (self.data_offset.get() as usize).saturating_sub(HEADER_SIZE + 1) / FIELD_SIZE
    }

    pub(crate) fn set_field_count(&mut self, count: usize) {
        self.data_offset = U16::new((count * FIELD_SIZE + HEADER_SIZE + 1) as u16);
    }

    /// Last-modification date, `None` when the header was never stamped.
    pub(crate) fn mod_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            1900 + i32::from(self.mod_year),
            u32::from(self.mod_month),
            u32::from(self.mod_day),
        )
    }

    pub(crate) fn set_mod_date(&mut self, date: NaiveDate) {
        self.mod_year = (date.year() - 1900) as u8;
        self.mod_month = date.month() as u8;
        self.mod_day = date.day() as u8;
    }

    /// Code page declared by the header, 0 when unset or unknown.
    pub(crate) fn code_page(&self) -> u32 {
        codepage::page_by_code(self.code_page)
    }

    pub(crate) fn set_code_page(&mut self, page: u32) {
        self.code_page = codepage::code_by_page(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_32() {
        assert_eq!(std::mem::size_of::<Header>(), 32);
    }

    #[test]
    fn header_roundtrip() {
        let mut header = Header::new();
        header.set_rec_count(7);
        header.set_field_count(5);
        header.set_rec_size(44);
        header.set_code_page(866);

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 32);

        let parsed = Header::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed.rec_count(), 7);
        assert_eq!(parsed.field_count(), 5);
        assert_eq!(parsed.data_offset(), 193);
        assert_eq!(parsed.rec_size(), 44);
        assert_eq!(parsed.code_page(), 866);
    }

    #[test]
    fn header_rejects_invalid_file_type() {
        let bytes = [0u8; 32];
        let err = Header::read_from(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::Error>(),
            Some(&Error::NotTableFile)
        );
    }

    #[test]
    fn field_count_derives_from_data_offset() {
        let mut header = Header::new();
        header.set_field_count(3);
        assert_eq!(header.data_offset(), 32 * 3 + 33);
        assert_eq!(header.field_count(), 3);
    }

    #[test]
    fn mod_date_uses_1900_base() {
        let mut header = Header::new();
        header.set_mod_date(NaiveDate::from_ymd_opt(2021, 2, 12).unwrap());

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(&buf[1..4], &[121, 2, 12]);

        let parsed = Header::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed.mod_date(), NaiveDate::from_ymd_opt(2021, 2, 12));
    }

    #[test]
    fn new_header_is_stamped_with_today() {
        let header = Header::new();
        assert_eq!(header.mod_date(), Some(Local::now().date_naive()));
    }

    #[test]
    fn unknown_code_page_reads_as_zero() {
        let mut header = Header::new();
        header.set_code_page(936);
        assert_eq!(header.code_page(), 0);
    }
}
