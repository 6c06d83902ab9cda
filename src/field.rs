//! # Field Descriptors and the Value Codec
//!
//! Each column of a table file is described by a 32-byte descriptor:
//!
//! ```text
//! Offset  Size  Description
//! 0       11    Field name, uppercase, zero padded (max 10 glyphs)
//! 11      1     Field type: 'C', 'N', 'F', 'L' or 'D'
//! 12      4     Record-relative offset; memory only, written as zero
//! 16      1     Field length in bytes
//! 17      1     Decimal count (N and F only)
//! 18      14    Reserved
//! ```
//!
//! The descriptor also owns the value codec for its slice of the record
//! buffer. All five types store ASCII text:
//!
//! | Type | Payload                                      | Padding |
//! |------|----------------------------------------------|---------|
//! | C    | raw bytes, code-page encoded when non-ASCII  | right   |
//! | N    | signed integer, `.000…` filler when dec > 0  | left    |
//! | F    | signed decimal with exactly `dec` fractionals| left    |
//! | L    | `T` or `F` (reads accept `t`, `Y`, `y`)      | —       |
//! | D    | `YYYYMMDD`, all spaces = no date             | —       |
//!
//! Record-relative offsets are not a disk attribute: they start at 1 (after
//! the deletion flag) and are recomputed from the accumulated lengths
//! whenever the field table is read or written.

use std::io::{Read, Write};

use chrono::NaiveDate;
use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codepage::Translator;
use crate::error::Error;
use crate::header::FIELD_SIZE;
use crate::value::Value;

const MAX_FIELD_NAME_LEN: usize = 10;
const MAX_C_FIELD_LEN: usize = 254;
const MAX_N_FIELD_LEN: usize = 19;

const L_FIELD_LEN: usize = 1;
const D_FIELD_LEN: usize = 8;

const DATE_FORMAT: &str = "%Y%m%d";

/// The five supported column types.
///
/// The format defines further types (memo, binary, timestamp, long,
/// autoincrement); descriptors carrying those are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
}

impl FieldType {
    pub(crate) fn as_byte(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'C' => Some(FieldType::Character),
            b'N' => Some(FieldType::Numeric),
            b'F' => Some(FieldType::Float),
            b'L' => Some(FieldType::Logical),
            b'D' => Some(FieldType::Date),
            _ => None,
        }
    }

    /// Parses a type spec: the first non-space character, case-insensitive.
    pub fn parse(spec: &str) -> Result<Self> {
        let byte = spec.trim().bytes().next().unwrap_or(b' ');
        let upper = byte.to_ascii_uppercase();
        FieldType::from_byte(upper).ok_or_else(|| {
            Error::InvalidFieldType {
                got: char::from(upper),
            }
            .into()
        })
    }
}

/// The on-disk descriptor form.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RawField {
    name: [u8; 11],
    ftype: u8,
    offset: U32,
    length: u8,
    decimals: u8,
    filler: [u8; 14],
}

const _: () = assert!(std::mem::size_of::<RawField>() == FIELD_SIZE);

/// One column: validated metadata plus the codec for its record slice.
#[derive(Debug, Clone)]
pub(crate) struct Field {
    name: [u8; 11],
    ftype: u8,
    /// Record-relative byte offset; assigned by the table, never persisted.
    offset: u32,
    length: u8,
    decimals: u8,
}

impl Field {
    pub(crate) fn new(
        name: &str,
        ftype: FieldType,
        length: usize,
        decimals: usize,
    ) -> Result<Self> {
        let mut field = Field {
            name: [0u8; 11],
            ftype: ftype.as_byte(),
            offset: 0,
            length: 0,
            decimals: 0,
        };
        // Validation order matters: length rules depend on the type and
        // decimal rules depend on the length.
        field.set_name(name)?;
        field.set_length(length)?;
        field.set_decimals(decimals)?;
        Ok(field)
    }

    fn set_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim().to_uppercase();
        ensure!(!name.is_empty(), Error::EmptyFieldName);
        ensure!(
            name.len() <= MAX_FIELD_NAME_LEN,
            Error::TooLongFieldName {
                name,
                max: MAX_FIELD_NAME_LEN,
            }
        );
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    fn set_length(&mut self, length: usize) -> Result<()> {
        let length = match self.ftype {
            b'C' => {
                ensure!(
                    length >= 1 && length <= MAX_C_FIELD_LEN,
                    Error::InvalidFieldLength {
                        got: length,
                        max: MAX_C_FIELD_LEN,
                    }
                );
                length
            }
            b'N' | b'F' => {
                ensure!(
                    length >= 1 && length <= MAX_N_FIELD_LEN,
                    Error::InvalidFieldLength {
                        got: length,
                        max: MAX_N_FIELD_LEN,
                    }
                );
                length
            }
            b'L' => L_FIELD_LEN,
            _ => D_FIELD_LEN,
        };
        self.length = length as u8;
        Ok(())
    }

    fn set_decimals(&mut self, decimals: usize) -> Result<()> {
        let decimals = if matches!(self.ftype, b'N' | b'F') {
            let max = (self.length as usize).saturating_sub(2);
            ensure!(
                decimals <= max,
                Error::InvalidFieldDecimals { got: decimals, max }
            );
            decimals
        } else {
            0
        };
        self.decimals = decimals as u8;
        Ok(())
    }

    /// Reads a descriptor. The type byte is kept as stored so that files
    /// carrying unsupported column types still open; typed accessors on such
    /// a column fail with a type mismatch.
    pub(crate) fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; FIELD_SIZE];
        reader
            .read_exact(&mut buf)
            .wrap_err("failed to read field descriptor")?;
        let raw = RawField::read_from_bytes(&buf)
            .map_err(|e| eyre::eyre!("failed to parse field descriptor: {e:?}"))?;
        Ok(Field {
            name: raw.name,
            ftype: raw.ftype,
            offset: 0,
            length: raw.length,
            decimals: raw.decimals,
        })
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let raw = RawField {
            name: self.name,
            ftype: self.ftype,
            // The offset is recomputed on read; the disk form carries zero.
            offset: U32::ZERO,
            length: self.length,
            decimals: self.decimals,
            filler: [0u8; 14],
        };
        writer
            .write_all(raw.as_bytes())
            .wrap_err("failed to write field descriptor")
    }

    pub(crate) fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(11);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub(crate) fn length(&self) -> usize {
        self.length as usize
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset as usize
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset as u32;
    }

    fn check_type(&self, want: u8) -> Result<()> {
        ensure!(
            want == self.ftype,
            Error::TypeMismatch {
                got: char::from(want),
                want: char::from(self.ftype),
            }
        );
        Ok(())
    }

    fn check_len(&self, encoded_len: usize) -> Result<()> {
        ensure!(
            encoded_len <= self.length as usize,
            Error::ValueOverflow {
                value_len: encoded_len,
                field_len: self.length as usize,
            }
        );
        Ok(())
    }

    fn slice<'a>(&self, record: &'a [u8]) -> &'a [u8] {
        &record[self.offset as usize..self.offset as usize + self.length as usize]
    }

    /// Space-fills the field slice and copies `bytes` to its left edge.
    fn fill_left(&self, record: &mut [u8], bytes: &[u8]) {
        let slice =
            &mut record[self.offset as usize..self.offset as usize + self.length as usize];
        slice.fill(b' ');
        slice[..bytes.len()].copy_from_slice(bytes);
    }

    /// Space-fills the field slice and copies `bytes` to its right edge.
    fn fill_right(&self, record: &mut [u8], bytes: &[u8]) {
        let slice =
            &mut record[self.offset as usize..self.offset as usize + self.length as usize];
        slice.fill(b' ');
        let pad = slice.len() - bytes.len();
        slice[pad..].copy_from_slice(bytes);
    }

    // Reads.

    pub(crate) fn string_value(
        &self,
        record: &[u8],
        translator: Option<&Translator>,
    ) -> Result<String> {
        let mut raw = self.slice(record);
        match self.ftype {
            b'C' => {
                while let [rest @ .., b' '] = raw {
                    raw = rest;
                }
            }
            b'N' | b'F' => {
                while let [b' ', rest @ ..] = raw {
                    raw = rest;
                }
            }
            _ => {}
        }
        if let Some(translator) = translator {
            if self.ftype == b'C' && !raw.is_ascii() {
                return translator.decode(raw);
            }
        }
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    pub(crate) fn int_value(&self, record: &[u8]) -> Result<i64> {
        self.check_type(b'N')?;
        let text = String::from_utf8_lossy(self.slice(record));
        let mut text = text.trim();
        if text.is_empty() || text.starts_with('.') {
            return Ok(0);
        }
        if let Some(dot) = text.find('.') {
            text = &text[..dot];
        }
        text.parse::<i64>()
            .wrap_err_with(|| format!("invalid numeric field payload {text:?}"))
    }

    pub(crate) fn float_value(&self, record: &[u8]) -> Result<f64> {
        self.check_type(b'F')?;
        let text = String::from_utf8_lossy(self.slice(record));
        let text = text.trim();
        if text.is_empty() || text.starts_with('.') {
            return Ok(0.0);
        }
        text.parse::<f64>()
            .wrap_err_with(|| format!("invalid float field payload {text:?}"))
    }

    pub(crate) fn bool_value(&self, record: &[u8]) -> Result<bool> {
        self.check_type(b'L')?;
        let byte = self.slice(record)[0];
        Ok(matches!(byte, b'T' | b't' | b'Y' | b'y'))
    }

    pub(crate) fn date_value(&self, record: &[u8]) -> Result<Option<NaiveDate>> {
        self.check_type(b'D')?;
        let raw = self.slice(record);
        if raw.iter().all(|&b| b == b' ') {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(raw);
        let date = NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .wrap_err_with(|| format!("invalid date field payload {text:?}"))?;
        Ok(Some(date))
    }

    // Writes.

    pub(crate) fn set_string_value(
        &self,
        record: &mut [u8],
        value: &str,
        translator: Option<&Translator>,
    ) -> Result<()> {
        self.check_type(b'C')?;
        let encoded;
        let bytes = match translator {
            Some(translator) if !value.is_ascii() => {
                encoded = translator.encode(value)?;
                &encoded[..]
            }
            _ => value.as_bytes(),
        };
        self.check_len(bytes.len())?;
        self.fill_left(record, bytes);
        Ok(())
    }

    pub(crate) fn set_int_value(&self, record: &mut [u8], value: i64) -> Result<()> {
        self.check_type(b'N')?;
        let mut text = value.to_string();
        if self.decimals > 0 {
            text.push('.');
            for _ in 0..self.decimals {
                text.push('0');
            }
        }
        self.check_len(text.len())?;
        self.fill_right(record, text.as_bytes());
        Ok(())
    }

    pub(crate) fn set_float_value(&self, record: &mut [u8], value: f64) -> Result<()> {
        self.check_type(b'F')?;
        let text = format!("{:.*}", self.decimals as usize, value);
        self.check_len(text.len())?;
        self.fill_right(record, text.as_bytes());
        Ok(())
    }

    pub(crate) fn set_bool_value(&self, record: &mut [u8], value: bool) -> Result<()> {
        self.check_type(b'L')?;
        self.fill_left(record, if value { b"T" } else { b"F" });
        Ok(())
    }

    pub(crate) fn set_date_value(&self, record: &mut [u8], value: NaiveDate) -> Result<()> {
        self.check_type(b'D')?;
        let text = value.format(DATE_FORMAT).to_string();
        self.check_len(text.len())?;
        self.fill_left(record, text.as_bytes());
        Ok(())
    }

    /// Routes a polymorphic value to the typed setter for this field.
    pub(crate) fn set_value(
        &self,
        record: &mut [u8],
        value: &Value<'_>,
        translator: Option<&Translator>,
    ) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Str(s) => self.set_string_value(record, s, translator),
            Value::Int(i) => self.set_int_value(record, *i),
            Value::Float(f) => self.set_float_value(record, *f),
            Value::Bool(b) => self.set_bool_value(record, *b),
            Value::Date(d) => self.set_date_value(record, *d),
            Value::Bytes(b) => {
                let text = std::str::from_utf8(b).map_err(|_| Error::UnsupportedValue {
                    kind: value.kind_name(),
                })?;
                self.set_string_value(record, text, translator)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codepage::translator_by_page;

    fn field(name: &str, ftype: FieldType, length: usize, decimals: usize) -> Field {
        Field::new(name, ftype, length, decimals).unwrap()
    }

    #[test]
    fn name_is_uppercased_and_trimmed() {
        let f = field(" price ", FieldType::Numeric, 12, 2);
        assert_eq!(f.name(), "PRICE");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Field::new("  ", FieldType::Character, 10, 0).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::EmptyFieldName));
    }

    #[test]
    fn long_name_is_rejected() {
        let err = Field::new("DESCRIPTION", FieldType::Character, 10, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::TooLongFieldName { max: 10, .. })
        ));
    }

    #[test]
    fn type_parse_takes_first_character() {
        assert_eq!(FieldType::parse("numeric").unwrap(), FieldType::Numeric);
        assert_eq!(FieldType::parse(" c ").unwrap(), FieldType::Character);
        assert!(FieldType::parse("X").is_err());
        assert!(FieldType::parse("").is_err());
    }

    #[test]
    fn character_length_bounds() {
        assert!(Field::new("A", FieldType::Character, 254, 0).is_ok());
        assert!(Field::new("A", FieldType::Character, 0, 0).is_err());
        assert!(Field::new("A", FieldType::Character, 255, 0).is_err());
    }

    #[test]
    fn numeric_length_bounds() {
        assert!(Field::new("A", FieldType::Numeric, 19, 0).is_ok());
        assert!(Field::new("A", FieldType::Numeric, 20, 0).is_err());
        assert!(Field::new("A", FieldType::Float, 0, 0).is_err());
    }

    #[test]
    fn logical_and_date_lengths_are_forced() {
        assert_eq!(field("A", FieldType::Logical, 0, 0).length(), 1);
        assert_eq!(field("A", FieldType::Logical, 9, 0).length(), 1);
        assert_eq!(field("A", FieldType::Date, 0, 0).length(), 8);
    }

    #[test]
    fn decimal_bounds_follow_length() {
        assert!(Field::new("A", FieldType::Numeric, 5, 3).is_ok());
        assert!(Field::new("A", FieldType::Numeric, 5, 4).is_err());
        assert!(Field::new("A", FieldType::Numeric, 2, 1).is_err());
        // Non-numeric types discard the decimal count.
        assert_eq!(field("A", FieldType::Character, 5, 3).decimals, 0);
    }

    #[test]
    fn descriptor_roundtrip_zeroes_offset_on_disk() {
        let mut f = field("NAME", FieldType::Character, 14, 0);
        f.set_offset(1);

        let mut buf = Vec::new();
        f.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FIELD_SIZE);
        assert_eq!(&buf[..4], b"NAME");
        assert_eq!(buf[11], b'C');
        assert_eq!(&buf[12..16], &[0, 0, 0, 0]);
        assert_eq!(buf[16], 14);
        assert_eq!(buf[17], 0);

        let parsed = Field::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed.name(), "NAME");
        assert_eq!(parsed.length(), 14);
        assert_eq!(parsed.offset(), 0);
    }

    #[test]
    fn string_value_trims_by_type() {
        let f = {
            let mut f = field("NAME", FieldType::Character, 5, 0);
            f.set_offset(3);
            f
        };
        let record = b"   Abc    ";
        assert_eq!(f.string_value(record, None).unwrap(), "Abc");

        let n = {
            let mut n = field("NUM", FieldType::Numeric, 5, 0);
            n.set_offset(4);
            n
        };
        let record = b"     -202 ";
        assert_eq!(n.string_value(record, None).unwrap(), "-202");
    }

    #[test]
    fn int_value_parses_and_defaults() {
        let mut f = field("NUM", FieldType::Numeric, 8, 0);
        f.set_offset(3);
        assert_eq!(f.int_value(b"      -2020    ").unwrap(), -2020);
        assert_eq!(f.int_value(b"           ").unwrap(), 0);

        let mut f = field("NUM", FieldType::Numeric, 8, 2);
        f.set_offset(0);
        let mut record = vec![b' '; 8];
        f.set_int_value(&mut record, 123).unwrap();
        assert_eq!(&record, b"  123.00");
        assert_eq!(f.int_value(&record).unwrap(), 123);
    }

    #[test]
    fn float_value_round_trips() {
        let mut f = field("PRICE", FieldType::Float, 8, 2);
        f.set_offset(0);
        let mut record = vec![b' '; 8];
        f.set_float_value(&mut record, 123.45).unwrap();
        assert_eq!(&record, b"  123.45");
        assert_eq!(f.float_value(&record).unwrap(), 123.45);
    }

    #[test]
    fn bool_value_accepts_all_truthy_bytes() {
        let mut f = field("FLAG", FieldType::Logical, 1, 0);
        f.set_offset(0);
        for byte in [b'T', b't', b'Y', b'y'] {
            assert!(f.bool_value(&[byte]).unwrap());
        }
        assert!(!f.bool_value(b"F").unwrap());
        assert!(!f.bool_value(b" ").unwrap());

        let mut record = vec![b'?'; 1];
        f.set_bool_value(&mut record, true).unwrap();
        assert_eq!(&record, b"T");
    }

    #[test]
    fn date_value_round_trips_and_reads_blank_as_none() {
        let mut f = field("DATE", FieldType::Date, 0, 0);
        f.set_offset(0);
        let mut record = vec![b' '; 8];
        assert_eq!(f.date_value(&record).unwrap(), None);

        let date = NaiveDate::from_ymd_opt(2020, 9, 23).unwrap();
        f.set_date_value(&mut record, date).unwrap();
        assert_eq!(&record, b"20200923");
        assert_eq!(f.date_value(&record).unwrap(), Some(date));
    }

    #[test]
    fn set_string_keeps_leading_spaces_and_pads_right() {
        let mut f = field("NAME", FieldType::Character, 5, 0);
        f.set_offset(5);
        let mut record = vec![0u8; 20];
        f.set_string_value(&mut record, " Abc", None).unwrap();
        assert_eq!(&record[5..10], b" Abc ");
    }

    #[test]
    fn set_string_encodes_through_the_code_page() {
        let translator = translator_by_page(866).unwrap();
        let mut f = field("NAME", FieldType::Character, 6, 0);
        f.set_offset(0);
        let mut record = vec![b' '; 6];
        f.set_string_value(&mut record, "Мышь", Some(translator))
            .unwrap();
        assert_eq!(&record, &[0x8C, 0xEB, 0xE8, 0xEC, b' ', b' ']);
        assert_eq!(
            f.string_value(&record, Some(translator)).unwrap(),
            "Мышь"
        );
    }

    #[test]
    fn overflow_is_rejected_for_every_setter() {
        let mut record = vec![b' '; 4];

        let f = field("NAME", FieldType::Character, 3, 0);
        let err = f.set_string_value(&mut record, "abcd", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::ValueOverflow {
                value_len: 4,
                field_len: 3
            })
        );

        let n = field("NUM", FieldType::Numeric, 3, 0);
        assert!(n.set_int_value(&mut record, 1234).is_err());

        let fl = field("PRICE", FieldType::Float, 4, 2);
        assert!(fl.set_float_value(&mut record, 123.4).is_err());
    }

    #[test]
    fn typed_accessors_reject_other_field_types() {
        let f = field("NAME", FieldType::Character, 5, 0);
        let record = vec![b' '; 5];
        let err = f.int_value(&record).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::TypeMismatch {
                got: 'N',
                want: 'C'
            })
        );
        assert!(f.bool_value(&record).is_err());
        assert!(f.date_value(&record).is_err());

        let mut record = vec![b' '; 5];
        assert!(f.set_int_value(&mut record, 1).is_err());
    }

    #[test]
    fn dispatcher_routes_the_sum_type() {
        let mut record = vec![b' '; 10];

        let c = {
            let mut c = field("NAME", FieldType::Character, 4, 0);
            c.set_offset(0);
            c
        };
        c.set_value(&mut record, &Value::from("Abc"), None).unwrap();
        assert_eq!(&record[..4], b"Abc ");

        let n = {
            let mut n = field("NUM", FieldType::Numeric, 5, 0);
            n.set_offset(4);
            n
        };
        n.set_value(&mut record, &Value::from(42u8), None).unwrap();
        assert_eq!(&record[4..9], b"   42");

        // Null leaves the slice untouched.
        n.set_value(&mut record, &Value::Null, None).unwrap();
        assert_eq!(&record[4..9], b"   42");

        let err = c
            .set_value(&mut record, &Value::Bytes(vec![0xFF].into()), None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedValue { .. })
        ));
    }
}
