//! # Error Sentinels
//!
//! Typed errors for the table-file codec. Fallible operations on the public
//! surface return `eyre::Result`; the variants below are the stable sentinels
//! callers can match with `Report::downcast_ref::<Error>()`.
//!
//! Positioning past the ends of the file reports [`Error::Bof`] /
//! [`Error::Eof`]. Field access errors (range, type mismatch, overflow) are
//! recorded on the engine's sticky error channel rather than returned; see
//! the `table` module.

use thiserror::Error;

/// Stable error sentinels exposed at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Positioned before the first record.
    #[error("BOF")]
    Bof,

    /// Positioned past the last record.
    #[error("EOF")]
    Eof,

    /// The header's file-type byte is not `0x03`.
    #[error("not a table file")]
    NotTableFile,

    /// A 1-based field ordinal outside `1..=field_count`.
    #[error("field number out of range")]
    FieldNumberOutOfRange,

    /// A typed accessor was used on a field of a different type.
    #[error("type mismatch: got {got:?}, want {want:?}")]
    TypeMismatch { got: char, want: char },

    /// An encoded value does not fit the field's declared length.
    #[error("field value overflow: value len {value_len}, field len {field_len}")]
    ValueOverflow { value_len: usize, field_len: usize },

    #[error("invalid field len: got {got}, want 0 < len <= {max}")]
    InvalidFieldLength { got: usize, max: usize },

    #[error("invalid field dec: got {got}, want 0 <= dec <= {max}")]
    InvalidFieldDecimals { got: usize, max: usize },

    #[error("empty field name")]
    EmptyFieldName,

    #[error("too long field name: {name:?}, max len {max}")]
    TooLongFieldName { name: String, max: usize },

    #[error("invalid field type: got {got:?}, want C, N, F, L, D")]
    InvalidFieldType { got: char },

    /// A `Value` that cannot be routed to any field codec.
    #[error("unsupported value type: {kind}")]
    UnsupportedValue { kind: &'static str },

    /// `create_file` before any field was added.
    #[error("file structure undefined")]
    StructureUndefined,

    /// `add` called twice without an intervening `save`.
    #[error("already adding: save the current record first")]
    AlreadyAdding,

    /// A disk value that does not fit the record struct's leaf type.
    #[error("cannot unmarshal {value:?} into value of type {target}")]
    UnmarshalType {
        value: String,
        target: &'static str,
    },

    /// The installed code page cannot represent the value.
    #[error("cannot translate {value:?} with the current code page")]
    Translate { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_render_stable_messages() {
        assert_eq!(Error::Bof.to_string(), "BOF");
        assert_eq!(Error::Eof.to_string(), "EOF");
        assert_eq!(Error::NotTableFile.to_string(), "not a table file");
        assert_eq!(
            Error::FieldNumberOutOfRange.to_string(),
            "field number out of range"
        );
    }

    #[test]
    fn sentinels_survive_eyre_downcast() {
        let report = eyre::Report::new(Error::Eof);
        assert_eq!(report.downcast_ref::<Error>(), Some(&Error::Eof));

        let wrapped = report.wrap_err("xbase: go_to");
        assert_eq!(wrapped.downcast_ref::<Error>(), Some(&Error::Eof));
    }

    #[test]
    fn overflow_carries_both_lengths() {
        let err = Error::ValueOverflow {
            value_len: 7,
            field_len: 5,
        };
        assert_eq!(
            err.to_string(),
            "field value overflow: value len 7, field len 5"
        );
    }
}
