//! # Record-Struct Codec
//!
//! Maps user-defined record types to and from table columns. The pieces:
//!
//! - [`TableRecord`]: the annotated schema of a record type plus name-path
//!   accessors, normally generated by the [`record!`](crate::record!) macro;
//! - [`plan`]: walks a schema into the ordered column plan and caches it
//!   per (type, tag name);
//! - [`Encoder`] / [`Decoder`]: drive the table engine from record values
//!   and back.
//!
//! There is no runtime reflection: the macro emits, at compile time, the
//! same shape the original reflective walk would discover — declared field
//! names, tag strings, leaf kinds and nested-record hooks.

pub(crate) mod decoder;
pub(crate) mod encoder;
pub(crate) mod plan;
pub(crate) mod tag;


use std::any::TypeId;

use eyre::Result;

pub use decoder::Decoder;
pub use encoder::{marshal, Encoder};
pub use plan::header_columns;

use crate::value::{Value, ValueKind};

/// A record type that can be encoded into and decoded from table records.
///
/// Implement through the [`record!`](crate::record!) macro; the methods
/// mirror what runtime reflection would provide: the declared schema and
/// value access by field-name path.
pub trait TableRecord: 'static {
    /// Declared fields in declaration order.
    fn schema() -> &'static [FieldSchema]
    where
        Self: Sized;

    /// Reads the leaf at a field-name path, `None` when the path misses.
    fn read_path(&self, path: &[&str]) -> Option<Value<'_>>;

    /// Writes the leaf at a field-name path.
    fn write_path(&mut self, path: &[&str], value: &Value<'_>) -> Result<()>;
}

/// One declared field of a record type.
pub struct FieldSchema {
    /// Declared (source) field name.
    pub name: &'static str,
    /// Raw tag string, `None` when the field carries no tag.
    pub tag: Option<&'static str>,
    pub node: SchemaNode,
}

/// What a declared field contains.
pub enum SchemaNode {
    /// A scalar leaf of the given kind.
    Leaf(ValueKind),
    /// A nested record type, flattened into the outer column list.
    Record {
        type_id: fn() -> TypeId,
        schema: fn() -> &'static [FieldSchema],
    },
}

/// `TypeId` accessor usable as a `fn` pointer in static schema tables.
pub fn record_type_id<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}
