//! # xbase - dBase III Table-File Codec
//!
//! xbase reads and writes dBase III-style table files: a fixed-size header,
//! an array of fixed-size field descriptors and a sequence of fixed-size
//! records. Two APIs cover the classic workflows:
//!
//! - a **cursor engine** ([`Table`]): position to a record by number, read
//!   and modify fields by ordinal, append, save;
//! - a **record-struct codec** ([`Encoder`], [`Decoder`], [`record!`]): map
//!   annotated Rust structs to and from table columns through a cached
//!   column plan.
//!
//! ## Quick Start
//!
//! ```ignore
//! use xbase::{FieldType, Table};
//!
//! let mut db = Table::new();
//! db.add_field("NAME", FieldType::Character, 20, 0)?;
//! db.add_field("PRICE", FieldType::Float, 9, 2)?;
//! db.set_code_page(1252);
//! db.create_file("items.dbf")?;
//!
//! db.add()?;
//! db.set_field_value(1, "Teapot");
//! db.set_field_value(2, 9.99);
//! db.save()?;
//! db.close()?;
//!
//! let mut db = Table::open("items.dbf", true)?;
//! db.first()?;
//! assert_eq!(db.field_value_as_string(1), "Teapot");
//! ```
//!
//! Or with a record struct:
//!
//! ```ignore
//! xbase::record! {
//!     #[derive(Debug, Default)]
//!     pub struct Item {
//!         #[dbf = "NAME,type:C,len:20"]
//!         pub name: String,
//!         #[dbf = "PRICE,type:F,len:9,dec:2"]
//!         pub price: f64,
//!     }
//! }
//!
//! let mut db = Table::open("items.dbf", false)?;
//! db.append(&Item { name: "Kettle".into(), price: 24.50 })?;
//! db.close()?;
//! ```
//!
//! ## File Layout
//!
//! ```text
//! offset 0x00        32-byte header (type tag, mod date, record count,
//!                    data offset, record size, code-page tag)
//! offset 0x20        N x 32-byte field descriptors
//! offset 0x20+32N    1 byte = 0x0D, header terminator
//! offset data_offset R x record_size byte records, each prefixed by a
//!                    one-byte deletion flag (' ' live, '*' deleted)
//! offset end         1 byte = 0x1A, file terminator
//! ```
//!
//! All multi-byte numbers are little-endian. Character data is stored in a
//! single-byte code page declared by the header; see [`Table::set_code_page`]
//! for the supported pages.
//!
//! ## Module Overview
//!
//! - `header` / `field`: the binary forms and the five-type value codec
//! - `table`: the cursor engine and its sticky-error channel
//! - `codepage`: code-page number ↔ tag byte ↔ translator table
//! - `record`: column plans, struct encoder and decoder
//! - `macros`: the [`record!`] macro
//!
//! ## Errors
//!
//! Fallible operations return [`eyre::Result`]; stable sentinels are in
//! [`Error`] and can be matched with `Report::downcast_ref`. Field-level
//! getters and setters on [`Table`] never fail directly: the first failure
//! parks on the engine ([`Table::error`]) and later field calls short-circuit
//! until [`Table::clear`].

mod codepage;
mod error;
mod field;
mod header;
mod macros;
mod record;
mod table;
mod value;

pub use error::Error;
pub use field::FieldType;
pub use record::{header_columns, marshal, Decoder, Encoder, FieldSchema, SchemaNode, TableRecord};
pub use table::{Records, Table};
pub use value::{FieldValue, Value, ValueKind};

/// Support items for macro expansions; not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::record::record_type_id;
    pub use eyre::{eyre, Result};
}
