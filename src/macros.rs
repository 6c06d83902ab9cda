//! # Record Macro
//!
//! `record!` turns an annotated struct into a [`TableRecord`](crate::TableRecord)
//! implementation: the struct definition itself, a static schema table
//! (declared names, tag strings, leaf kinds, nested-record hooks) and
//! name-path accessors for reading and writing leaves.
//!
//! ## Usage
//!
//! ```ignore
//! xbase::record! {
//!     #[derive(Debug, Default, Clone, PartialEq)]
//!     pub struct Item {
//!         #[dbf = "NAME,type:C,len:20"]
//!         pub name: String,
//!         #[dbf = "PRICE,type:F,len:9,dec:2"]
//!         pub price: f64,
//!         pub flag: bool,                       // untagged: column "flag"
//!     }
//! }
//! ```
//!
//! Field forms:
//!
//! - `#[dbf = "TAG"] name: Ty` — leaf with a tag (see the tag grammar in
//!   the `record` module);
//! - `name: Ty` — untagged leaf, column named after the field;
//! - `#[dbf(embed)] name: Ty` — nested `record!` type, flattened into the
//!   outer column list;
//! - `#[dbf(embed = "PFX,inline")] name: Ty` — nested type flattened under
//!   the `PFX` column-name prefix.
//!
//! Leaf types implement [`FieldValue`](crate::FieldValue): `String`, the
//! integer widths, `f32`/`f64`, `bool`, `NaiveDate` and `Option<NaiveDate>`.

/// Defines a record struct and derives its [`TableRecord`](crate::TableRecord)
/// implementation. The module-level docs describe the accepted field forms
/// and the tag grammar.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $($body:tt)* }
    ) => {
        $crate::record!(@munch
            ($(#[$meta])*)
            ($vis)
            ($name)
            (__xbase_this __xbase_value)
            fields = ()
            schema = ()
            reads = ()
            writes = ()
            rest = ($($body)* ,)
        );
    };

    // Leaf field with a tag.
    (@munch
        ($($meta:tt)*) ($vis:vis) ($name:ident) ($this:ident $value:ident)
        fields = ( $($fields:tt)* )
        schema = ( $($schema:tt)* )
        reads = ( $($reads:tt)* )
        writes = ( $($writes:tt)* )
        rest = ( #[dbf = $tag:literal] $fvis:vis $fname:ident : $fty:ty , $($rest:tt)* )
    ) => {
        $crate::record!(@munch
            ($($meta)*) ($vis) ($name) ($this $value)
            fields = ( $($fields)* $fvis $fname : $fty , )
            schema = ( $($schema)*
                $crate::FieldSchema {
                    name: stringify!($fname),
                    tag: ::core::option::Option::Some($tag),
                    node: $crate::SchemaNode::Leaf(<$fty as $crate::FieldValue>::KIND),
                }, )
            reads = ( $($reads)*
                [n] if *n == stringify!($fname) => ::core::option::Option::Some(
                    $crate::FieldValue::to_value(&$this.$fname),
                ), )
            writes = ( $($writes)*
                [n] if *n == stringify!($fname) => {
                    $this.$fname = <$fty as $crate::FieldValue>::from_value($value)?;
                    ::core::result::Result::Ok(())
                } )
            rest = ( $($rest)* )
        );
    };

    // Embedded record type, flattened.
    (@munch
        ($($meta:tt)*) ($vis:vis) ($name:ident) ($this:ident $value:ident)
        fields = ( $($fields:tt)* )
        schema = ( $($schema:tt)* )
        reads = ( $($reads:tt)* )
        writes = ( $($writes:tt)* )
        rest = ( #[dbf(embed)] $fvis:vis $fname:ident : $fty:ty , $($rest:tt)* )
    ) => {
        $crate::record!(@munch
            ($($meta)*) ($vis) ($name) ($this $value)
            fields = ( $($fields)* $fvis $fname : $fty , )
            schema = ( $($schema)*
                $crate::FieldSchema {
                    name: stringify!($fname),
                    tag: ::core::option::Option::None,
                    node: $crate::SchemaNode::Record {
                        type_id: $crate::__private::record_type_id::<$fty>,
                        schema: <$fty as $crate::TableRecord>::schema,
                    },
                }, )
            reads = ( $($reads)*
                [n, rest @ ..] if *n == stringify!($fname) =>
                    $crate::TableRecord::read_path(&$this.$fname, rest), )
            writes = ( $($writes)*
                [n, rest @ ..] if *n == stringify!($fname) =>
                    $crate::TableRecord::write_path(&mut $this.$fname, rest, $value), )
            rest = ( $($rest)* )
        );
    };

    // Embedded record type with a tag (e.g. an inline prefix).
    (@munch
        ($($meta:tt)*) ($vis:vis) ($name:ident) ($this:ident $value:ident)
        fields = ( $($fields:tt)* )
        schema = ( $($schema:tt)* )
        reads = ( $($reads:tt)* )
        writes = ( $($writes:tt)* )
        rest = ( #[dbf(embed = $tag:literal)] $fvis:vis $fname:ident : $fty:ty , $($rest:tt)* )
    ) => {
        $crate::record!(@munch
            ($($meta)*) ($vis) ($name) ($this $value)
            fields = ( $($fields)* $fvis $fname : $fty , )
            schema = ( $($schema)*
                $crate::FieldSchema {
                    name: stringify!($fname),
                    tag: ::core::option::Option::Some($tag),
                    node: $crate::SchemaNode::Record {
                        type_id: $crate::__private::record_type_id::<$fty>,
                        schema: <$fty as $crate::TableRecord>::schema,
                    },
                }, )
            reads = ( $($reads)*
                [n, rest @ ..] if *n == stringify!($fname) =>
                    $crate::TableRecord::read_path(&$this.$fname, rest), )
            writes = ( $($writes)*
                [n, rest @ ..] if *n == stringify!($fname) =>
                    $crate::TableRecord::write_path(&mut $this.$fname, rest, $value), )
            rest = ( $($rest)* )
        );
    };

    // Leaf field without a tag.
    (@munch
        ($($meta:tt)*) ($vis:vis) ($name:ident) ($this:ident $value:ident)
        fields = ( $($fields:tt)* )
        schema = ( $($schema:tt)* )
        reads = ( $($reads:tt)* )
        writes = ( $($writes:tt)* )
        rest = ( $fvis:vis $fname:ident : $fty:ty , $($rest:tt)* )
    ) => {
        $crate::record!(@munch
            ($($meta)*) ($vis) ($name) ($this $value)
            fields = ( $($fields)* $fvis $fname : $fty , )
            schema = ( $($schema)*
                $crate::FieldSchema {
                    name: stringify!($fname),
                    tag: ::core::option::Option::None,
                    node: $crate::SchemaNode::Leaf(<$fty as $crate::FieldValue>::KIND),
                }, )
            reads = ( $($reads)*
                [n] if *n == stringify!($fname) => ::core::option::Option::Some(
                    $crate::FieldValue::to_value(&$this.$fname),
                ), )
            writes = ( $($writes)*
                [n] if *n == stringify!($fname) => {
                    $this.$fname = <$fty as $crate::FieldValue>::from_value($value)?;
                    ::core::result::Result::Ok(())
                } )
            rest = ( $($rest)* )
        );
    };

    // All fields consumed: emit the struct and the TableRecord impl.
    (@munch
        ($($meta:tt)*) ($vis:vis) ($name:ident) ($this:ident $value:ident)
        fields = ( $($fields:tt)* )
        schema = ( $($schema:tt)* )
        reads = ( $($reads:tt)* )
        writes = ( $($writes:tt)* )
        rest = ( $(,)? )
    ) => {
        $($meta)*
        $vis struct $name {
            $($fields)*
        }

        impl $crate::TableRecord for $name {
            fn schema() -> &'static [$crate::FieldSchema] {
                static SCHEMA: &[$crate::FieldSchema] = &[$($schema)*];
                SCHEMA
            }

            fn read_path(&self, path: &[&str]) -> ::core::option::Option<$crate::Value<'_>> {
                let $this = self;
                match path {
                    $($reads)*
                    _ => ::core::option::Option::None,
                }
            }

            fn write_path(
                &mut self,
                path: &[&str],
                value: &$crate::Value<'_>,
            ) -> $crate::__private::Result<()> {
                let $this = self;
                let $value = value;
                match path {
                    $($writes)*
                    _ => ::core::result::Result::Err($crate::__private::eyre!(
                        "no field at path {path:?}"
                    )),
                }
            }
        }
    };
}
