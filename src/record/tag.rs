//! Field-tag grammar for record structs.
//!
//! A tag is a comma-separated list: the first token is the column name
//! (empty falls back to the declared field name), the rest are options:
//! `omitempty`, `inline`, `len:N`, `dec:N`, `type:X` (first byte of `X`).
//! The whole tag `-` ignores the field.

use crate::field::FieldType;
use crate::record::SchemaNode;

pub(crate) const DEFAULT_TAG: &str = "dbf";

#[derive(Debug, Default, Clone)]
pub(crate) struct Tag {
    pub(crate) name: String,
    /// Column-name prefix applied to descendants of an `inline` field.
    pub(crate) prefix: String,
    /// True when the field carries no tag at all; untagged columns lose
    /// name ties against tagged ones.
    pub(crate) untagged: bool,
    // Parsed for compatibility; empty-value suppression is not implemented.
    #[allow(dead_code)]
    pub(crate) omit_empty: bool,
    pub(crate) ignore: bool,
    pub(crate) inline: bool,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) length: usize,
    pub(crate) decimals: usize,
}

pub(crate) fn parse_tag(raw: Option<&str>, decl_name: &str, node: &SchemaNode) -> Tag {
    let mut tag = Tag {
        name: decl_name.to_owned(),
        untagged: true,
        ..Tag::default()
    };

    if let Some(raw) = raw.filter(|r| !r.is_empty()) {
        tag.untagged = false;
        let mut tokens = raw.split(',');
        match tokens.next().unwrap_or("") {
            "-" => {
                tag.ignore = true;
                return tag;
            }
            "" => {}
            name => tag.name = name.to_owned(),
        }
        for option in tokens {
            let (key, arg) = option.split_once(':').unwrap_or((option, ""));
            match key {
                "omitempty" => tag.omit_empty = true,
                "inline" => {
                    if matches!(node, SchemaNode::Record { .. }) {
                        tag.inline = true;
                        tag.prefix = raw.split(',').next().unwrap_or("").to_owned();
                    }
                }
                "len" => tag.length = arg.parse().unwrap_or(0),
                "dec" => tag.decimals = arg.parse().unwrap_or(0),
                "type" => tag.field_type = FieldType::parse(arg).ok(),
                _ => {}
            }
        }
    }

    if tag.field_type.is_none() {
        if let SchemaNode::Leaf(kind) = node {
            tag.field_type = kind.inferred_field_type();
        }
    }
    tag
}
