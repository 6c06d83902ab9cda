//! # Column Plans
//!
//! A plan is the distilled column list of a record type: for every surviving
//! leaf, the column name, the access path into the struct, the wire type and
//! the declared length/decimals. Plans drive both the encoder (field
//! derivation, value extraction) and the decoder (value assignment).
//!
//! ## Resolution rules
//!
//! The schema is walked breadth first. Nested record fields are flattened
//! into the outer level; an `inline` tag flattens under a name prefix. When
//! two leaves claim the same column name, the shallower one wins; at equal
//! depth a tagged leaf beats untagged ones, and remaining ties drop the
//! column as ambiguous. Surviving entries are ordered by their declaration
//! index paths. A visited set over (type, prefix) keeps cyclic types finite.
//!
//! Plans are cached per (record type, tag name); the cache is read-mostly
//! behind an `RwLock`, and racing builders produce equivalent plans.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::field::FieldType;
use crate::record::tag::{parse_tag, Tag, DEFAULT_TAG};
use crate::record::{FieldSchema, SchemaNode, TableRecord};
use crate::value::ValueKind;

type IndexPath = SmallVec<[usize; 4]>;
type NamePath = SmallVec<[&'static str; 4]>;

/// One column of a plan.
pub(crate) struct PlanEntry {
    pub(crate) name: String,
    pub(crate) path: NamePath,
    index: IndexPath,
    /// `None` for a date leaf whose tag never declared `type:D`; such a
    /// column decodes by kind but cannot derive a field descriptor.
    pub(crate) field_type: Option<FieldType>,
    pub(crate) kind: ValueKind,
    pub(crate) length: usize,
    pub(crate) decimals: usize,
}

/// Ordered column list for one (record type, tag name) pair.
pub(crate) struct Plan {
    pub(crate) entries: Vec<PlanEntry>,
}

struct Candidate {
    name: String,
    path: NamePath,
    index: IndexPath,
    kind: ValueKind,
    tag: Tag,
}

struct Node {
    schema: &'static [FieldSchema],
    type_id: TypeId,
    prefix: String,
    path: NamePath,
    index: IndexPath,
}

fn insert_candidate(columns: &mut HashMap<String, Vec<Candidate>>, candidate: Candidate) {
    match columns.get_mut(&candidate.name) {
        None => {
            columns.insert(candidate.name.clone(), vec![candidate]);
        }
        Some(found) => {
            // The walk is breadth first, so an existing entry is at most as
            // deep: a deeper duplicate loses outright.
            if found[0].index.len() != candidate.index.len() {
                return;
            }
            if !candidate.tag.untagged {
                found.insert(0, candidate);
            } else {
                found.push(candidate);
            }
        }
    }
}

fn build_plan(schema: &'static [FieldSchema], type_id: TypeId) -> Plan {
    let mut queue: Vec<Node> = vec![Node {
        schema,
        type_id,
        prefix: String::new(),
        path: NamePath::new(),
        index: IndexPath::new(),
    }];
    let mut visited: HashSet<(TypeId, String)> = HashSet::new();
    let mut columns: HashMap<String, Vec<Candidate>> = HashMap::new();

    let mut head = 0;
    while head < queue.len() {
        let node_pos = head;
        head += 1;
        if !visited.insert((queue[node_pos].type_id, queue[node_pos].prefix.clone())) {
            continue;
        }

        let fields = queue[node_pos].schema;
        for (i, field) in fields.iter().enumerate() {
            let tag = parse_tag(field.tag, field.name, &field.node);
            if tag.ignore {
                continue;
            }

            match &field.node {
                SchemaNode::Record {
                    type_id,
                    schema: child_schema,
                } => {
                    let node = &queue[node_pos];
                    let prefix = if tag.inline {
                        format!("{}{}", node.prefix, tag.prefix)
                    } else {
                        node.prefix.clone()
                    };
                    let mut path = node.path.clone();
                    path.push(field.name);
                    let mut index = node.index.clone();
                    index.push(i);
                    queue.push(Node {
                        schema: child_schema(),
                        type_id: type_id(),
                        prefix,
                        path,
                        index,
                    });
                }
                SchemaNode::Leaf(kind) => {
                    let node = &queue[node_pos];
                    let depth = node.index.len();
                    let name = format!("{}{}", node.prefix, tag.name);
                    let mut path = node.path.clone();
                    path.push(field.name);
                    let mut index = node.index.clone();
                    index.push(i);

                    // Nodes with the same shape queued at this depth were
                    // deduplicated by the visited set but still contribute
                    // their own copy of every column, so that duplicate
                    // subtrees surface as ambiguities.
                    let mut mirrored: Vec<Candidate> = Vec::new();
                    for other in &queue[head..] {
                        if other.index.len() == depth
                            && other.type_id == node.type_id
                            && other.prefix == node.prefix
                        {
                            let mut path = other.path.clone();
                            path.push(field.name);
                            let mut index = other.index.clone();
                            index.push(i);
                            mirrored.push(Candidate {
                                name: name.clone(),
                                path,
                                index,
                                kind: *kind,
                                tag: tag.clone(),
                            });
                        }
                    }

                    insert_candidate(
                        &mut columns,
                        Candidate {
                            name,
                            path,
                            index,
                            kind: *kind,
                            tag,
                        },
                    );
                    for candidate in mirrored {
                        insert_candidate(&mut columns, candidate);
                    }
                }
            }
        }
    }

    let mut entries: Vec<PlanEntry> = Vec::with_capacity(columns.len());
    for (_, mut found) in columns {
        // Keep the leading run with the taggedness of the winner; a tagged
        // candidate prepended itself, so the run is tagged when one exists.
        if let Some(cut) = found
            .iter()
            .position(|c| c.tag.untagged != found[0].tag.untagged)
        {
            found.truncate(cut);
        }
        if found.len() > 1 {
            continue;
        }
        let candidate = found.remove(0);
        entries.push(PlanEntry {
            name: candidate.name,
            path: candidate.path,
            index: candidate.index,
            field_type: candidate.tag.field_type,
            kind: candidate.kind,
            length: candidate.tag.length,
            decimals: candidate.tag.decimals,
        });
    }
    entries.sort_by(|a, b| a.index.cmp(&b.index));

    Plan { entries }
}

type PlanKey = (TypeId, String);

static PLAN_CACHE: LazyLock<RwLock<HashMap<PlanKey, Arc<Plan>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Cached plan for a record type under a tag name (empty = `"dbf"`).
pub(crate) fn plan_of<T: TableRecord>(tag: &str) -> Arc<Plan> {
    let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
    let key = (TypeId::of::<T>(), tag.to_owned());

    if let Some(plan) = PLAN_CACHE.read().get(&key) {
        return Arc::clone(plan);
    }

    let plan = Arc::new(build_plan(T::schema(), TypeId::of::<T>()));
    let mut cache = PLAN_CACHE.write();
    Arc::clone(cache.entry(key).or_insert(plan))
}

/// Column names a record type maps to, in plan order. An empty tag selects
/// the default `"dbf"` tag.
pub fn header_columns<T: TableRecord>(tag: &str) -> Vec<String> {
    plan_of::<T>(tag)
        .entries
        .iter()
        .map(|e| e.name.clone())
        .collect()
}
