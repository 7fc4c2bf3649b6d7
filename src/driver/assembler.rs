// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use super::io::bolt::Frame;
use super::query_result::{QueryResult, Record, ResponseItem, Row};
use crate::value::graph::{Node, Path, Relationship};
use crate::ValueReceive;

/// A classified candidate value before it's placed into a row.
#[derive(Debug)]
enum Cell {
    Node(u64),
    Relationship(u64),
    Item(ResponseItem),
}

/// Adds the content of `frames` to `result`.
///
/// * The field names are taken from the first metadata map carrying `fields`.
/// * All recognized statistics are loaded (later values win).
/// * All values of all list items (i.e., RECORD messages) are laid out row by row, field by
///   field.
///   Without fields, all of them end up in one row.
/// * Nodes and relationships are only added if `result` doesn't already know their id.
///   Paths and rows are always appended.
/// * Relationships get linked to their start and end nodes if those are part of the same
///   `frames`.
///
/// Anything that cannot be interpreted is kept as [`ResponseItem::Record`].
/// Hence, this never fails.
pub fn assemble(result: &mut QueryResult, frames: &[Frame]) {
    let items = || frames.iter().flat_map(|frame| frame.items.iter());

    if let Some(fields) = items().find_map(|item| {
        item.as_map()
            .and_then(|meta| meta.get("fields"))
            .and_then(ValueReceive::as_list)
    }) {
        result.fields = fields
            .iter()
            .filter_map(ValueReceive::as_string)
            .map(|field| Arc::new(String::from(field)))
            .collect();
    }

    for meta in items().filter_map(ValueReceive::as_map) {
        result.stats.load_meta(meta);
    }

    let mut batch = Batch::default();
    let cells: Vec<Cell> = items()
        .filter_map(ValueReceive::as_list)
        .flatten()
        .map(|value| classify(value, &mut batch, result))
        .collect();
    let Batch {
        nodes: batch_nodes,
        relationships: batch_relationships,
        ..
    } = batch;
    debug!(
        "assembling {} cell(s): {} node(s), {} relationship(s)",
        cells.len(),
        batch_nodes.len(),
        batch_relationships.len()
    );

    let batch_node_ids: HashSet<u64> = batch_nodes.keys().copied().collect();
    for (id, node) in batch_nodes {
        result.nodes.entry(id).or_insert_with(|| Arc::new(node));
    }

    for mut relationship in batch_relationships {
        let Some(id) = relationship.id() else {
            continue;
        };
        let Entry::Vacant(entry) = result.relationships.entry(id) else {
            continue;
        };
        let batch_node = |end: &str, node_id: Option<u64>| {
            let node = node_id
                .filter(|node_id| batch_node_ids.contains(node_id))
                .and_then(|node_id| result.nodes.get(&node_id));
            if node.is_none() {
                warn!(
                    "{} node {:?} of relationship {} is not part of the response, \
                     leaving it unlinked",
                    end, node_id, id
                );
            }
            node
        };
        if let Some(node) = batch_node("start", relationship.from_node_id()) {
            relationship.link_from_node(node);
        }
        if let Some(node) = batch_node("end", relationship.to_node_id()) {
            relationship.link_to_node(node);
        }
        entry.insert(Arc::new(relationship));
    }

    let field_count = result.fields.len();
    let mut row = Row::new();
    for (i, cell) in cells.into_iter().enumerate() {
        if field_count > 0 && i > 0 && i % field_count == 0 {
            result.rows.push(std::mem::take(&mut row));
        }
        let key = match field_count {
            0 => None,
            _ => Some(Arc::clone(&result.fields[i % field_count])),
        };
        let item = match cell {
            Cell::Node(id) => result
                .nodes
                .get(&id)
                .map(|node| ResponseItem::Node(Arc::clone(node))),
            Cell::Relationship(id) => result
                .relationships
                .get(&id)
                .map(|rel| ResponseItem::Relationship(Arc::clone(rel))),
            Cell::Item(item) => Some(item),
        };
        row.push(key, item.unwrap_or(ResponseItem::Null));
    }
    if !row.is_empty() {
        result.rows.push(row);
    }
}

/// Graph entities decoded from one call to [`assemble()`], first occurrence per id.
#[derive(Debug, Default)]
struct Batch {
    nodes: HashMap<u64, Node>,
    relationships: Vec<Relationship>,
    relationship_ids: HashSet<u64>,
}

fn classify(value: &ValueReceive, batch: &mut Batch, result: &mut QueryResult) -> Cell {
    if let Some(structure) = value.as_structure() {
        if let Some(node) = Node::from_structure(structure) {
            // ids from the server are always set
            if let Some(id) = node.id() {
                batch.nodes.entry(id).or_insert(node);
                return Cell::Node(id);
            }
        }
        if let Some(relationship) = Relationship::from_structure(structure) {
            if let Some(id) = relationship.id() {
                if batch.relationship_ids.insert(id) {
                    batch.relationships.push(relationship);
                }
                return Cell::Relationship(id);
            }
        }
        if let Some(path) = Path::from_structure(structure) {
            result.paths.push(path.clone());
            return Cell::Item(ResponseItem::Path(path));
        }
    }
    if let Some(value) = value.as_u64() {
        return Cell::Item(ResponseItem::UnsignedInteger(value));
    }
    if let Some(value) = value.as_i64() {
        return Cell::Item(ResponseItem::Integer(value));
    }
    Cell::Item(match value {
        ValueReceive::Float(f) => ResponseItem::Float(*f),
        ValueReceive::String(s) => ResponseItem::String(s.clone()),
        ValueReceive::Boolean(b) => ResponseItem::Boolean(*b),
        ValueReceive::Null => ResponseItem::Null,
        _ => ResponseItem::Record(Record::new(value.clone())),
    })
}
