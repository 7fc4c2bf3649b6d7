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

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use super::summary::QueryStats;
use crate::value::graph::{Node, Path, Relationship};
use crate::ValueReceive;

/// Wraps a decoded value that has no more specific [`ResponseItem`] variant, e.g., lists, maps,
/// bytes, or structures of unknown type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(ValueReceive);

impl Record {
    pub(crate) fn new(value: ValueReceive) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &ValueReceive {
        &self.0
    }

    pub fn into_value(self) -> ValueReceive {
        self.0
    }
}

/// A single cell of a [`Row`].
///
/// Nodes and relationships are shared with [`QueryResult::nodes()`] and
/// [`QueryResult::relationships()`], i.e., they point to the very same instances.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseItem {
    Node(Arc<Node>),
    Relationship(Arc<Relationship>),
    Path(Path),
    UnsignedInteger(u64),
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Record(Record),
}

impl ResponseItem {
    pub fn as_node(&self) -> Option<&Arc<Node>> {
        match self {
            ResponseItem::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Arc<Relationship>> {
        match self {
            ResponseItem::Relationship(relationship) => Some(relationship),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ResponseItem::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Integers are returned regardless of whether they were decoded as signed or unsigned.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ResponseItem::Integer(i) => Some(*i),
            ResponseItem::UnsignedInteger(i) => (*i).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ResponseItem::UnsignedInteger(i) => Some(*i),
            ResponseItem::Integer(i) => (*i).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ResponseItem::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ResponseItem::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResponseItem::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResponseItem::Null)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            ResponseItem::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// One row of a [`QueryResult`].
///
/// Cells are keyed by the field they belong to.
/// If the result has no fields, cells have no key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(Option<Arc<String>>, Option<ResponseItem>)>,
}

impl Row {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn push(&mut self, key: Option<Arc<String>>, item: ResponseItem) {
        self.entries.push((key, Some(item)));
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the keys of the row.
    /// The order of the keys corresponds to the order of the values.
    pub fn keys(&self) -> impl Iterator<Item = Option<Arc<String>>> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|_| key.clone()))
    }

    /// Iterate over the values of the row.
    pub fn values(&self) -> impl Iterator<Item = &ResponseItem> {
        self.entries
            .iter()
            .map(|(_, value)| value)
            .filter_map(Option::as_ref)
    }

    pub fn into_values(self) -> impl Iterator<Item = ResponseItem> {
        self.entries.into_iter().filter_map(|(_, value)| value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Option<Arc<String>>, &ResponseItem)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.clone(), value)))
    }

    /// Get the value for the given field or [`None`] if the field does not exist.
    pub fn value(&self, key: &str) -> Option<&ResponseItem> {
        self.entries.iter().find_map(|(k, v)| match (k, v) {
            (Some(k), Some(v)) if k.deref() == key => Some(v),
            _ => None,
        })
    }

    /// Same as [`Row::value()`], but removes the entry and returns an owned value.
    pub fn take_value(&mut self, key: &str) -> Option<ResponseItem> {
        self.entries
            .iter_mut()
            .find(|(k, v)| v.is_some() && k.as_deref().map(String::as_str) == Some(key))
            .and_then(|(_, v)| v.take())
    }

    /// Get the n-th value of the row.
    pub fn get(&self, index: usize) -> Option<&ResponseItem> {
        self.values().nth(index)
    }
}

/// The assembled result of one or more batches of response messages.
///
/// See [`assemble()`](`super::assemble()`).
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub(crate) fields: Vec<Arc<String>>,
    pub(crate) nodes: HashMap<u64, Arc<Node>>,
    pub(crate) relationships: HashMap<u64, Arc<Relationship>>,
    pub(crate) paths: Vec<Path>,
    pub(crate) rows: Vec<Row>,
    pub(crate) stats: QueryStats,
}

impl QueryResult {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn fields(&self) -> &[Arc<String>] {
        &self.fields
    }

    /// All nodes of the result by their id.
    pub fn nodes(&self) -> &HashMap<u64, Arc<Node>> {
        &self.nodes
    }

    pub fn node(&self, id: u64) -> Option<&Arc<Node>> {
        self.nodes.get(&id)
    }

    /// All relationships of the result by their id.
    pub fn relationships(&self) -> &HashMap<u64, Arc<Relationship>> {
        &self.relationships
    }

    pub fn relationship(&self, id: u64) -> Option<&Arc<Relationship>> {
        self.relationships.get(&id)
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// All nodes in the order they appear in the rows, without duplicates.
    pub fn row_nodes(&self) -> Vec<Arc<Node>> {
        let mut nodes: Vec<Arc<Node>> = Vec::new();
        for node in self.rows.iter().flat_map(Row::values).filter_map(ResponseItem::as_node) {
            if !nodes.iter().any(|n| Arc::ptr_eq(n, node)) {
                nodes.push(Arc::clone(node));
            }
        }
        nodes
    }

    /// All relationships in the order they appear in the rows, without duplicates.
    pub fn row_relationships(&self) -> Vec<Arc<Relationship>> {
        let mut relationships: Vec<Arc<Relationship>> = Vec::new();
        for relationship in self
            .rows
            .iter()
            .flat_map(Row::values)
            .filter_map(ResponseItem::as_relationship)
        {
            if !relationships.iter().any(|r| Arc::ptr_eq(r, relationship)) {
                relationships.push(Arc::clone(relationship));
            }
        }
        relationships
    }
}
