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

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use duplicate::duplicate_item;
use thiserror::Error;

use super::{Structure, ValueReceive, ValueSend};

pub(crate) const NODE_SIGNATURE: u8 = 0x4E;
pub(crate) const RELATIONSHIP_SIGNATURE: u8 = 0x52;
pub(crate) const UNBOUND_RELATIONSHIP_SIGNATURE: u8 = 0x72;
pub(crate) const PATH_SIGNATURE: u8 = 0x50;

/// A node in the graph.
///
/// A `Node` is either created locally (without [`Node::id()`]) to be sent to the server with
/// [`Client::create_node()`](`crate::driver::Client::create_node()`), or it was read from a
/// response.
///
/// Modifications made through [`Node::set_property()`], [`Node::remove_property()`],
/// [`Node::add_label()`] and [`Node::remove_label()`] are tracked separately so that an update
/// only sends what changed.
#[derive(Debug, Clone)]
pub struct Node {
    id: Option<u64>,
    labels: Vec<String>,
    properties: HashMap<String, ValueReceive>,
    created_time: Option<DateTime<Utc>>,
    updated_time: DateTime<Utc>,
    modified: bool,
    committed_property_keys: BTreeSet<String>,
    updated_properties: BTreeMap<String, ValueSend>,
    removed_property_keys: BTreeSet<String>,
    added_labels: Vec<String>,
    removed_labels: Vec<String>,
}

impl Node {
    pub fn new<L, K, V>(
        labels: impl IntoIterator<Item = L>,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        L: Into<String>,
        K: Into<String>,
        V: Into<ValueSend>,
    {
        let mut node = Self::empty();
        for label in labels {
            let label = label.into();
            if !node.labels.contains(&label) {
                node.labels.push(label);
            }
        }
        node.properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), to_receive(v)))
            .collect();
        node.committed_property_keys = node.properties.keys().cloned().collect();
        node
    }

    pub fn with_label<K, V>(label: impl Into<String>, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ValueSend>,
    {
        Self::new([label.into()], properties)
    }

    fn empty() -> Self {
        Self {
            id: None,
            labels: Vec::new(),
            properties: HashMap::new(),
            created_time: None,
            updated_time: Utc::now(),
            modified: false,
            committed_property_keys: BTreeSet::new(),
            updated_properties: BTreeMap::new(),
            removed_property_keys: BTreeSet::new(),
            added_labels: Vec::new(),
            removed_labels: Vec::new(),
        }
    }

    /// Interprets a structure with the node signature and at least 3 fields:
    /// `id: unsigned int`, `labels: [string]`, `properties: map`.
    pub(crate) fn from_structure(structure: &Structure) -> Option<Self> {
        if structure.signature != NODE_SIGNATURE || structure.fields.len() < 3 {
            return None;
        }
        let id = structure.fields[0].as_u64()?;
        let labels = structure.fields[1].as_list()?;
        let properties = structure.fields[2].as_map()?;
        let now = Utc::now();
        let mut node = Self::empty();
        node.id = Some(id);
        node.labels = labels
            .iter()
            .map(|label| label.as_string().map(String::from))
            .collect::<Option<_>>()?;
        node.properties = properties.clone();
        node.committed_property_keys = properties.keys().cloned().collect();
        node.created_time = Some(now);
        node.updated_time = now;
        Some(node)
    }

    /// The id assigned by the server.
    /// [`None`] if the node has not been created yet.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Adds a label and records the change for the next update.
    ///
    /// Re-adding a label removed since the node was read only cancels the removal.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.labels.contains(&label) {
            return;
        }
        let removed_len = self.removed_labels.len();
        self.removed_labels.retain(|l| l != &label);
        if self.removed_labels.len() == removed_len {
            self.added_labels.push(label.clone());
        }
        self.labels.push(label);
        self.touch();
    }

    /// Removes a label and records the change for the next update.
    ///
    /// Removing a label added since the node was read only cancels the addition.
    pub fn remove_label(&mut self, label: &str) {
        if !self.has_label(label) {
            return;
        }
        self.labels.retain(|l| l != label);
        let added_len = self.added_labels.len();
        self.added_labels.retain(|l| l != label);
        if self.added_labels.len() == added_len {
            self.removed_labels.push(String::from(label));
        }
        self.touch();
    }

    pub(crate) fn added_labels(&self) -> &[String] {
        &self.added_labels
    }

    pub(crate) fn removed_labels(&self) -> &[String] {
        &self.removed_labels
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.labels == other.labels
            && properties_eq(&self.properties, &other.properties)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node(id={}, labels={:?}, properties={:?})",
            DisplayId(self.id),
            self.labels,
            self.properties
        )
    }
}

/// Which way a [`Relationship`] points, seen from its `from` node.
///
/// Only used to build requests: relationships read from the server always point from their
/// start node to their end node ([`RelationshipDirection::From`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum RelationshipDirection {
    /// `(from)<-[r]-(to)`
    To,
    /// `(from)-[r]->(to)`
    #[default]
    From,
    /// `(from)-[r]-(to)`, only meaningful for matching.
    Either,
}

/// A relationship between two nodes.
///
/// Once read from a response, [`Relationship::from_node()`] and [`Relationship::to_node()`]
/// give access to the endpoint nodes if they were part of the same response.
/// The relationship never keeps those nodes alive.
#[derive(Debug, Clone)]
pub struct Relationship {
    id: Option<u64>,
    from_node_id: Option<u64>,
    to_node_id: Option<u64>,
    from_node: Option<Weak<Node>>,
    to_node: Option<Weak<Node>>,
    rel_type: String,
    direction: RelationshipDirection,
    properties: HashMap<String, ValueReceive>,
    created_time: Option<DateTime<Utc>>,
    updated_time: DateTime<Utc>,
    modified: bool,
    committed_property_keys: BTreeSet<String>,
    updated_properties: BTreeMap<String, ValueSend>,
    removed_property_keys: BTreeSet<String>,
}

impl Relationship {
    pub fn new<K, V>(
        from: &Node,
        to: &Node,
        rel_type: impl Into<String>,
        direction: RelationshipDirection,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<ValueSend>,
    {
        Self::between(from.id, to.id, rel_type, direction, properties)
    }

    /// Same as [`Relationship::new()`] but only knowing the endpoints' ids.
    pub fn between<K, V>(
        from_node_id: Option<u64>,
        to_node_id: Option<u64>,
        rel_type: impl Into<String>,
        direction: RelationshipDirection,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<ValueSend>,
    {
        let properties: HashMap<_, _> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), to_receive(v)))
            .collect();
        Self {
            id: None,
            from_node_id,
            to_node_id,
            from_node: None,
            to_node: None,
            rel_type: rel_type.into(),
            direction,
            committed_property_keys: properties.keys().cloned().collect(),
            properties,
            created_time: None,
            updated_time: Utc::now(),
            modified: false,
            updated_properties: BTreeMap::new(),
            removed_property_keys: BTreeSet::new(),
        }
    }

    /// Interprets a structure with the relationship signature and at least 5 fields:
    /// `id`, `start node id`, `end node id`, `type: string`, `properties: map`.
    pub(crate) fn from_structure(structure: &Structure) -> Option<Self> {
        if structure.signature != RELATIONSHIP_SIGNATURE || structure.fields.len() < 5 {
            return None;
        }
        let id = structure.fields[0].as_u64()?;
        let from_node_id = structure.fields[1].as_u64()?;
        let to_node_id = structure.fields[2].as_u64()?;
        let rel_type = structure.fields[3].as_string()?;
        let properties = structure.fields[4].as_map()?;
        let now = Utc::now();
        Some(Self {
            id: Some(id),
            from_node_id: Some(from_node_id),
            to_node_id: Some(to_node_id),
            from_node: None,
            to_node: None,
            rel_type: String::from(rel_type),
            direction: RelationshipDirection::From,
            properties: properties.clone(),
            created_time: Some(now),
            updated_time: now,
            modified: false,
            committed_property_keys: properties.keys().cloned().collect(),
            updated_properties: BTreeMap::new(),
            removed_property_keys: BTreeSet::new(),
        })
    }

    /// The id assigned by the server.
    /// [`None`] if the relationship has not been created yet.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn from_node_id(&self) -> Option<u64> {
        self.from_node_id
    }

    pub fn to_node_id(&self) -> Option<u64> {
        self.to_node_id
    }

    /// The start node if it was part of the response this relationship was read from and is
    /// still alive.
    pub fn from_node(&self) -> Option<Arc<Node>> {
        self.from_node.as_ref().and_then(Weak::upgrade)
    }

    /// The end node if it was part of the response this relationship was read from and is still
    /// alive.
    pub fn to_node(&self) -> Option<Arc<Node>> {
        self.to_node.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn link_from_node(&mut self, node: &Arc<Node>) {
        self.from_node = Some(Arc::downgrade(node));
    }

    pub(crate) fn link_to_node(&mut self, node: &Arc<Node>) {
        self.to_node = Some(Arc::downgrade(node));
    }

    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    pub fn direction(&self) -> RelationshipDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: RelationshipDirection) {
        self.direction = direction;
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.from_node_id == other.from_node_id
            && self.to_node_id == other.to_node_id
            && self.rel_type == other.rel_type
            && properties_eq(&self.properties, &other.properties)
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Relationship(id={}, type={}, from={}, to={}, properties={:?})",
            DisplayId(self.id),
            self.rel_type,
            DisplayId(self.from_node_id),
            DisplayId(self.to_node_id),
            self.properties
        )
    }
}

#[duplicate_item(entity; [Node]; [Relationship])]
impl entity {
    pub fn properties(&self) -> &HashMap<String, ValueReceive> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&ValueReceive> {
        self.properties.get(key)
    }

    /// Sets a property and records the change for the next update.
    ///
    /// Setting a property to [`ValueSend::Null`] is the same as removing it.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<ValueSend>) {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            self.remove_property(&key);
            return;
        }
        self.removed_property_keys.remove(&key);
        self.properties.insert(key.clone(), value.clone().into());
        self.updated_properties.insert(key, value);
        self.touch();
    }

    /// Removes a property and records the change for the next update.
    ///
    /// Only keys the object had when it was read are sent as removals.
    pub fn remove_property(&mut self, key: &str) -> Option<ValueReceive> {
        let old = self.properties.remove(key);
        let was_updated = self.updated_properties.remove(key).is_some();
        let was_committed = self.committed_property_keys.contains(key);
        if was_committed {
            self.removed_property_keys.insert(String::from(key));
        }
        if was_committed || was_updated {
            self.touch();
        }
        old
    }

    /// Whether there are local changes that have not been sent to the server.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// When this object was read from the server.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn updated_time(&self) -> DateTime<Utc> {
        self.updated_time
    }

    pub(crate) fn updated_properties(&self) -> &BTreeMap<String, ValueSend> {
        &self.updated_properties
    }

    pub(crate) fn removed_property_keys(&self) -> &BTreeSet<String> {
        &self.removed_property_keys
    }

    fn touch(&mut self) {
        self.modified = true;
        self.updated_time = Utc::now();
    }
}

fn to_receive(value: impl Into<ValueSend>) -> ValueReceive {
    let value: ValueSend = value.into();
    value.into()
}

fn properties_eq(p1: &HashMap<String, ValueReceive>, p2: &HashMap<String, ValueReceive>) -> bool {
    p1.len() == p2.len()
        && p1.iter().all(|(key, v1)| {
            p2.get(key)
                .map(|v2| v1.eq_ignore_opaque(v2))
                .unwrap_or(false)
        })
}

struct DisplayId(Option<u64>);

impl Display for DisplayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            None => write!(f, "?"),
            Some(id) => write!(f, "{id}"),
        }
    }
}

/// Represents a relationship without its start and end nodes.
///
/// This type makes little sense on its own.
/// It's used in [`Path`] instead.
#[derive(Debug, Clone)]
pub struct UnboundRelationship {
    pub id: u64,
    pub rel_type: String,
    pub properties: HashMap<String, ValueReceive>,
}

impl UnboundRelationship {
    pub(crate) fn from_structure(structure: &Structure) -> Option<Self> {
        if structure.signature != UNBOUND_RELATIONSHIP_SIGNATURE || structure.fields.len() < 3 {
            return None;
        }
        Some(Self {
            id: structure.fields[0].as_u64()?,
            rel_type: String::from(structure.fields[1].as_string()?),
            properties: structure.fields[2].as_map()?.clone(),
        })
    }
}

impl PartialEq for UnboundRelationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.rel_type == other.rel_type
            && properties_eq(&self.properties, &other.properties)
    }
}

/// Represents a path in the graph.
///
/// It's not recommended to access the fields directly, but rather use [`Path::traverse()`] because
/// the fields' semantics are rather complicated and mutating them in a way that violates the
/// [invariants](`Path::verify_invariants()`) will cause many methods to panic.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub relationships: Vec<UnboundRelationship>,
    /// Alternating relationship and node indices.
    /// Relationship indices are 1-based, negative if the relationship is traversed backwards.
    pub indices: Vec<isize>,
}

/// Which way a relationship on a [`Path`] is walked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Traversal {
    Forward,
    Backward,
}

impl Path {
    /// Initializes a new `Path` verifying its [invariants](`Path::verify_invariants()`).
    pub(crate) fn new(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        indices: Vec<isize>,
    ) -> Result<Self, PathInvariantError> {
        let path = Self::new_unchecked(nodes, relationships, indices);
        path.verify_invariants().map(|_| path)
    }

    /// Initializes a new `Path` without verifying its [invariants](`Path::verify_invariants()`)
    pub(crate) fn new_unchecked(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        indices: Vec<isize>,
    ) -> Self {
        Self {
            nodes,
            relationships,
            indices,
        }
    }

    /// Interprets a structure with the path signature and at least 3 fields:
    /// `nodes: [node]`, `relationships: [unbound relationship]`, `indices: [int]`.
    ///
    /// Returns [`None`] if any part does not decode or the result is not a valid path.
    pub(crate) fn from_structure(structure: &Structure) -> Option<Self> {
        if structure.signature != PATH_SIGNATURE || structure.fields.len() < 3 {
            return None;
        }
        let nodes = structure.fields[0]
            .as_list()?
            .iter()
            .map(|node| node.as_structure().and_then(Node::from_structure))
            .collect::<Option<Vec<_>>>()?;
        let relationships = structure.fields[1]
            .as_list()?
            .iter()
            .map(|rel| {
                rel.as_structure()
                    .and_then(UnboundRelationship::from_structure)
            })
            .collect::<Option<Vec<_>>>()?;
        let indices = structure.fields[2]
            .as_list()?
            .iter()
            .map(|idx| idx.as_i64().and_then(|idx| isize::try_from(idx).ok()))
            .collect::<Option<Vec<_>>>()?;
        Self::new(nodes, relationships, indices).ok()
    }

    /// Verifies the invariants of the path.
    ///
    /// # Invariants
    ///  * `indices`
    ///    * has an even number of elements
    ///    * odd entries (1st, 3rd, ...) are is in the range
    ///      `-self.relationships.len()..=-1` or `1..=self.relationships.len()`
    ///    * even entries (2nd, 4th, ...) are in the range `0..self.nodes.len()`
    ///  * `nodes` is not empty
    pub fn verify_invariants(&self) -> Result<(), PathInvariantError> {
        if self.nodes.is_empty() {
            return Err(PathInvariantError::EmptyNodes {});
        }
        if self.indices.len() % 2 != 0 {
            return Err(PathInvariantError::UnevenIndicesCount {});
        }
        let rel_len = self.relationships.len();
        let rel_len_i = isize::try_from(rel_len)
            .ok()
            .filter(|len| *len < isize::MAX)
            .ok_or(PathInvariantError::TooManyRelationships {})?;
        let node_len = self.nodes.len();
        let node_len_i =
            isize::try_from(node_len).map_err(|_| PathInvariantError::TooManyNodes {})?;
        for (i, idx) in self.indices.iter().enumerate() {
            if i % 2 == 0 {
                // relationship index
                if !(-rel_len_i..=-1).contains(idx) && !(1..=rel_len_i).contains(idx) {
                    return Err(PathInvariantError::EvenIndexOutOfRange {
                        index: i,
                        value: *idx,
                        relationships_len: rel_len,
                    });
                }
            } else {
                // node index
                if !(0..node_len_i).contains(idx) {
                    return Err(PathInvariantError::OddIndexOutOfRange {
                        index: i,
                        value: *idx,
                        nodes_len: node_len,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the nodes and relationships in the order they appear on the path.
    ///
    /// The first element of the tuple is the start node of the path.
    /// The second element is a list of hops, each being the way the relationship is walked, the
    /// relationship, and the node reached.
    ///
    /// # Panics
    /// Panics if `self.nodes`, `self.relationships` or `self.indices` has been tampered with, in
    /// a way that violates the [invariants of a `Path`](`Path::verify_invariants()`).
    pub fn traverse(&self) -> (&Node, Vec<(Traversal, &UnboundRelationship, &Node)>) {
        let mut result = Vec::with_capacity(self.indices.len() / 2);
        let mut index_iter = self.indices.iter();
        while let Some(mut relationship_idx) = index_iter.next().copied() {
            let next_node_idx: usize = index_iter
                .next()
                .expect("indices must contain an even number of elements")
                .to_owned()
                .try_into()
                .expect("2nd, 4th, ... entry in indices must be >= 0");
            let next_node = &self.nodes[next_node_idx];
            let traversal = if relationship_idx < 0 {
                relationship_idx = -relationship_idx;
                Traversal::Backward
            } else {
                Traversal::Forward
            };
            relationship_idx -= 1;
            let relationship = {
                let relationship_idx: usize = relationship_idx
                    .try_into()
                    .expect("odd indices entries cannot be 0");
                &self.relationships[relationship_idx]
            };
            result.push((traversal, relationship, next_node));
        }
        (&self.nodes[0], result)
    }
}

/// # Panics
/// Panics if [`Path`'s invariants](`Path::verify_invariants()`) are violated.
impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (start_node, hops) = self.traverse();
        write!(f, "({})", DisplayId(start_node.id))?;
        for (traversal, relationship, next_node) in hops {
            match traversal {
                Traversal::Forward => {
                    write!(f, "-[{}]->({})", relationship.id, DisplayId(next_node.id))?;
                }
                Traversal::Backward => {
                    write!(f, "<-[{}]-({})", relationship.id, DisplayId(next_node.id))?;
                }
            }
        }
        Ok(())
    }
}

/// Represents an error that occurred because a [Path's invariants](`Path::verify_invariants()`)
/// were violated.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum PathInvariantError {
    #[error("nodes must not be empty")]
    #[non_exhaustive]
    EmptyNodes {},
    #[error("indices must have an even number of elements")]
    #[non_exhaustive]
    UnevenIndicesCount {},
    #[error("number of relationships must be <= {max} (isize::MAX - 1)", max = isize::MAX - 1)]
    #[non_exhaustive]
    TooManyRelationships {},
    #[error("number of nodes must be <= {max} (isize::MAX)", max = isize::MAX)]
    #[non_exhaustive]
    TooManyNodes {},
    #[error("indices[{index}]={value} must be in the range -{relationships_len}..=-1 or 1..={relationships_len}")]
    #[non_exhaustive]
    EvenIndexOutOfRange {
        index: usize,
        value: isize,
        relationships_len: usize,
    },
    #[error("indices[{index}]={value} must be in the range 0..{nodes_len}")]
    #[non_exhaustive]
    OddIndexOutOfRange {
        index: usize,
        value: isize,
        nodes_len: usize,
    },
}

/// An application-level node id, looked up through the server's `_id()` function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    Int(i64),
    String(String),
}

impl From<&NodeId> for ValueSend {
    fn from(id: &NodeId) -> Self {
        match id {
            NodeId::Int(id) => ValueSend::Integer(*id),
            NodeId::String(id) => ValueSend::String(id.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use rstest::rstest;

    use crate::macros::hash_map;

    pub(crate) fn node_structure(id: u64, labels: &[&str]) -> ValueReceive {
        ValueReceive::Structure(Structure::new(
            NODE_SIGNATURE,
            vec![
                ValueReceive::Integer(id as i64),
                ValueReceive::List(
                    labels
                        .iter()
                        .map(|l| ValueReceive::String(String::from(*l)))
                        .collect(),
                ),
                ValueReceive::Map(hash_map!(
                    String::from("name") => ValueReceive::String(format!("n{id}"))
                )),
            ],
        ))
    }

    pub(crate) fn relationship_structure(id: u64, from: u64, to: u64) -> ValueReceive {
        ValueReceive::Structure(Structure::new(
            RELATIONSHIP_SIGNATURE,
            vec![
                ValueReceive::Integer(id as i64),
                ValueReceive::Integer(from as i64),
                ValueReceive::Integer(to as i64),
                ValueReceive::String(String::from("KNOWS")),
                ValueReceive::Map(HashMap::new()),
            ],
        ))
    }

    fn unbound_relationship_structure(id: u64) -> ValueReceive {
        ValueReceive::Structure(Structure::new(
            UNBOUND_RELATIONSHIP_SIGNATURE,
            vec![
                ValueReceive::Integer(id as i64),
                ValueReceive::String(String::from("KNOWS")),
                ValueReceive::Map(HashMap::new()),
            ],
        ))
    }

    pub(crate) fn path_structure() -> ValueReceive {
        // (1)<-[10]-(2)-[11]->(1)-[10]->(3)
        ValueReceive::Structure(Structure::new(
            PATH_SIGNATURE,
            vec![
                ValueReceive::List(vec![
                    node_structure(1, &["Person"]),
                    node_structure(2, &["Person"]),
                    node_structure(3, &["Person"]),
                ]),
                ValueReceive::List(vec![
                    unbound_relationship_structure(10),
                    unbound_relationship_structure(11),
                ]),
                ValueReceive::List(
                    [-1, 1, 2, 0, 1, 2]
                        .into_iter()
                        .map(ValueReceive::Integer)
                        .collect(),
                ),
            ],
        ))
    }

    fn get_path() -> Path {
        Path::from_structure(path_structure().as_structure().unwrap()).unwrap()
    }

    #[test]
    fn test_node_from_structure() {
        let node = Node::from_structure(node_structure(7, &["A", "B"]).as_structure().unwrap())
            .unwrap();
        assert_eq!(node.id(), Some(7));
        assert_eq!(node.labels(), ["A", "B"]);
        assert_eq!(
            node.property("name"),
            Some(&ValueReceive::String(String::from("n7")))
        );
        assert!(node.created_time().is_some());
        assert!(!node.is_modified());
    }

    #[rstest]
    #[case(Structure::new(NODE_SIGNATURE, vec![ValueReceive::Integer(1), ValueReceive::List(vec![])]))]
    #[case(Structure::new(NODE_SIGNATURE, vec![
        ValueReceive::Integer(-1), ValueReceive::List(vec![]), ValueReceive::Map(HashMap::new())
    ]))]
    #[case(Structure::new(NODE_SIGNATURE, vec![
        ValueReceive::Integer(1), ValueReceive::Map(HashMap::new()), ValueReceive::Map(HashMap::new())
    ]))]
    #[case(Structure::new(RELATIONSHIP_SIGNATURE, vec![
        ValueReceive::Integer(1), ValueReceive::List(vec![]), ValueReceive::Map(HashMap::new())
    ]))]
    #[case(Structure::new(NODE_SIGNATURE, vec![
        ValueReceive::Integer(1),
        ValueReceive::List(vec![ValueReceive::Integer(5), ValueReceive::Boolean(true)]),
        ValueReceive::Map(HashMap::new())
    ]))]
    fn test_node_from_malformed_structure(#[case] structure: Structure) {
        assert_eq!(Node::from_structure(&structure), None);
    }

    #[test]
    fn test_relationship_from_structure() {
        let rel = Relationship::from_structure(
            relationship_structure(10, 1, 2).as_structure().unwrap(),
        )
        .unwrap();
        assert_eq!(rel.id(), Some(10));
        assert_eq!(rel.from_node_id(), Some(1));
        assert_eq!(rel.to_node_id(), Some(2));
        assert_eq!(rel.rel_type(), "KNOWS");
        assert!(rel.from_node().is_none());
        assert!(rel.to_node().is_none());
    }

    #[test]
    fn test_node_tracks_property_changes() {
        let mut node = Node::with_label("Person", [("name", "Alice"), ("city", "Berlin")]);
        assert!(!node.is_modified());

        node.set_property("age", 42);
        node.remove_property("city");
        assert!(node.is_modified());
        assert_eq!(node.property("age"), Some(&ValueReceive::Integer(42)));
        assert_eq!(node.property("city"), None);
        assert_eq!(
            node.updated_properties(),
            &BTreeMap::from([(String::from("age"), ValueSend::Integer(42))])
        );
        assert_eq!(
            node.removed_property_keys(),
            &BTreeSet::from([String::from("city")])
        );

        // re-adding a removed key cancels the removal
        node.set_property("city", "Paris");
        assert!(node.removed_property_keys().is_empty());
        // setting null removes
        node.set_property("age", ValueSend::Null);
        assert!(node.updated_properties().contains_key("city"));
        assert!(!node.updated_properties().contains_key("age"));
        // `age` was only ever set locally
        assert!(node.removed_property_keys().is_empty());
        assert_eq!(node.property("age"), None);
    }

    #[test]
    fn test_removing_unknown_property_records_nothing() {
        let mut node = Node::from_structure(node_structure(1, &["A"]).as_structure().unwrap())
            .unwrap();
        assert_eq!(node.remove_property("missing"), None);
        assert!(node.removed_property_keys().is_empty());
        assert!(!node.is_modified());

        node.remove_property("name");
        assert_eq!(
            node.removed_property_keys(),
            &BTreeSet::from([String::from("name")])
        );
    }

    #[test]
    fn test_node_tracks_label_changes() {
        let mut node = Node::with_label("Person", Vec::<(String, ValueSend)>::new());
        node.add_label("Admin");
        node.add_label("Admin");
        node.remove_label("Person");
        assert_eq!(node.labels(), ["Admin"]);
        assert_eq!(node.added_labels(), ["Admin"]);
        assert_eq!(node.removed_labels(), ["Person"]);

        node.add_label("Person");
        assert!(node.removed_labels().is_empty());
        assert!(node.added_labels().contains(&String::from("Admin")));
        assert!(!node.added_labels().contains(&String::from("Person")));
        node.remove_label("Admin");
        assert!(node.added_labels().is_empty());
        assert!(node.removed_labels().is_empty());
        assert_eq!(node.labels(), ["Person"]);

        node.remove_label("Unknown");
        assert!(node.removed_labels().is_empty());
    }

    #[test]
    fn test_node_equality_ignores_opaque_values() {
        let mut s1 = node_structure(1, &["A"]).as_structure().unwrap().clone();
        let mut s2 = s1.clone();
        let ValueReceive::Map(props) = &mut s1.fields[2] else {
            panic!("node structure without property map");
        };
        props.insert(
            String::from("location"),
            ValueReceive::Structure(Structure::new(0x58, vec![ValueReceive::Integer(4326)])),
        );
        let ValueReceive::Map(props) = &mut s2.fields[2] else {
            panic!("node structure without property map");
        };
        props.insert(
            String::from("location"),
            ValueReceive::Structure(Structure::new(0x58, vec![ValueReceive::Integer(7203)])),
        );
        let n1 = Node::from_structure(&s1).unwrap();
        let n2 = Node::from_structure(&s2).unwrap();
        assert_eq!(n1, n2);

        let mut n3 = n2.clone();
        n3.set_property("name", "other");
        assert_ne!(n1, n3);
    }

    #[test]
    fn test_path_display() {
        let path = get_path();
        assert_eq!(path.to_string(), "(1)<-[10]-(2)-[11]->(1)-[10]->(3)");
    }

    #[test]
    fn test_path_traverse() {
        let path = get_path();
        let expected_node_ids = [1, 2, 1, 3];
        let expected_traversals = [Traversal::Backward, Traversal::Forward, Traversal::Forward];
        let expected_relationship_ids = [10, 11, 10];

        let (start_node, hops) = path.traverse();
        assert_eq!(start_node.id(), Some(expected_node_ids[0]));
        assert_eq!(hops.len(), 3);
        for (i, (traversal, relationship, next_node)) in hops.iter().enumerate() {
            assert_eq!(traversal, &expected_traversals[i]);
            assert_eq!(relationship.id, expected_relationship_ids[i]);
            assert_eq!(next_node.id(), Some(expected_node_ids[i + 1]));
        }
    }

    #[rstest]
    #[case(vec![1], Err(PathInvariantError::UnevenIndicesCount {}))]
    #[case(vec![0, 1], Err(PathInvariantError::EvenIndexOutOfRange {
        index: 0,
        value: 0,
        relationships_len: 2
    }))]
    #[case(vec![3, 1], Err(PathInvariantError::EvenIndexOutOfRange {
        index: 0,
        value: 3,
        relationships_len: 2
    }))]
    #[case(vec![1, 3], Err(PathInvariantError::OddIndexOutOfRange {
        index: 1,
        value: 3,
        nodes_len: 3
    }))]
    #[case(vec![-2, 2], Ok(()))]
    fn test_path_invariants(
        #[case] indices: Vec<isize>,
        #[case] expected: Result<(), PathInvariantError>,
    ) {
        let mut path = get_path();
        path.indices = indices;
        assert_eq!(path.verify_invariants(), expected);
    }

    #[test]
    fn test_path_without_nodes_is_invalid() {
        let path = Path::new_unchecked(vec![], vec![], vec![]);
        assert_eq!(
            path.verify_invariants(),
            Err(PathInvariantError::EmptyNodes {})
        );
    }

    #[test]
    fn test_malformed_path_is_not_a_path() {
        let mut structure = path_structure().as_structure().unwrap().clone();
        structure.fields[2] = ValueReceive::List(vec![ValueReceive::Integer(5)]);
        assert_eq!(Path::from_structure(&structure), None);
    }
}
