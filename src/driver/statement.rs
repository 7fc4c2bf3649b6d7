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

//! Cypher statements for node and relationship CRUD.
//!
//! Properties are emitted in key order so that equal input yields the same statement.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;

use super::io::bolt::Request;
use crate::error::{OgmError, Result};
use crate::value::graph::{Node, NodeId, Relationship, RelationshipDirection};
use crate::{ValueReceive, ValueSend};

const NODE_ALIAS: &str = "node";
const FROM_ALIAS: &str = "from";
const TO_ALIAS: &str = "to";
const RELATIONSHIP_ALIAS: &str = "rel";
pub(crate) const DEFAULT_LIMIT: u64 = 25;

/// Filter for [`Client::get_nodes()`](`super::Client::get_nodes()`).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeQuery {
    pub(crate) labels: Vec<String>,
    pub(crate) properties: HashMap<String, ValueSend>,
    pub(crate) skip: u64,
    pub(crate) limit: u64,
}

impl Default for NodeQuery {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            properties: HashMap::new(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl NodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ValueSend>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: HashMap<String, ValueSend>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// `0` means no limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

/// Filter for [`Client::get_relationships()`](`super::Client::get_relationships()`).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipQuery {
    pub(crate) rel_type: String,
    pub(crate) properties: HashMap<String, ValueSend>,
    pub(crate) skip: u64,
    pub(crate) limit: u64,
}

impl RelationshipQuery {
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            properties: HashMap::new(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ValueSend>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: HashMap<String, ValueSend>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// `0` means no limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

pub(crate) fn create_node(node: &Node) -> Result<Request> {
    let mut parameters = HashMap::new();
    let pattern = node_pattern(NODE_ALIAS, node, "", &mut parameters)?;
    Ok(Request::run(
        format!("CREATE {} RETURN {}", pattern, escape(NODE_ALIAS)),
        parameters,
    ))
}

pub(crate) fn create_nodes(nodes: &[Node]) -> Result<Request> {
    if nodes.is_empty() {
        return Err(OgmError::invalid_request("no nodes to create"));
    }
    let mut parameters = HashMap::new();
    let mut patterns = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let alias = format!("{NODE_ALIAS}{i}");
        patterns.push(node_pattern(&alias, node, &i.to_string(), &mut parameters)?);
    }
    let aliases = (0..nodes.len()).map(|i| escape(&format!("{NODE_ALIAS}{i}")));
    Ok(Request::run(
        format!(
            "CREATE {} RETURN {}",
            patterns.join(", "),
            aliases.format(",")
        ),
        parameters,
    ))
}

pub(crate) fn update_node(node: &Node) -> Result<Request> {
    let id = node_id(node, "update")?;
    let alias = escape(NODE_ALIAS);
    let mut parameters = HashMap::new();
    let mut lines = vec![
        format!("MATCH ({alias})"),
        format!("WHERE id({alias}) = {id}"),
    ];
    let patch = Patch::of_node(&alias, node, "", &mut parameters);
    lines.extend(patch.into_lines());
    lines.push(format!("RETURN {alias}"));
    Ok(Request::run(lines.join("\n"), parameters))
}

pub(crate) fn update_nodes(nodes: &[Node]) -> Result<Request> {
    if nodes.is_empty() {
        return Err(OgmError::invalid_request("no nodes to update"));
    }
    let mut parameters = HashMap::new();
    let mut aliases = Vec::with_capacity(nodes.len());
    let mut conditions = Vec::with_capacity(nodes.len());
    let mut patch = Patch::default();
    for (i, node) in nodes.iter().enumerate() {
        let id = node_id(node, "update")?;
        let alias = escape(&format!("{NODE_ALIAS}{i}"));
        conditions.push(format!("id({alias}) = {id}"));
        patch.extend(Patch::of_node(&alias, node, &i.to_string(), &mut parameters));
        aliases.push(alias);
    }
    let mut lines = vec![
        format!("MATCH {}", aliases.iter().map(|a| format!("({a})")).join(", ")),
        format!("WHERE {}", conditions.join("\nAND ")),
    ];
    lines.extend(patch.into_lines());
    lines.push(format!("RETURN {}", aliases.join(", ")));
    Ok(Request::run(lines.join("\n"), parameters))
}

pub(crate) fn delete_node(node: &Node) -> Result<Request> {
    let id = node_id(node, "delete")?;
    let alias = escape(NODE_ALIAS);
    Ok(Request::run(
        format!("MATCH ({alias})\nWHERE id({alias}) = {id}\nDETACH DELETE {alias}"),
        HashMap::new(),
    ))
}

/// Nodes that were never created are skipped.
pub(crate) fn delete_nodes(nodes: &[Node]) -> Result<Request> {
    let ids = nodes.iter().filter_map(Node::id).collect::<Vec<_>>();
    if ids.is_empty() {
        return Err(OgmError::invalid_request(
            "none of the nodes to delete has been created",
        ));
    }
    let alias = escape(NODE_ALIAS);
    Ok(Request::run(
        format!(
            "MATCH ({alias})\nWHERE id({alias}) IN [{}]\nDETACH DELETE {alias}",
            ids.iter().join(", ")
        ),
        HashMap::new(),
    ))
}

pub(crate) fn node_by_id(id: u64) -> Result<Request> {
    let id = i64::try_from(id)
        .map_err(|_| OgmError::invalid_request(format!("node id {id} exceeds i64::MAX")))?;
    Ok(Request::run(
        "MATCH (n) WHERE id(n) = $id RETURN n",
        HashMap::from([(String::from("id"), ValueSend::Integer(id))]),
    ))
}

pub(crate) fn node_by_custom_id(id: &NodeId) -> Request {
    Request::run(
        "MATCH (n) WHERE _id(n) = $id RETURN n",
        HashMap::from([(String::from("id"), ValueSend::from(id))]),
    )
}

pub(crate) fn find_nodes(query: &NodeQuery) -> Request {
    let alias = escape(NODE_ALIAS);
    let labels = query
        .labels
        .iter()
        .map(|label| format!(":{}", escape(label)))
        .join("");
    let mut lines = vec![format!("MATCH ({alias}{labels})")];
    let (condition, parameters) = property_condition(&alias, &query.properties);
    lines.extend(condition);
    lines.push(format!("RETURN {alias}{}", paging(query.skip, query.limit)));
    Request::run(lines.join("\n"), parameters)
}

pub(crate) fn create_relationship(relationship: &Relationship) -> Result<Request> {
    create_relationships(std::slice::from_ref(relationship), false)
}

/// `numbered` appends the relationship's index to all aliases and parameters.
pub(crate) fn create_relationships(relationships: &[Relationship], numbered: bool) -> Result<Request> {
    if relationships.is_empty() {
        return Err(OgmError::invalid_request("no relationships to create"));
    }
    let mut parameters = HashMap::new();
    let mut matches = Vec::with_capacity(relationships.len() * 2);
    let mut conditions = Vec::with_capacity(relationships.len());
    let mut patterns = Vec::with_capacity(relationships.len());
    let mut returns = Vec::with_capacity(relationships.len() * 3);
    for (i, relationship) in relationships.iter().enumerate() {
        let suffix = match numbered {
            true => i.to_string(),
            false => String::new(),
        };
        let (Some(from_id), Some(to_id)) = (relationship.from_node_id(), relationship.to_node_id())
        else {
            return Err(OgmError::invalid_request(
                "both nodes must have been created before relating them",
            ));
        };
        let (left, right) = match relationship.direction() {
            RelationshipDirection::From => ("-", "->"),
            RelationshipDirection::To => ("<-", "-"),
            RelationshipDirection::Either => {
                return Err(OgmError::invalid_request(
                    "cannot create a relationship without direction",
                ))
            }
        };
        let from = escape(&format!("{FROM_ALIAS}{suffix}"));
        let to = escape(&format!("{TO_ALIAS}{suffix}"));
        let rel = escape(&format!("{RELATIONSHIP_ALIAS}{suffix}"));
        let properties = property_map(relationship.properties(), &suffix, &mut parameters)?;
        matches.push(format!("({from}), ({to})"));
        conditions.push(format!("id({from}) = {from_id} AND id({to}) = {to_id}"));
        patterns.push(format!(
            "({from}){left}[{rel}:{}{properties}]{right}({to})",
            escape(relationship.rel_type())
        ));
        returns.extend([from, rel, to]);
    }
    let lines = [
        format!("MATCH {}", matches.join(", ")),
        format!("WHERE {}", conditions.join("\nAND ")),
        format!("CREATE {}", patterns.join(", ")),
        format!("RETURN {}", returns.join(", ")),
    ];
    Ok(Request::run(lines.join("\n"), parameters))
}

pub(crate) fn update_relationship(relationship: &Relationship) -> Result<Request> {
    update_relationships(std::slice::from_ref(relationship), false)
}

pub(crate) fn update_relationships(relationships: &[Relationship], numbered: bool) -> Result<Request> {
    if relationships.is_empty() {
        return Err(OgmError::invalid_request("no relationships to update"));
    }
    let mut parameters = HashMap::new();
    let mut matches = Vec::with_capacity(relationships.len());
    let mut conditions = Vec::with_capacity(relationships.len());
    let mut returns = Vec::with_capacity(relationships.len() * 3);
    let mut patch = Patch::default();
    for (i, relationship) in relationships.iter().enumerate() {
        let suffix = match numbered {
            true => i.to_string(),
            false => String::new(),
        };
        let id = relationship_id(relationship, "update")?;
        let from = escape(&format!("{FROM_ALIAS}{suffix}"));
        let to = escape(&format!("{TO_ALIAS}{suffix}"));
        let rel = escape(&format!("{RELATIONSHIP_ALIAS}{suffix}"));
        matches.push(format!("({from})-[{rel}]->({to})"));
        conditions.push(format!("id({rel}) = {id}"));
        patch.extend(Patch::of_relationship(&rel, relationship, &suffix, &mut parameters));
        returns.extend([from, rel, to]);
    }
    let mut lines = vec![
        format!("MATCH {}", matches.join(", ")),
        format!("WHERE {}", conditions.join("\nAND ")),
    ];
    lines.extend(patch.into_lines());
    lines.push(format!("RETURN {}", returns.join(", ")));
    Ok(Request::run(lines.join("\n"), parameters))
}

pub(crate) fn delete_relationship(relationship: &Relationship) -> Result<Request> {
    let id = relationship_id(relationship, "delete")?;
    let rel = escape(RELATIONSHIP_ALIAS);
    Ok(Request::run(
        format!("MATCH ()-[{rel}]->()\nWHERE id({rel}) = {id}\nDELETE {rel}"),
        HashMap::new(),
    ))
}

/// Relationships that were never created are skipped.
pub(crate) fn delete_relationships(relationships: &[Relationship]) -> Result<Request> {
    let ids = relationships
        .iter()
        .filter_map(Relationship::id)
        .collect::<Vec<_>>();
    if ids.is_empty() {
        return Err(OgmError::invalid_request(
            "none of the relationships to delete has been created",
        ));
    }
    let rel = escape(RELATIONSHIP_ALIAS);
    Ok(Request::run(
        format!(
            "MATCH ()-[{rel}]->()\nWHERE id({rel}) IN [{}]\nDELETE {rel}",
            ids.iter().join(", ")
        ),
        HashMap::new(),
    ))
}

pub(crate) fn find_relationships(query: &RelationshipQuery) -> Request {
    let from = escape(FROM_ALIAS);
    let to = escape(TO_ALIAS);
    let rel = escape(RELATIONSHIP_ALIAS);
    let mut lines = vec![format!(
        "MATCH ({from})-[{rel}:{}]->({to})",
        escape(&query.rel_type)
    )];
    let (condition, parameters) = property_condition(&rel, &query.properties);
    lines.extend(condition);
    lines.push(format!(
        "RETURN {from}, {rel}, {to}{}",
        paging(query.skip, query.limit)
    ));
    Request::run(lines.join("\n"), parameters)
}

/// `SET` and `REMOVE` items of one or more entities.
#[derive(Debug, Default)]
struct Patch {
    set: Vec<String>,
    remove: Vec<String>,
}

impl Patch {
    fn of_node(
        alias: &str,
        node: &Node,
        suffix: &str,
        parameters: &mut HashMap<String, ValueSend>,
    ) -> Self {
        let mut patch = Self::default();
        if !node.added_labels().is_empty() {
            patch.set.push(format!(
                "{alias}{}",
                node.added_labels()
                    .iter()
                    .map(|label| format!(":{}", escape(label)))
                    .join("")
            ));
        }
        patch.remove.extend(
            node.removed_labels()
                .iter()
                .map(|label| format!("{alias}:{}", escape(label))),
        );
        patch.add_properties(
            alias,
            node.updated_properties(),
            node.removed_property_keys().iter(),
            suffix,
            parameters,
        );
        patch
    }

    fn of_relationship(
        alias: &str,
        relationship: &Relationship,
        suffix: &str,
        parameters: &mut HashMap<String, ValueSend>,
    ) -> Self {
        let mut patch = Self::default();
        patch.add_properties(
            alias,
            relationship.updated_properties(),
            relationship.removed_property_keys().iter(),
            suffix,
            parameters,
        );
        patch
    }

    fn add_properties<'a>(
        &mut self,
        alias: &str,
        updated: &BTreeMap<String, ValueSend>,
        removed: impl Iterator<Item = &'a String>,
        suffix: &str,
        parameters: &mut HashMap<String, ValueSend>,
    ) {
        for (key, value) in updated {
            let param = parameter_name(key, suffix);
            self.set.push(format!(
                "{alias}.{} = {}",
                escape(key),
                placeholder(&param)
            ));
            parameters.insert(param, value.clone());
        }
        self.remove
            .extend(removed.map(|key| format!("{alias}.{}", escape(key))));
    }

    fn extend(&mut self, other: Patch) {
        self.set.extend(other.set);
        self.remove.extend(other.remove);
    }

    fn into_lines(self) -> impl Iterator<Item = String> {
        let set = (!self.set.is_empty()).then(|| format!("SET {}", self.set.join(", ")));
        let remove =
            (!self.remove.is_empty()).then(|| format!("REMOVE {}", self.remove.join(", ")));
        set.into_iter().chain(remove)
    }
}

fn node_pattern(
    alias: &str,
    node: &Node,
    suffix: &str,
    parameters: &mut HashMap<String, ValueSend>,
) -> Result<String> {
    let labels = node
        .labels()
        .iter()
        .map(|label| format!(":{}", escape(label)))
        .join("");
    let properties = property_map(node.properties(), suffix, parameters)?;
    Ok(format!("({}{labels}{properties})", escape(alias)))
}

/// ` { `key`: $param, ... }` or an empty string.
fn property_map(
    properties: &HashMap<String, ValueReceive>,
    suffix: &str,
    parameters: &mut HashMap<String, ValueSend>,
) -> Result<String> {
    if properties.is_empty() {
        return Ok(String::new());
    }
    let mut entries = Vec::with_capacity(properties.len());
    for key in properties.keys().sorted() {
        let value = ValueSend::try_from(&properties[key]).map_err(|e| {
            OgmError::invalid_request(format!("property {key:?} cannot be sent: {e}"))
        })?;
        let param = parameter_name(key, suffix);
        entries.push(format!("{}: {}", escape(key), placeholder(&param)));
        parameters.insert(param, value);
    }
    Ok(format!(" {{ {} }}", entries.join(", ")))
}

fn property_condition(
    alias: &str,
    properties: &HashMap<String, ValueSend>,
) -> (Option<String>, HashMap<String, ValueSend>) {
    if properties.is_empty() {
        return (None, HashMap::new());
    }
    let condition = properties
        .keys()
        .sorted()
        .map(|key| format!("{alias}.{}= {}", escape(key), placeholder(key)))
        .join("\nAND ");
    (Some(format!("WHERE {condition}")), properties.clone())
}

fn paging(skip: u64, limit: u64) -> String {
    let mut paging = String::new();
    if skip > 0 {
        paging.push_str(&format!(" SKIP {skip}"));
    }
    if limit > 0 {
        paging.push_str(&format!(" LIMIT {limit}"));
    }
    paging
}

fn node_id(node: &Node, action: &str) -> Result<u64> {
    node.id().ok_or_else(|| {
        OgmError::invalid_request(format!(
            "cannot {action} a node that has not been created"
        ))
    })
}

fn relationship_id(relationship: &Relationship, action: &str) -> Result<u64> {
    relationship.id().ok_or_else(|| {
        OgmError::invalid_request(format!(
            "cannot {action} a relationship that has not been created"
        ))
    })
}

/// `key` for a single entity, `p<suffix>_<key>` for the entity numbered `suffix`.
///
/// `suffix` consists of digits only, so the first `_` ends it and no two (key, suffix) pairs
/// share a name.
fn parameter_name(key: &str, suffix: &str) -> String {
    match suffix {
        "" => String::from(key),
        _ => format!("p{suffix}_{key}"),
    }
}

fn escape(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn placeholder(param: &str) -> String {
    let mut chars = param.chars();
    let is_identifier = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    match is_identifier {
        true => format!("${param}"),
        false => format!("${}", escape(param)),
    }
}
