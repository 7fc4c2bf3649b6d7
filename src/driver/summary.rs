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

use log::debug;

use crate::ValueReceive;

type Meta = HashMap<String, ValueReceive>;

/// Statistics and metadata the server sent along with a query's results.
///
/// Every field holds the last value received.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct QueryStats {
    /// Milliseconds until the first record was available.
    pub result_available_after: Option<i64>,
    /// Milliseconds until the last record was consumed.
    pub result_consumed_after: Option<i64>,
    pub query_type: Option<QueryType>,
    pub database: Option<String>,
    pub bookmark: Option<String>,
    pub counters: Counters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Counters {
    pub nodes_created: i64,
    pub nodes_deleted: i64,
    pub relationships_created: i64,
    pub relationships_deleted: i64,
    pub properties_set: i64,
    pub labels_added: i64,
    pub labels_removed: i64,
    pub indexes_added: i64,
    pub indexes_removed: i64,
    pub constraints_added: i64,
    pub constraints_removed: i64,
    pub contains_updates: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum QueryType {
    Read,
    Write,
    ReadWrite,
    Schema,
}

impl QueryType {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "r" => Some(QueryType::Read),
            "w" => Some(QueryType::Write),
            "rw" => Some(QueryType::ReadWrite),
            "s" => Some(QueryType::Schema),
            _ => None,
        }
    }
}

impl QueryStats {
    /// Picks up all recognized keys of a SUCCESS message's metadata.
    ///
    /// Values of unexpected type are skipped.
    pub(crate) fn load_meta(&mut self, meta: &Meta) {
        for (keys, target) in [
            (["result_available_after", "t_first"], &mut self.result_available_after),
            (["result_consumed_after", "t_last"], &mut self.result_consumed_after),
        ] {
            for key in keys {
                if let Some(value) = meta.get(key) {
                    match value.as_i64() {
                        Some(value) => *target = Some(value),
                        None => debug!("ignoring {} in summary: not an integer {:?}", key, value),
                    }
                }
            }
        }
        if let Some(value) = meta.get("type") {
            match value.as_string().and_then(QueryType::parse) {
                Some(query_type) => self.query_type = Some(query_type),
                None => debug!("ignoring type in summary: unknown {:?}", value),
            }
        }
        for (key, target) in [("db", &mut self.database), ("bookmark", &mut self.bookmark)] {
            if let Some(value) = meta.get(key) {
                match value.as_string() {
                    Some(value) => *target = Some(String::from(value)),
                    None => debug!("ignoring {} in summary: not a string {:?}", key, value),
                }
            }
        }
        if let Some(stats) = meta.get("stats") {
            match stats.as_map() {
                Some(stats) => self.counters.load_meta(stats),
                None => debug!("ignoring stats in summary: not a map {:?}", stats),
            }
        }
    }
}

impl Counters {
    fn load_meta(&mut self, meta: &Meta) {
        for (key, target) in [
            ("nodes-created", &mut self.nodes_created),
            ("nodes-deleted", &mut self.nodes_deleted),
            ("relationships-created", &mut self.relationships_created),
            ("relationships-deleted", &mut self.relationships_deleted),
            ("properties-set", &mut self.properties_set),
            ("labels-added", &mut self.labels_added),
            ("labels-removed", &mut self.labels_removed),
            ("indexes-added", &mut self.indexes_added),
            ("indexes-removed", &mut self.indexes_removed),
            ("constraints-added", &mut self.constraints_added),
            ("constraints-removed", &mut self.constraints_removed),
        ] {
            if let Some(value) = meta.get(key) {
                match value.as_i64() {
                    Some(value) => *target = value,
                    None => debug!("ignoring {} in stats: not an integer {:?}", key, value),
                }
            }
        }
        match meta.get("contains-updates") {
            Some(value) => match value.as_bool() {
                Some(value) => self.contains_updates = value,
                None => debug!("ignoring contains-updates in stats: not a bool {:?}", value),
            },
            None => self.contains_updates = self.any_update(),
        }
    }

    fn any_update(&self) -> bool {
        [
            self.nodes_created,
            self.nodes_deleted,
            self.relationships_created,
            self.relationships_deleted,
            self.properties_set,
            self.labels_added,
            self.labels_removed,
            self.indexes_added,
            self.indexes_removed,
            self.constraints_added,
            self.constraints_removed,
        ]
        .into_iter()
        .any(|count| count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::macros::hash_map;

    fn s(value: &str) -> ValueReceive {
        ValueReceive::String(String::from(value))
    }

    #[test]
    fn test_load_meta() {
        let mut stats = QueryStats::default();
        stats.load_meta(&hash_map!(
            String::from("t_first") => ValueReceive::Integer(3),
            String::from("fields") => ValueReceive::List(vec![s("n")]),
        ));
        stats.load_meta(&hash_map!(
            String::from("t_last") => ValueReceive::Integer(5),
            String::from("type") => s("w"),
            String::from("db") => s("neo4j"),
            String::from("bookmark") => s("bm:1"),
            String::from("stats") => ValueReceive::Map(hash_map!(
                String::from("nodes-created") => ValueReceive::Integer(2),
                String::from("properties-set") => ValueReceive::UnsignedInteger(4),
            )),
        ));
        assert_eq!(stats.result_available_after, Some(3));
        assert_eq!(stats.result_consumed_after, Some(5));
        assert_eq!(stats.query_type, Some(QueryType::Write));
        assert_eq!(stats.database.as_deref(), Some("neo4j"));
        assert_eq!(stats.bookmark.as_deref(), Some("bm:1"));
        assert_eq!(stats.counters.nodes_created, 2);
        assert_eq!(stats.counters.properties_set, 4);
        assert!(stats.counters.contains_updates);
    }

    #[test]
    fn test_later_values_win() {
        let mut stats = QueryStats::default();
        stats.load_meta(&hash_map!(String::from("result_available_after") => ValueReceive::Integer(1)));
        stats.load_meta(&hash_map!(String::from("result_available_after") => ValueReceive::Integer(7)));
        assert_eq!(stats.result_available_after, Some(7));
    }

    #[rstest]
    #[case("t_first", s("fast"))]
    #[case("type", s("x"))]
    #[case("type", ValueReceive::Integer(1))]
    #[case("db", ValueReceive::Null)]
    #[case("stats", ValueReceive::List(vec![]))]
    fn test_malformed_values_are_ignored(#[case] key: &str, #[case] value: ValueReceive) {
        let mut stats = QueryStats::default();
        stats.load_meta(&hash_map!(String::from(key) => value));
        assert_eq!(stats, QueryStats::default());
    }

    #[rstest]
    #[case("r", QueryType::Read)]
    #[case("w", QueryType::Write)]
    #[case("rw", QueryType::ReadWrite)]
    #[case("s", QueryType::Schema)]
    fn test_query_type(#[case] tag: &str, #[case] expected: QueryType) {
        let mut stats = QueryStats::default();
        stats.load_meta(&hash_map!(String::from("type") => s(tag)));
        assert_eq!(stats.query_type, Some(expected));
    }
}
