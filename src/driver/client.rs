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
use std::sync::Arc;

use log::{debug, info};

use super::assembler::assemble;
use super::config::ClientConfig;
use super::io::bolt::{Connection, Connector, Frame, Request};
use super::query_result::QueryResult;
use super::statement::{self, NodeQuery, RelationshipQuery};
use super::transaction::{Transaction, TransactionMode};
use crate::error::{OgmError, Result, ServerError};
use crate::value::graph::{Node, NodeId, Relationship, RelationshipDirection};
use crate::ValueSend;

/// A client working on a single connection.
///
/// Usually, clients are borrowed from a [`Pool`](`super::Pool`).
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    connection: Box<dyn Connection>,
    bookmark: Option<String>,
    needs_reset: bool,
}

impl Client {
    /// Opens a new connection with `connector`.
    /// The connection still needs to be [connected](`Client::connect()`).
    pub fn new(config: ClientConfig, connector: &dyn Connector) -> Result<Self> {
        let connection = connector.open(&config)?;
        Ok(Self::with_connection(config, connection))
    }

    pub fn with_connection(config: ClientConfig, connection: Box<dyn Connection>) -> Self {
        Self {
            config,
            connection,
            bookmark: None,
            needs_reset: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connect(&mut self) -> Result<()> {
        debug!(
            "connecting to {}:{} as {}",
            self.config.hostname, self.config.port, self.config.username
        );
        self.connection.connect()
    }

    pub fn disconnect(&mut self) -> Result<()> {
        debug!("disconnecting from {}:{}", self.config.hostname, self.config.port);
        self.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// The bookmark of the last committed transaction.
    pub fn bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref()
    }

    /// Sends `request`, then pulls and assembles all of its results.
    pub fn execute(&mut self, request: Request) -> Result<QueryResult> {
        let frames = self.send(&request)?;
        let mut result = QueryResult::new();
        assemble(&mut result, &frames);
        self.pull_all(result)
    }

    pub fn execute_cypher(
        &mut self,
        statement: &str,
        parameters: HashMap<String, ValueSend>,
    ) -> Result<QueryResult> {
        self.execute(Request::run(statement, parameters))
    }

    /// Pulls all pending results into `partial`.
    pub fn pull_all(&mut self, mut partial: QueryResult) -> Result<QueryResult> {
        let frames = self.send(&Request::PullAll)?;
        assemble(&mut partial, &frames);
        Ok(partial)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.send(&Request::Reset)?;
        self.needs_reset = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.send(&Request::Rollback).map(drop)
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        let frames = self.send(&Request::Commit)?;
        if let Some(bookmark) = frames
            .iter()
            .filter(|frame| frame.is_success())
            .filter_map(Frame::meta)
            .find_map(|meta| meta.get("bookmark"))
            .and_then(|bookmark| bookmark.as_string())
        {
            self.bookmark = Some(String::from(bookmark));
        }
        Ok(())
    }

    /// Runs `body` inside a transaction.
    ///
    /// If `body` fails, the transaction is rolled back and the error is returned.
    /// Otherwise, it's committed, unless the body
    ///  * [marked it as failed](`Transaction::mark_as_failed()`) or
    ///  * [turned off autocommit](`Transaction::set_autocommit()`) but left it open.
    ///
    /// In those cases, it's rolled back.
    pub fn execute_as_transaction<R, F>(
        &mut self,
        mode: TransactionMode,
        bookmark: Option<String>,
        body: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut Transaction) -> Result<R>,
    {
        self.send(&Request::Begin { mode, bookmark })?;
        let mut transaction = Transaction::new(self, mode);
        match body(&mut transaction) {
            Ok(result) => {
                transaction.finish()?;
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = transaction.abort() {
                    info!("ignoring failure during rollback: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    pub fn create_node(&mut self, node: &Node) -> Result<Arc<Node>> {
        let result = self.execute(statement::create_node(node)?)?;
        first(result.row_nodes(), "node")
    }

    pub fn create_nodes(&mut self, nodes: &[Node]) -> Result<Vec<Arc<Node>>> {
        let result = self.execute(statement::create_nodes(nodes)?)?;
        Ok(result.row_nodes())
    }

    pub fn get_node(&mut self, id: u64) -> Result<Option<Arc<Node>>> {
        let result = self.execute(statement::node_by_id(id)?)?;
        at_most_one(result.row_nodes())
    }

    pub fn get_node_by_custom_id(&mut self, id: &NodeId) -> Result<Option<Arc<Node>>> {
        let result = self.execute(statement::node_by_custom_id(id))?;
        at_most_one(result.row_nodes())
    }

    pub fn get_nodes(&mut self, query: &NodeQuery) -> Result<Vec<Arc<Node>>> {
        let result = self.execute(statement::find_nodes(query))?;
        Ok(result.row_nodes())
    }

    /// Sends the changes made to `node` since it was read.
    pub fn update_node(&mut self, node: &Node) -> Result<Arc<Node>> {
        let result = self.execute(statement::update_node(node)?)?;
        first(result.row_nodes(), "node")
    }

    pub fn update_nodes(&mut self, nodes: &[Node]) -> Result<Vec<Arc<Node>>> {
        let result = self.execute(statement::update_nodes(nodes)?)?;
        Ok(result.row_nodes())
    }

    /// Deletes `node` and all of its relationships.
    pub fn delete_node(&mut self, node: &Node) -> Result<()> {
        self.execute(statement::delete_node(node)?).map(drop)
    }

    pub fn delete_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        self.execute(statement::delete_nodes(nodes)?).map(drop)
    }

    /// Creates a relationship `(from)-[:rel_type]->(to)`.
    pub fn relate(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &str,
        properties: HashMap<String, ValueSend>,
    ) -> Result<Arc<Relationship>> {
        let relationship =
            Relationship::new(from, to, rel_type, RelationshipDirection::From, properties);
        self.create_relationship(&relationship)
    }

    pub fn create_relationship(&mut self, relationship: &Relationship) -> Result<Arc<Relationship>> {
        let result = self.execute(statement::create_relationship(relationship)?)?;
        first(result.row_relationships(), "relationship")
    }

    pub fn create_relationships(
        &mut self,
        relationships: &[Relationship],
    ) -> Result<Vec<Arc<Relationship>>> {
        let result = self.execute(statement::create_relationships(relationships, true)?)?;
        Ok(result.row_relationships())
    }

    pub fn get_relationships(&mut self, query: &RelationshipQuery) -> Result<Vec<Arc<Relationship>>> {
        let result = self.execute(statement::find_relationships(query))?;
        Ok(result.row_relationships())
    }

    pub fn update_relationship(&mut self, relationship: &Relationship) -> Result<Arc<Relationship>> {
        let result = self.execute(statement::update_relationship(relationship)?)?;
        first(result.row_relationships(), "relationship")
    }

    pub fn update_relationships(
        &mut self,
        relationships: &[Relationship],
    ) -> Result<Vec<Arc<Relationship>>> {
        let result = self.execute(statement::update_relationships(relationships, true)?)?;
        Ok(result.row_relationships())
    }

    pub fn delete_relationship(&mut self, relationship: &Relationship) -> Result<()> {
        self.execute(statement::delete_relationship(relationship)?)
            .map(drop)
    }

    pub fn delete_relationships(&mut self, relationships: &[Relationship]) -> Result<()> {
        self.execute(statement::delete_relationships(relationships)?)
            .map(drop)
    }

    /// Whether a request failed since the last reset.
    pub(crate) fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    fn send(&mut self, request: &Request) -> Result<Vec<Frame>> {
        debug!("C: {}", request.name());
        let frames = self.connection.send(request)?;
        for frame in &frames {
            if frame.is_failure() {
                self.needs_reset = true;
                let meta = frame.meta().cloned().unwrap_or_default();
                let err = ServerError::from_meta(meta);
                debug!("S: FAILURE {}", err);
                return Err(err.into());
            }
            if frame.is_ignored() {
                debug!("S: IGNORED");
            }
        }
        debug!("S: {} message(s)", frames.len());
        Ok(frames)
    }
}

fn first<T>(entities: Vec<Arc<T>>, expected: &'static str) -> Result<Arc<T>> {
    entities
        .into_iter()
        .next()
        .ok_or(OgmError::MissingEntity { expected })
}

fn at_most_one<T>(mut entities: Vec<Arc<T>>) -> Result<Option<Arc<T>>> {
    if entities.len() > 1 {
        return Err(OgmError::UnexpectedNumberOfResults {
            expected: 1,
            found: entities.len(),
        });
    }
    Ok(entities.pop())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use mockall::Sequence;

    use crate::driver::io::bolt::MockConnection;
    use crate::macros::hash_map;
    use crate::value::graph::tests::{node_structure, relationship_structure};
    use crate::value_map;
    use crate::ValueReceive;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn client(connection: MockConnection) -> Client {
        Client::with_connection(ClientConfig::new(), Box::new(connection))
    }

    fn run_success(fields: &[&str]) -> Vec<Frame> {
        vec![Frame::success(hash_map!(
            String::from("fields") => ValueReceive::List(
                fields.iter().map(|f| ValueReceive::String(String::from(*f))).collect()
            ),
        ))]
    }

    fn pull_success(records: Vec<Vec<ValueReceive>>) -> Vec<Frame> {
        let mut frames: Vec<_> = records.into_iter().map(Frame::record).collect();
        frames.push(Frame::success(hash_map!(
            String::from("type") => ValueReceive::String(String::from("rw")),
        )));
        frames
    }

    fn is_run(request: &Request) -> bool {
        matches!(request, Request::Run { .. })
    }

    fn expect_query(
        connection: &mut MockConnection,
        seq: &mut Sequence,
        fields: &'static [&'static str],
        records: Vec<Vec<ValueReceive>>,
    ) {
        connection
            .expect_send()
            .withf(is_run)
            .times(1)
            .in_sequence(seq)
            .returning(move |_| Ok(run_success(fields)));
        connection
            .expect_send()
            .withf(|r| r == &Request::PullAll)
            .times(1)
            .in_sequence(seq)
            .returning(move |_| Ok(pull_success(records.clone())));
    }

    fn expect_simple(connection: &mut MockConnection, seq: &mut Sequence, request: Request) {
        connection
            .expect_send()
            .withf(move |r| r == &request)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(vec![Frame::success(HashMap::new())]));
    }

    #[test]
    fn test_execute_runs_and_pulls() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_query(
            &mut connection,
            &mut seq,
            &["x"],
            vec![vec![ValueReceive::Integer(1)], vec![ValueReceive::Integer(2)]],
        );
        let mut client = client(connection);

        let result = client.execute_cypher("UNWIND [1, 2] AS x RETURN x", value_map!()).unwrap();

        assert_eq!(result.fields().len(), 1);
        assert_eq!(result.rows().len(), 2);
        assert_eq!(
            result.rows()[1].value("x").and_then(|x| x.as_i64()),
            Some(2)
        );
    }

    #[test]
    fn test_server_failure() {
        init_logger();
        let mut connection = MockConnection::new();
        connection.expect_send().times(1).returning(|_| {
            Ok(vec![Frame::failure(hash_map!(
                String::from("code") => ValueReceive::String(String::from("Neo.ClientError.Statement.SyntaxError")),
                String::from("message") => ValueReceive::String(String::from("Invalid input")),
            ))])
        });
        let mut client = client(connection);

        let err = client.execute_cypher("RETRUN 1", value_map!()).unwrap_err();

        let err = match err {
            OgmError::ServerError(err) => err,
            err => panic!("expected server error, found {err:?}"),
        };
        assert_eq!(err.code(), "Neo.ClientError.Statement.SyntaxError");
        assert_eq!(err.message(), "Invalid input");
        assert!(client.needs_reset());
    }

    #[test]
    fn test_transport_failure() {
        init_logger();
        let mut connection = MockConnection::new();
        connection.expect_send().times(1).returning(|_| {
            Err(OgmError::transport_error(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "broken pipe",
            )))
        });
        let mut client = client(connection);

        let err = client.execute_cypher("RETURN 1", value_map!()).unwrap_err();
        assert!(matches!(err, OgmError::Transport { source: Some(_), .. }));
    }

    #[test]
    fn test_reset_clears_failure() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        connection
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![Frame::failure(HashMap::new())]));
        expect_simple(&mut connection, &mut seq, Request::Reset);
        let mut client = client(connection);

        assert!(client.execute_cypher("RETURN 1", value_map!()).is_err());
        assert!(client.needs_reset());
        client.reset().unwrap();
        assert!(!client.needs_reset());
    }

    #[test]
    fn test_create_node() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_query(
            &mut connection,
            &mut seq,
            &["node"],
            vec![vec![node_structure(1, &["Person"])]],
        );
        let mut client = client(connection);

        let node = client
            .create_node(&Node::with_label("Person", [("name", "n1")]))
            .unwrap();

        assert_eq!(node.id(), Some(1));
        assert_eq!(node.labels(), ["Person"]);
    }

    #[test]
    fn test_create_node_without_result() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_query(&mut connection, &mut seq, &["node"], vec![]);
        let mut client = client(connection);

        let err = client
            .create_node(&Node::with_label("Person", [("name", "n1")]))
            .unwrap_err();
        assert!(matches!(err, OgmError::MissingEntity { expected: "node" }));
    }

    #[test]
    fn test_get_node() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_query(&mut connection, &mut seq, &["n"], vec![vec![node_structure(3, &[])]]);
        expect_query(&mut connection, &mut seq, &["n"], vec![]);
        expect_query(
            &mut connection,
            &mut seq,
            &["n"],
            vec![vec![node_structure(4, &[])], vec![node_structure(5, &[])]],
        );
        let mut client = client(connection);

        assert_eq!(client.get_node(3).unwrap().unwrap().id(), Some(3));
        assert!(client.get_node(3).unwrap().is_none());
        assert!(matches!(
            client.get_node(3),
            Err(OgmError::UnexpectedNumberOfResults {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_invalid_request_is_not_sent() {
        init_logger();
        let mut connection = MockConnection::new();
        connection.expect_send().never();
        let mut client = client(connection);

        let unsaved = Node::with_label("Person", [("name", "n1")]);
        assert!(matches!(
            client.update_node(&unsaved),
            Err(OgmError::InvalidRequest { .. })
        ));
        assert!(matches!(
            client.relate(&unsaved, &unsaved, "KNOWS", value_map!()),
            Err(OgmError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_relate_links_endpoints() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_query(
            &mut connection,
            &mut seq,
            &["from", "rel", "to"],
            vec![vec![
                node_structure(1, &[]),
                relationship_structure(10, 1, 2),
                node_structure(2, &[]),
            ]],
        );
        expect_query(
            &mut connection,
            &mut seq,
            &["from", "rel", "to"],
            vec![vec![
                node_structure(1, &[]),
                relationship_structure(10, 1, 2),
                node_structure(2, &[]),
            ]],
        );
        let mut client = client(connection);
        let from = Node::from_structure(node_structure(1, &[]).as_structure().unwrap()).unwrap();
        let to = Node::from_structure(node_structure(2, &[]).as_structure().unwrap()).unwrap();

        let relationship = client.relate(&from, &to, "KNOWS", value_map!()).unwrap();
        assert_eq!(relationship.id(), Some(10));
        assert_eq!(relationship.from_node_id(), Some(1));
        assert_eq!(relationship.to_node_id(), Some(2));

        let relationships = client
            .get_relationships(&RelationshipQuery::new("KNOWS"))
            .unwrap();
        assert_eq!(relationships.len(), 1);
    }

    #[test]
    fn test_transaction_commits() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_simple(
            &mut connection,
            &mut seq,
            Request::Begin {
                mode: TransactionMode::Write,
                bookmark: Some(String::from("bm:0")),
            },
        );
        expect_query(&mut connection, &mut seq, &["x"], vec![vec![ValueReceive::Integer(1)]]);
        connection
            .expect_send()
            .withf(|r| r == &Request::Commit)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![Frame::success(hash_map!(
                    String::from("bookmark") => ValueReceive::String(String::from("bm:1")),
                ))])
            });
        let mut client = client(connection);

        let rows = client
            .execute_as_transaction(
                TransactionMode::Write,
                Some(String::from("bm:0")),
                |tx| {
                    let result = tx.execute_cypher("RETURN 1 AS x", value_map!())?;
                    Ok(result.rows().len())
                },
            )
            .unwrap();

        assert_eq!(rows, 1);
        assert_eq!(client.bookmark(), Some("bm:1"));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_simple(
            &mut connection,
            &mut seq,
            Request::Begin {
                mode: TransactionMode::Read,
                bookmark: None,
            },
        );
        expect_simple(&mut connection, &mut seq, Request::Rollback);
        let mut client = client(connection);

        client
            .execute_as_transaction(TransactionMode::Read, None, |tx| {
                tx.mark_as_failed();
                Ok(())
            })
            .unwrap();
        assert_eq!(client.bookmark(), None);
    }

    #[test]
    fn test_body_error_rolls_back() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_simple(
            &mut connection,
            &mut seq,
            Request::Begin {
                mode: TransactionMode::Write,
                bookmark: None,
            },
        );
        expect_simple(&mut connection, &mut seq, Request::Rollback);
        let mut client = client(connection);

        let err = client
            .execute_as_transaction(TransactionMode::Write, None, |_| {
                Err::<(), _>(OgmError::invalid_request("nope"))
            })
            .unwrap_err();
        assert!(matches!(err, OgmError::InvalidRequest { .. }));
    }

    #[test]
    fn test_open_transaction_without_autocommit_rolls_back() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_simple(
            &mut connection,
            &mut seq,
            Request::Begin {
                mode: TransactionMode::Write,
                bookmark: None,
            },
        );
        expect_simple(&mut connection, &mut seq, Request::Rollback);
        let mut client = client(connection);

        client
            .execute_as_transaction(TransactionMode::Write, None, |tx| {
                tx.set_autocommit(false);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_manual_commit() {
        init_logger();
        let mut connection = MockConnection::new();
        let mut seq = Sequence::new();
        expect_simple(
            &mut connection,
            &mut seq,
            Request::Begin {
                mode: TransactionMode::Write,
                bookmark: None,
            },
        );
        expect_simple(&mut connection, &mut seq, Request::Commit);
        let mut client = client(connection);

        client
            .execute_as_transaction(TransactionMode::Write, None, |tx| {
                tx.set_autocommit(false);
                tx.commit()?;
                assert!(!tx.is_open());
                assert!(matches!(
                    tx.execute_cypher("RETURN 1", value_map!()),
                    Err(OgmError::InvalidRequest { .. })
                ));
                Ok(())
            })
            .unwrap();
    }
}
