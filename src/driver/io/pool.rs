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
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use parking_lot::Mutex;

use super::bolt::{Connector, Request};
use crate::driver::client::Client;
use crate::driver::config::{ClientConfig, PoolConfig};
use crate::driver::query_result::QueryResult;
use crate::driver::statement::{NodeQuery, RelationshipQuery};
use crate::driver::transaction::{Transaction, TransactionMode};
use crate::error::{OgmError, Result};
use crate::sync::Semaphore;
use crate::value::graph::{Node, NodeId, Relationship};
use crate::ValueSend;

type HandleId = usize;

#[derive(Debug)]
struct Handle {
    id: HandleId,
    // `None` while lent out or while being connected
    client: Option<Client>,
}

#[derive(Debug)]
struct InnerPoolSyncedData {
    handles: Vec<Handle>,
    next_id: HandleId,
}

impl InnerPoolSyncedData {
    fn take_idle(&mut self) -> Option<(HandleId, Client)> {
        self.handles
            .iter_mut()
            .find_map(|handle| handle.client.take().map(|client| (handle.id, client)))
    }

    fn reserve(&mut self) -> HandleId {
        let id = self.next_id;
        self.next_id += 1;
        self.handles.push(Handle { id, client: None });
        id
    }

    fn remove(&mut self, id: HandleId) -> Option<Handle> {
        let index = self.handles.iter().position(|handle| handle.id == id)?;
        Some(self.handles.remove(index))
    }
}

#[derive(Debug)]
pub(crate) struct InnerPool {
    client_config: ClientConfig,
    config: PoolConfig,
    connector: Arc<dyn Connector>,
    synced: Mutex<InnerPoolSyncedData>,
    permits: Semaphore,
}

impl InnerPool {
    fn open_client(&self) -> Result<Client> {
        let mut client = Client::new(self.client_config.clone(), self.connector.as_ref())?;
        client.connect()?;
        Ok(client)
    }

    fn acquire_with_permit(self: &Arc<Self>) -> Result<PooledClient> {
        let id = {
            let mut synced = self.synced.lock();
            if let Some((id, client)) = synced.take_idle() {
                debug!("lending idle client {}", id);
                return Ok(PooledClient::new(id, client, Arc::clone(self)));
            }
            synced.reserve()
        };
        debug!("opening new client {}", id);
        match self.open_client() {
            Ok(client) => Ok(PooledClient::new(id, client, Arc::clone(self))),
            Err(err) => {
                info!("failed to open client {}: {}", id, err);
                self.synced.lock().remove(id);
                self.permits.release();
                Err(err)
            }
        }
    }

    fn release(&self, id: HandleId, mut client: Client) {
        if client.needs_reset() {
            if let Err(err) = client.reset() {
                info!("ignoring failure during reset, dropping client {}: {}", id, err);
                if let Err(err) = client.disconnect() {
                    info!("ignoring failure during disconnect: {}", err);
                }
            }
        }
        {
            let mut synced = self.synced.lock();
            match synced.handles.iter_mut().find(|handle| handle.id == id) {
                None => info!("released unknown client {}", id),
                Some(handle) if client.is_connected() => {
                    debug!("client {} returned to the pool", id);
                    handle.client = Some(client);
                }
                Some(_) => {
                    debug!("client {} closed, removing it from the pool", id);
                    synced.remove(id);
                }
            }
        }
        self.permits.release();
    }
}

impl Drop for InnerPool {
    fn drop(&mut self) {
        for handle in self.synced.get_mut().handles.drain(..) {
            if let Some(mut client) = handle.client {
                if let Err(err) = client.disconnect() {
                    info!("ignoring failure during disconnect: {}", err);
                }
            }
        }
    }
}

/// A bounded pool of [`Client`]s sharing one configuration.
///
/// At most `pool_size.end()` clients exist at any time. Clients are created lazily beyond the
/// `pool_size.start()` ones opened by [`Pool::new()`].
/// A borrowed [`PooledClient`] is exclusive to its borrower until dropped.
///
/// Forgetting a [`PooledClient`] (e.g., via [`std::mem::forget()`]) permanently reduces the
/// capacity of the pool by one.
#[derive(Debug)]
pub struct Pool(Arc<InnerPool>);

impl Pool {
    pub fn new(
        client_config: ClientConfig,
        config: PoolConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;
        let min_size = *config.pool_size.start();
        let max_size = *config.pool_size.end();
        let inner = Arc::new(InnerPool {
            client_config,
            config,
            connector,
            synced: Mutex::new(InnerPoolSyncedData {
                handles: Vec::with_capacity(max_size),
                next_id: 0,
            }),
            permits: Semaphore::new(max_size),
        });
        for _ in 0..min_size {
            let client = inner.open_client()?;
            let mut synced = inner.synced.lock();
            let id = synced.reserve();
            if let Some(handle) = synced.handles.last_mut() {
                handle.client = Some(client);
            }
            debug!("opened client {} eagerly", id);
        }
        Ok(Self(inner))
    }

    /// Borrows a client, waiting for one to become available.
    ///
    /// If the pool was configured with an
    /// [acquisition timeout](`PoolConfig::with_acquisition_timeout()`), waiting longer fails
    /// with [`OgmError::AcquisitionTimeout`].
    pub fn acquire(&self) -> Result<PooledClient> {
        let timeout = self.0.config.acquisition_timeout;
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        if !self.0.permits.acquire(deadline) {
            return Err(OgmError::AcquisitionTimeout {
                message: format!("no client became available within {:?}", timeout),
            });
        }
        self.0.acquire_with_permit()
    }

    /// Like [`Pool::acquire()`] but returns `Ok(None)` instead of waiting.
    pub fn try_acquire(&self) -> Result<Option<PooledClient>> {
        if !self.0.permits.try_acquire() {
            return Ok(None);
        }
        self.0.acquire_with_permit().map(Some)
    }

    /// Number of clients in the pool, borrowed or not.
    pub fn size(&self) -> usize {
        self.0.synced.lock().handles.len()
    }

    /// Number of borrowed clients.
    pub fn in_use(&self) -> usize {
        self.0.synced
            .lock()
            .handles
            .iter()
            .filter(|handle| handle.client.is_none())
            .count()
    }

    pub fn max_size(&self) -> usize {
        *self.0.config.pool_size.end()
    }

    pub fn all_handle_ids(&self) -> Vec<usize> {
        self.0.synced
            .lock()
            .handles
            .iter()
            .map(|handle| handle.id)
            .collect()
    }

    /// Disconnects and removes all clients that are currently not borrowed.
    pub fn disconnect_idle(&self) {
        let idle: Vec<_> = {
            let mut synced = self.0.synced.lock();
            let (idle, borrowed) = synced
                .handles
                .drain(..)
                .partition(|handle| handle.client.is_some());
            synced.handles = borrowed;
            idle
        };
        for handle in idle {
            if let Some(mut client) = handle.client {
                debug!("disconnecting idle client {}", handle.id);
                if let Err(err) = client.disconnect() {
                    info!("ignoring failure during disconnect: {}", err);
                }
            }
        }
    }

    fn with_client<R>(&self, work: impl FnOnce(&mut Client) -> Result<R>) -> Result<R> {
        let mut client = self.acquire()?;
        work(&mut client)
    }

    pub fn execute(&self, request: Request) -> Result<QueryResult> {
        self.with_client(|client| client.execute(request))
    }

    pub fn execute_cypher(
        &self,
        statement: &str,
        parameters: HashMap<String, ValueSend>,
    ) -> Result<QueryResult> {
        self.with_client(|client| client.execute_cypher(statement, parameters))
    }

    /// See [`Client::execute_as_transaction()`].
    /// The whole transaction runs on a single borrowed client.
    pub fn execute_as_transaction<R, F>(
        &self,
        mode: TransactionMode,
        bookmark: Option<String>,
        body: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut Transaction) -> Result<R>,
    {
        self.with_client(|client| client.execute_as_transaction(mode, bookmark, body))
    }

    pub fn create_node(&self, node: &Node) -> Result<Arc<Node>> {
        self.with_client(|client| client.create_node(node))
    }

    pub fn create_nodes(&self, nodes: &[Node]) -> Result<Vec<Arc<Node>>> {
        self.with_client(|client| client.create_nodes(nodes))
    }

    pub fn get_node(&self, id: u64) -> Result<Option<Arc<Node>>> {
        self.with_client(|client| client.get_node(id))
    }

    pub fn get_node_by_custom_id(&self, id: &NodeId) -> Result<Option<Arc<Node>>> {
        self.with_client(|client| client.get_node_by_custom_id(id))
    }

    pub fn get_nodes(&self, query: &NodeQuery) -> Result<Vec<Arc<Node>>> {
        self.with_client(|client| client.get_nodes(query))
    }

    pub fn update_node(&self, node: &Node) -> Result<Arc<Node>> {
        self.with_client(|client| client.update_node(node))
    }

    pub fn update_nodes(&self, nodes: &[Node]) -> Result<Vec<Arc<Node>>> {
        self.with_client(|client| client.update_nodes(nodes))
    }

    pub fn delete_node(&self, node: &Node) -> Result<()> {
        self.with_client(|client| client.delete_node(node))
    }

    pub fn delete_nodes(&self, nodes: &[Node]) -> Result<()> {
        self.with_client(|client| client.delete_nodes(nodes))
    }

    pub fn relate(
        &self,
        from: &Node,
        to: &Node,
        rel_type: &str,
        properties: HashMap<String, ValueSend>,
    ) -> Result<Arc<Relationship>> {
        self.with_client(|client| client.relate(from, to, rel_type, properties))
    }

    pub fn create_relationship(&self, relationship: &Relationship) -> Result<Arc<Relationship>> {
        self.with_client(|client| client.create_relationship(relationship))
    }

    pub fn create_relationships(
        &self,
        relationships: &[Relationship],
    ) -> Result<Vec<Arc<Relationship>>> {
        self.with_client(|client| client.create_relationships(relationships))
    }

    pub fn get_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Arc<Relationship>>> {
        self.with_client(|client| client.get_relationships(query))
    }

    pub fn update_relationship(&self, relationship: &Relationship) -> Result<Arc<Relationship>> {
        self.with_client(|client| client.update_relationship(relationship))
    }

    pub fn update_relationships(
        &self,
        relationships: &[Relationship],
    ) -> Result<Vec<Arc<Relationship>>> {
        self.with_client(|client| client.update_relationships(relationships))
    }

    pub fn delete_relationship(&self, relationship: &Relationship) -> Result<()> {
        self.with_client(|client| client.delete_relationship(relationship))
    }

    pub fn delete_relationships(&self, relationships: &[Relationship]) -> Result<()> {
        self.with_client(|client| client.delete_relationships(relationships))
    }
}

/// A [`Client`] borrowed from a [`Pool`].
///
/// It's returned to the pool when dropped.
#[derive(Debug)]
pub struct PooledClient {
    id: HandleId,
    pool: Arc<InnerPool>,
    client: Option<Client>,
}

impl PooledClient {
    fn new(id: HandleId, client: Client, pool: Arc<InnerPool>) -> Self {
        Self {
            id,
            pool,
            client: Some(client),
        }
    }

    /// Identifies the pool slot this client occupies.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        let client = self
            .client
            .take()
            .expect("client option should be Some from init to drop");
        self.pool.release(self.id, client);
    }
}

impl Deref for PooledClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        self.client
            .as_ref()
            .expect("client option should be Some from init to drop")
    }
}

impl DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
            .as_mut()
            .expect("client option should be Some from init to drop")
    }
}
