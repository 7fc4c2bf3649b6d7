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

use super::client::Client;
use super::io::bolt::Request;
use super::query_result::QueryResult;
use crate::error::{OgmError, Result};
use crate::ValueSend;

/// Access mode of a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TransactionMode {
    #[default]
    Read,
    Write,
}

/// An open transaction, handed to the body of
/// [`Client::execute_as_transaction()`](`Client::execute_as_transaction()`).
///
/// All work runs on the client that began the transaction.
/// By default, the transaction is committed once the body returns successfully, unless it was
/// [marked as failed](`Transaction::mark_as_failed()`).
#[derive(Debug)]
pub struct Transaction<'client> {
    client: &'client mut Client,
    mode: TransactionMode,
    failed: bool,
    autocommit: bool,
    closed: bool,
}

impl<'client> Transaction<'client> {
    pub(crate) fn new(client: &'client mut Client, mode: TransactionMode) -> Self {
        Self {
            client,
            mode,
            failed: false,
            autocommit: true,
            closed: false,
        }
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn execute(&mut self, request: Request) -> Result<QueryResult> {
        self.ensure_open()?;
        self.client.execute(request)
    }

    pub fn execute_cypher(
        &mut self,
        statement: &str,
        parameters: HashMap<String, ValueSend>,
    ) -> Result<QueryResult> {
        self.ensure_open()?;
        self.client.execute_cypher(statement, parameters)
    }

    /// The client the transaction runs on, e.g., to use its node and relationship operations.
    pub fn client(&mut self) -> &mut Client {
        self.client
    }

    /// Make the transaction roll back instead of committing when the body is done.
    pub fn mark_as_failed(&mut self) {
        self.failed = true;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Without autocommit, the body must call [`Transaction::commit()`] itself.
    /// Otherwise, the transaction is rolled back.
    pub fn set_autocommit(&mut self, autocommit: bool) {
        self.autocommit = autocommit;
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.client.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.client.rollback()
    }

    /// Closes the transaction after the body returned successfully.
    pub(crate) fn finish(mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        match (self.autocommit, self.failed) {
            (true, false) => self.commit(),
            _ => {
                debug!(
                    "rolling back transaction (autocommit: {}, failed: {})",
                    self.autocommit, self.failed
                );
                self.rollback()
            }
        }
    }

    /// Closes the transaction after the body failed.
    pub(crate) fn abort(mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.rollback()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(OgmError::invalid_request("transaction already closed"));
        }
        Ok(())
    }
}
