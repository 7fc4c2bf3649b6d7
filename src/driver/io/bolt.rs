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
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use crate::driver::config::ClientConfig;
use crate::driver::transaction::TransactionMode;
use crate::{Result, ValueReceive, ValueSend};

pub(crate) const SUCCESS: u8 = 0x70;
pub(crate) const RECORD: u8 = 0x71;
pub(crate) const IGNORED: u8 = 0x7E;
pub(crate) const FAILURE: u8 = 0x7F;

/// A request message handed to a [`Connection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Run {
        statement: String,
        parameters: HashMap<String, ValueSend>,
    },
    PullAll,
    DiscardAll,
    Begin {
        mode: TransactionMode,
        bookmark: Option<String>,
    },
    Commit,
    Rollback,
    Reset,
}

impl Request {
    pub fn run(statement: impl Into<String>, parameters: HashMap<String, ValueSend>) -> Self {
        Request::Run {
            statement: statement.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Run { .. } => "RUN",
            Request::PullAll => "PULL_ALL",
            Request::DiscardAll => "DISCARD_ALL",
            Request::Begin { .. } => "BEGIN",
            Request::Commit => "COMMIT",
            Request::Rollback => "ROLLBACK",
            Request::Reset => "RESET",
        }
    }
}

/// One decoded response message.
///
/// `items` are the message's fields, e.g., the metadata map of a SUCCESS message or the list of
/// values of a RECORD message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub signature: u8,
    pub items: Vec<ValueReceive>,
}

impl Frame {
    pub fn new(signature: u8, items: Vec<ValueReceive>) -> Self {
        Self { signature, items }
    }

    pub fn success(meta: HashMap<String, ValueReceive>) -> Self {
        Self::new(SUCCESS, vec![ValueReceive::Map(meta)])
    }

    pub fn record(values: Vec<ValueReceive>) -> Self {
        Self::new(RECORD, vec![ValueReceive::List(values)])
    }

    pub fn ignored() -> Self {
        Self::new(IGNORED, vec![])
    }

    pub fn failure(meta: HashMap<String, ValueReceive>) -> Self {
        Self::new(FAILURE, vec![ValueReceive::Map(meta)])
    }

    pub fn is_success(&self) -> bool {
        self.signature == SUCCESS
    }

    pub fn is_record(&self) -> bool {
        self.signature == RECORD
    }

    pub fn is_ignored(&self) -> bool {
        self.signature == IGNORED
    }

    pub fn is_failure(&self) -> bool {
        self.signature == FAILURE
    }

    /// The metadata map of a SUCCESS or FAILURE message.
    pub fn meta(&self) -> Option<&HashMap<String, ValueReceive>> {
        self.items.first().and_then(ValueReceive::as_map)
    }
}

/// A single connection to the server.
///
/// Implementations take care of the wire protocol: framing, encryption, handshake, and
/// PackStream encoding.
/// They hand back every response message the server sent for a request, already decoded.
#[cfg_attr(test, automock)]
pub trait Connection: Debug + Send {
    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn send(&mut self, request: &Request) -> Result<Vec<Frame>>;
}

/// Creates (not yet connected) [`Connection`]s.
pub trait Connector: Debug + Send + Sync {
    fn open(&self, config: &ClientConfig) -> Result<Box<dyn Connection>>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::fmt::{Debug, Formatter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::OgmError;

    type Responder = dyn Fn(&Request) -> Result<Vec<Frame>> + Send + Sync;

    /// Hands out in-memory connections that answer every request with `responder`.
    pub(crate) struct FakeConnector {
        responder: Arc<Responder>,
        pub(crate) opened: AtomicUsize,
        pub(crate) fail_connect: Mutex<bool>,
        pub(crate) sent: Arc<Mutex<Vec<Request>>>,
    }

    impl FakeConnector {
        pub(crate) fn new() -> Self {
            Self::with_responder(|_| Ok(vec![Frame::success(HashMap::new())]))
        }

        pub(crate) fn with_responder<F>(responder: F) -> Self
        where
            F: Fn(&Request) -> Result<Vec<Frame>> + Send + Sync + 'static,
        {
            Self {
                responder: Arc::new(responder),
                opened: AtomicUsize::new(0),
                fail_connect: Mutex::new(false),
                sent: Default::default(),
            }
        }

        pub(crate) fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub(crate) fn sent(&self) -> Vec<Request> {
            self.sent.lock().clone()
        }
    }

    impl Debug for FakeConnector {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FakeConnector")
                .field("opened", &self.opened)
                .finish()
        }
    }

    impl Connector for FakeConnector {
        fn open(&self, _config: &ClientConfig) -> Result<Box<dyn Connection>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeConnection {
                responder: Arc::clone(&self.responder),
                fail_connect: *self.fail_connect.lock(),
                connected: false,
                sent: Arc::clone(&self.sent),
            }))
        }
    }

    pub(crate) struct FakeConnection {
        responder: Arc<Responder>,
        fail_connect: bool,
        connected: bool,
        sent: Arc<Mutex<Vec<Request>>>,
    }

    impl Debug for FakeConnection {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FakeConnection")
                .field("connected", &self.connected)
                .finish()
        }
    }

    impl Connection for FakeConnection {
        fn connect(&mut self) -> Result<()> {
            if self.fail_connect {
                return Err(OgmError::Connect {
                    message: String::from("connection refused"),
                    source: None,
                });
            }
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) -> Result<()> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send(&mut self, request: &Request) -> Result<Vec<Frame>> {
            if !self.connected {
                return Err(OgmError::transport("not connected"));
            }
            self.sent.lock().push(request.clone());
            (self.responder)(request)
        }
    }
}
