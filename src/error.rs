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
use std::fmt::{Display, Formatter};
use std::io;

use thiserror::Error;

use crate::ValueReceive;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OgmError {
    /// used when
    ///  * the connection could not be established or the handshake failed.
    #[error("connection failed: {message}")]
    Connect {
        message: String,
        source: Option<io::Error>,
    },
    /// used when
    ///  * sending a request or receiving its response failed.
    #[error("transport failed: {message}")]
    Transport {
        message: String,
        source: Option<io::Error>,
    },
    /// used when
    ///  * the server answered with a FAILURE message.
    #[error("{0}")]
    ServerError(ServerError),
    /// used when
    ///  * a convenience operation expected an entity in the result but found none.
    ///    E.g., creating a node did not return the created node.
    #[error("expected a {expected} in the result but found none")]
    MissingEntity { expected: &'static str },
    #[error("expected {expected} result(s) but found {found}")]
    UnexpectedNumberOfResults { expected: usize, found: usize },
    /// used when
    ///  * a request cannot be built from the given arguments.
    ///    E.g., updating a node that was never created, or creating a relationship without
    ///    direction.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    /// used when
    ///  * no pooled client became available within the configured acquisition timeout.
    #[error("{message}")]
    AcquisitionTimeout { message: String },
}

impl OgmError {
    /// For [`Connection::connect()`](`crate::driver::Connection::connect()`) implementations
    /// failing on I/O.
    pub fn connect_error(err: io::Error) -> Self {
        Self::Connect {
            message: format!("failed to open connection: {}", err),
            source: Some(err),
        }
    }

    /// For [`Connection::send()`](`crate::driver::Connection::send()`) implementations failing
    /// on I/O.
    pub fn transport_error(err: io::Error) -> Self {
        Self::Transport {
            message: format!("failed to exchange messages: {}", err),
            source: Some(err),
        }
    }

    /// A transport failure without underlying I/O error, e.g., a connection that was closed.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the network rather than by the request.
    pub fn is_connectivity_error(&self) -> bool {
        matches!(self, OgmError::Connect { .. } | OgmError::Transport { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    code: String,
    message: String,
}

impl ServerError {
    pub fn new(code: String, message: String) -> Self {
        Self { code, message }
    }

    pub(crate) fn from_meta(mut meta: HashMap<String, ValueReceive>) -> Self {
        let code = match meta.remove("code") {
            Some(ValueReceive::String(code)) => code,
            _ => "Neo.DatabaseError.General.UnknownError".into(),
        };
        let message = match meta.remove("message") {
            Some(ValueReceive::String(message)) => message,
            _ => "An unknown error occurred.".into(),
        };
        Self { code, message }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("")
    }

    pub fn category(&self) -> &str {
        self.code.split('.').nth(2).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.code.split('.').nth(3).unwrap_or("")
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "server error {}: {}", self.code, self.message)
    }
}

pub type Result<T> = std::result::Result<T, OgmError>;

impl From<ServerError> for OgmError {
    fn from(err: ServerError) -> Self {
        OgmError::ServerError(err)
    }
}
