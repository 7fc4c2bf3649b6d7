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

pub(crate) mod assembler;
pub(crate) mod client;
pub(crate) mod config;
pub(crate) mod io;
pub(crate) mod query_result;
pub(crate) mod statement;
pub(crate) mod summary;
pub mod transaction;

pub use assembler::assemble;
pub use client::Client;
pub use config::{ClientConfig, PoolConfig};
pub use io::{Connection, Connector, Frame, Pool, PooledClient, Request};
pub use query_result::{QueryResult, Record, ResponseItem, Row};
pub use statement::{NodeQuery, RelationshipQuery};
