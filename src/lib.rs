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

//! Object-graph mapping on top of a Bolt connection.
//!
//! The crate does not speak the wire protocol itself. Instead, it drives a
//! [`Connection`](`driver::Connection`) handed out by a user supplied
//! [`Connector`](`driver::Connector`) and
//!  * turns [`Node`](`graph::Node`)s and [`Relationship`](`graph::Relationship`)s into Cypher
//!    statements,
//!  * reassembles the decoded response frames into a [`QueryResult`](`driver::QueryResult`)
//!    (see [`driver::assemble()`]),
//!  * lends [`Client`](`driver::Client`)s out of a bounded [`Pool`](`driver::Pool`).
//!
//! Logging happens through the [`log`](https://docs.rs/log) facade.

mod error;
mod macros;
mod sync;

pub mod driver;
pub mod value;

pub use error::{OgmError, Result, ServerError};
pub use value::ValueReceive;
pub use value::ValueSend;

pub mod graph {
    pub use super::value::graph::*;
}
pub mod transaction {
    pub use super::driver::transaction::*;
}
/// Query statistics received along with the records of a query.
pub mod summary {
    pub use super::driver::summary::*;
}
