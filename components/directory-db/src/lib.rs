// Copyright (c) 2016 Chef Software Inc. and/or applicable contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistence layer for the account directory.
//!
//! The rest of the service talks to the store exclusively through the
//! [`DataStore`] trait, which is implemented for the Postgres connection pool
//! ([`DbPool`]) and for the in-process [`MemoryStore`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod diesel_pool;
pub mod error;
pub mod memory;
pub mod models;
pub mod schema;
pub mod store;

pub use crate::{diesel_pool::DbPool,
                memory::MemoryStore,
                store::{AccountUpdate,
                        DataStore,
                        LookupIndex}};
