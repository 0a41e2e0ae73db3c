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

//! In-process datastore with the same constraints as the `accounts` table.
//!
//! Every primitive takes the single table lock, so a lookup and its update
//! are one atomic unit, the same guarantee the serializable transaction gives
//! on Postgres.

use std::sync::{Mutex,
                MutexGuard};

use chrono::Utc;

use crate::{error::{Error,
                    Result},
            models::account::{Account,
                              NewAccount},
            schema::account::{ACCOUNTS_API_TOKEN_KEY,
                              ACCOUNTS_EMAIL_KEY,
                              ACCOUNTS_PKEY},
            store::{AccountUpdate,
                    DataStore,
                    LookupIndex}};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Account>>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    fn table(&self) -> Result<MutexGuard<Vec<Account>>> {
        self.rows.lock().map_err(|_| Error::StorePoisoned)
    }
}

impl DataStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<Account>> { Ok(self.table()?.clone()) }

    fn insert_unique(&self, account: &NewAccount) -> Result<()> {
        let mut rows = self.table()?;
        for row in rows.iter() {
            let violated = if row.account_id == account.account_id {
                Some(ACCOUNTS_PKEY)
            } else if row.api_token == account.api_token {
                Some(ACCOUNTS_API_TOKEN_KEY)
            } else if row.email == account.email {
                Some(ACCOUNTS_EMAIL_KEY)
            } else {
                None
            };
            if let Some(constraint) = violated {
                return Err(Error::Conflict(constraint.to_string()));
            }
        }
        rows.push(Account::from(account.clone()));
        Ok(())
    }

    fn lookup_and_update(&self,
                         index: LookupIndex,
                         key: &str,
                         update: AccountUpdate)
                         -> Result<String> {
        let mut rows = self.table()?;
        let row = match index {
            LookupIndex::ApiToken => rows.iter_mut().find(|row| row.api_token == key),
        };
        let row = row.ok_or(Error::NotFound)?;

        match update {
            AccountUpdate::TouchLastAccessed => {
                let now = Utc::now();
                row.last_accessed = Some(row.last_accessed.map_or(now, |prev| prev.max(now)));
            }
        }

        Ok(row.account_id.clone())
    }
}
