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

//! The three primitives the account directory needs from its store.

use diesel::{prelude::*,
             sql_types::Text};

use crate::{diesel_pool::DbPool,
            error::Result,
            models::account::{Account,
                              NewAccount},
            schema::account::accounts};

/// Secondary indexes usable as the entry point of [`DataStore::lookup_and_update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupIndex {
    /// Unique index on `api_token`.
    ApiToken,
}

/// Updates applied to the row found by [`DataStore::lookup_and_update`],
/// parameterized by that row's `account_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountUpdate {
    /// Sets `last_accessed` to the store's clock. Never moves it backwards.
    TouchLastAccessed,
}

pub trait DataStore: Send + Sync {
    /// Full scan of the accounts table. Order is unspecified; a row that fails
    /// to decode fails the whole read.
    fn read_all(&self) -> Result<Vec<Account>>;

    /// Inserts a single row. A uniqueness violation is reported as
    /// `Error::Conflict` with the violated constraint and nothing is written.
    fn insert_unique(&self, account: &NewAccount) -> Result<()>;

    /// Looks up exactly one row through `index` and applies `update` to it in
    /// the same read-write transaction, returning the row's `account_id`.
    /// A missing row aborts the transaction with `Error::NotFound`.
    fn lookup_and_update(&self,
                         index: LookupIndex,
                         key: &str,
                         update: AccountUpdate)
                         -> Result<String>;
}

const TOUCH_LAST_ACCESSED_SQL: &str =
    "UPDATE accounts SET last_accessed = GREATEST(COALESCE(last_accessed, CURRENT_TIMESTAMP), \
     CURRENT_TIMESTAMP) WHERE account_id = $1";

impl DataStore for DbPool {
    fn read_all(&self) -> Result<Vec<Account>> {
        let mut conn = self.get_conn()?;
        let rows = accounts::table.select(Account::as_select())
                                  .load(&mut *conn)?;
        Ok(rows)
    }

    fn insert_unique(&self, account: &NewAccount) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::insert_into(accounts::table).values(account)
                                            .execute(&mut *conn)?;
        Ok(())
    }

    fn lookup_and_update(&self,
                         index: LookupIndex,
                         key: &str,
                         update: AccountUpdate)
                         -> Result<String> {
        let mut conn = self.get_conn()?;
        conn.build_transaction()
            .serializable()
            .read_write()
            .run::<_, crate::error::Error, _>(|conn| {
                let account_id = match index {
                    LookupIndex::ApiToken => {
                        accounts::table.filter(accounts::api_token.eq(key))
                                       .select(accounts::account_id)
                                       .first::<String>(conn)?
                    }
                };
                trace!("lookup_and_update matched account_id={}", account_id);

                match update {
                    AccountUpdate::TouchLastAccessed => {
                        diesel::sql_query(TOUCH_LAST_ACCESSED_SQL).bind::<Text, _>(&account_id)
                                                                  .execute(conn)?;
                    }
                }

                Ok(account_id)
            })
    }
}
