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

//! Account-level semantics on top of the datastore: uniqueness on create,
//! all-or-nothing listing, and the token touch that distinguishes an unknown
//! token from a store failure.

use std::{fmt,
          sync::Arc};

use actix_web::{error::BlockingError,
                web};

use crate::{db::{error::Error as DbError,
                 models::account::{Account,
                                   NewAccount},
                 schema::account::ACCOUNTS_EMAIL_KEY,
                 AccountUpdate,
                 DataStore,
                 LookupIndex},
            server::framework::middleware::RequestContext};

/// Outcome of a repository call that did not succeed. Handlers map every
/// variant to exactly one HTTP status.
#[derive(Debug)]
pub enum RepoError {
    Validation(String),
    EmailConflict(String),
    Unauthorized,
    Store(DbError),
    Blocking(BlockingError),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RepoError::Validation(ref msg) => write!(f, "Validation failed: {}", msg),
            RepoError::EmailConflict(ref email) => write!(f, "Email already used: {}", email),
            RepoError::Unauthorized => write!(f, "Unauthorized"),
            RepoError::Store(ref e) => write!(f, "Datastore error: {}", e),
            RepoError::Blocking(ref e) => write!(f, "Blocking pool error: {}", e),
        }
    }
}

#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn DataStore>,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self { AccountRepository { store } }

    // Runs a blocking store call on the blocking pool; the caller suspends
    // until it completes.
    async fn call<T, F>(&self, f: F) -> Result<T, RepoError>
        where F: FnOnce(&dyn DataStore) -> crate::db::error::Result<T> + Send + 'static,
              T: Send + 'static
    {
        let store = Arc::clone(&self.store);
        web::block(move || f(store.as_ref())).await
                                             .map_err(RepoError::Blocking)?
                                             .map_err(RepoError::Store)
    }

    pub async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>, RepoError> {
        match self.call(|store| store.read_all()).await {
            Ok(accounts) => {
                debug!(request_id = ctx.request_id.as_str();
                       "listed {} accounts", accounts.len());
                Ok(accounts)
            }
            Err(err) => {
                error!(request_id = ctx.request_id.as_str();
                       "list_accounts failed: {}", err);
                Err(err)
            }
        }
    }

    pub async fn create_account(&self,
                                ctx: &RequestContext,
                                email: &str,
                                name: &str)
                                -> Result<Account, RepoError> {
        validate_email(email)?;

        let row = NewAccount::generate(email, name);
        let insert = row.clone();
        match self.call(move |store| store.insert_unique(&insert)).await {
            Ok(()) => {
                info!(request_id = ctx.request_id.as_str();
                      "created account {}", row.account_id);
                Ok(Account::from(row))
            }
            Err(RepoError::Store(DbError::Conflict(ref constraint)))
                if constraint == ACCOUNTS_EMAIL_KEY =>
            {
                debug!(request_id = ctx.request_id.as_str();
                       "email already used: {}", email);
                Err(RepoError::EmailConflict(email.to_string()))
            }
            Err(err) => {
                error!(request_id = ctx.request_id.as_str();
                       "create_account failed: {}", err);
                Err(err)
            }
        }
    }

    pub async fn authenticate_and_touch(&self,
                                        ctx: &RequestContext,
                                        token: &str)
                                        -> Result<(), RepoError> {
        if token.is_empty() {
            return Err(RepoError::Unauthorized);
        }

        let key = token.to_string();
        match self.call(move |store| {
                      store.lookup_and_update(LookupIndex::ApiToken,
                                              &key,
                                              AccountUpdate::TouchLastAccessed)
                  })
                  .await
        {
            Ok(account_id) => {
                debug!(request_id = ctx.request_id.as_str();
                       "touched account {}", account_id);
                Ok(())
            }
            Err(RepoError::Store(DbError::NotFound)) => {
                debug!(request_id = ctx.request_id.as_str();
                       "no account for presented token");
                Err(RepoError::Unauthorized)
            }
            Err(err) => {
                error!(request_id = ctx.request_id.as_str();
                       "authenticate_and_touch failed: {}", err);
                Err(err)
            }
        }
    }
}

fn validate_email(email: &str) -> Result<(), RepoError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(RepoError::Validation("email is required".to_string()));
    }
    if trimmed.len() != email.len() || !email.contains('@') {
        return Err(RepoError::Validation("invalid email".to_string()));
    }
    Ok(())
}
