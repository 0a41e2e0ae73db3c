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

use std::{fmt,
          thread,
          time::Duration};

use diesel::{pg::PgConnection,
             r2d2::{ConnectionManager,
                    CustomizeConnection,
                    Pool,
                    PooledConnection},
             RunQueryDsl};

use crate::{config::DataStoreCfg,
            error::{Error,
                    Result}};

type PgPool = Pool<ConnectionManager<PgConnection>>;

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Long-lived handle to the Postgres pool. Cloning shares the pool; the
/// connections close when the last clone is dropped.
#[derive(Clone)]
pub struct DbPool(pub PgPool);

impl fmt::Debug for DbPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DbPool {{ state: {:?} }}", self.0.state())
    }
}

#[derive(Debug)]
struct StatementTimeout(u64);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        diesel::sql_query(format!("SET statement_timeout = {}", self.0)).execute(conn)
                                                                         .map(|_| ())
                                                                         .map_err(diesel::r2d2::Error::QueryError)
    }
}

impl DbPool {
    pub fn new(config: &DataStoreCfg) -> Result<Self> {
        debug!("Creating new DbPool, host: {}:{}, database: {}",
               config.host, config.port, config.database);
        let mut attempts = 0;
        loop {
            let manager = ConnectionManager::<PgConnection>::new(config.to_string());
            match Pool::builder()
                .max_size(config.pool_size)
                .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
                .connection_customizer(Box::new(StatementTimeout(config.statement_timeout_ms)))
                .build(manager)
            {
                Ok(pool) => return Ok(DbPool(pool)),
                Err(e) if attempts >= config.connection_retries => {
                    error!("Giving up on the Postgres connection pool after {} attempts: {}",
                           attempts + 1,
                           e);
                    return Err(Error::ConnectionTimeout(e));
                }
                Err(e) => {
                    error!("Error initializing connection pool to Postgres, will retry: {}",
                           e)
                }
            }
            attempts += 1;
            thread::sleep(Duration::from_millis(config.connection_retry_ms));
        }
    }

    pub fn get_conn(&self) -> Result<PgPooledConnection> {
        match self.0.get() {
            Ok(conn) => Ok(conn),
            Err(e) => Err(e.into()),
        }
    }
}
