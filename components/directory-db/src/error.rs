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

use std::{error,
          fmt,
          result};

use diesel::{r2d2::PoolError,
             result::DatabaseErrorKind};

#[derive(Debug)]
pub enum Error {
    /// A uniqueness constraint rejected the write. Carries the constraint name.
    Conflict(String),
    ConnectionTimeout(PoolError),
    DieselError(diesel::result::Error),
    NotFound,
    StorePoisoned,
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            Error::Conflict(ref constraint) => {
                format!("Uniqueness constraint violated, constraint={}", constraint)
            }
            Error::ConnectionTimeout(ref e) => format!("Connection timeout, {}", e),
            Error::DieselError(ref e) => format!("{}", e),
            Error::NotFound => "Entity not found".to_string(),
            Error::StorePoisoned => "Datastore lock poisoned by a panicked writer".to_string(),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ConnectionTimeout(ref e) => Some(e),
            Error::DieselError(ref e) => Some(e),
            _ => None,
        }
    }
}

// Classifies driver errors so callers never have to inspect Postgres codes.
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Error {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::Conflict(info.constraint_name().unwrap_or_default().to_string())
            }
            e => Error::DieselError(e),
        }
    }
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Error { Error::ConnectionTimeout(err) }
}

#[cfg(test)]
mod tests {
    use diesel::result::DatabaseErrorInformation;

    use super::*;

    /// Error details the way the Postgres driver reports them.
    struct PgErrorInfo(&'static str);

    impl DatabaseErrorInformation for PgErrorInfo {
        fn message(&self) -> &str { "duplicate key value violates unique constraint" }

        fn details(&self) -> Option<&str> { None }

        fn hint(&self) -> Option<&str> { None }

        fn table_name(&self) -> Option<&str> { Some("accounts") }

        fn column_name(&self) -> Option<&str> { None }

        fn constraint_name(&self) -> Option<&str> { Some(self.0) }

        fn statement_position(&self) -> Option<i32> { None }
    }

    #[test]
    fn unique_violation_names_the_constraint() {
        let err: Error =
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation,
                                                 Box::new(PgErrorInfo("accounts_email_key")))
                .into();
        match err {
            Error::Conflict(constraint) => assert_eq!(constraint, "accounts_email_key"),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn other_database_errors_are_not_conflicts() {
        let err: Error =
            diesel::result::Error::DatabaseError(DatabaseErrorKind::SerializationFailure,
                                                 Box::new(PgErrorInfo("accounts_pkey")))
                .into();
        assert!(matches!(err, Error::DieselError(_)));
    }

    #[test]
    fn diesel_not_found_is_classified() {
        let err: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn other_diesel_errors_are_kept() {
        let err: Error = diesel::result::Error::RollbackTransaction.into();
        assert!(matches!(err, Error::DieselError(_)));
        assert_eq!(format!("{}", Error::Conflict("accounts_email_key".to_string())),
                   "Uniqueness constraint violated, constraint=accounts_email_key");
    }
}
