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

use actix_web::{http::StatusCode,
                HttpResponse,
                ResponseError};
use std::{error,
          fmt};

use crate::server::repository::RepoError;

/// Client-facing failures. Messages here are safe to show to callers; store
/// errors are logged by the repository and collapse into `System`.
#[derive(Debug)]
pub enum Error {
    Authentication,
    BadRequest(String),
    Conflict(String),
    System,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status:  u16,
    pub message: &'a str,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            Error::Authentication => "unauthorized",
            Error::BadRequest(ref msg) => msg.as_str(),
            Error::Conflict(ref msg) => msg.as_str(),
            Error::System => "internal server error",
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::Authentication => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::System => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        HttpResponse::build(status).json(ErrorBody { status:  status.as_u16(),
                                                     message: &message, })
    }
}

impl From<Error> for HttpResponse {
    fn from(err: Error) -> HttpResponse { err.error_response() }
}

// Every repository outcome has exactly one client-facing rendering.
impl From<RepoError> for Error {
    fn from(err: RepoError) -> Error {
        match err {
            RepoError::Validation(msg) => Error::BadRequest(msg),
            RepoError::EmailConflict(email) => Error::Conflict(format!("{} is already used.", email)),
            RepoError::Unauthorized => Error::Authentication,
            RepoError::Store(_) | RepoError::Blocking(_) => Error::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;
    use crate::db::error::Error as DbError;

    #[actix_rt::test]
    async fn store_errors_render_a_generic_body() {
        let err = Error::from(RepoError::Store(DbError::Conflict("accounts_pkey".to_string())));
        let res: HttpResponse = err.into();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(res.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json,
                   serde_json::json!({"status": 500, "message": "internal server error"}));
    }

    #[test]
    fn repository_outcomes_map_to_statuses() {
        let cases = vec![(RepoError::Validation("invalid email".to_string()),
                          StatusCode::BAD_REQUEST),
                         (RepoError::EmailConflict("a@x.com".to_string()), StatusCode::CONFLICT),
                         (RepoError::Unauthorized, StatusCode::UNAUTHORIZED),
                         (RepoError::Store(DbError::NotFound), StatusCode::INTERNAL_SERVER_ERROR),];
        for (outcome, status) in cases {
            assert_eq!(Error::from(outcome).status_code(), status);
        }
    }

    #[test]
    fn conflict_message_names_the_email() {
        let err = Error::from(RepoError::EmailConflict("a@x.com".to_string()));
        assert_eq!(err.to_string(), "a@x.com is already used.");
    }
}
