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

use actix_web::http::header::{self,
                              HeaderMap};

pub const NO_CACHE: &str = "private, no-cache, no-store";

pub const XREQUESTID: &str = "x-request-id"; // must be lowercase

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the token from an `Authorization: Bearer <token>` header. Any other
/// scheme, a missing header or an empty token yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}
