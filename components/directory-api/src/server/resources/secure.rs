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

use actix_web::{web::{self,
                      Data,
                      ServiceConfig},
                HttpRequest,
                HttpResponse};

use crate::server::{error::Error,
                    framework::{headers,
                                middleware::RequestContext},
                    repository::AccountRepository,
                    MessageResponse};

pub struct Secure {}

impl Secure {
    // Route registration
    //
    pub fn register(cfg: &mut ServiceConfig) {
        cfg.route("/secure", web::get().to(secure_endpoint));
    }
}

// A secure endpoint called with an API token. Every successful call records
// the account's last access time.
async fn secure_endpoint(req: HttpRequest,
                         ctx: RequestContext,
                         repo: Data<AccountRepository>)
                         -> HttpResponse {
    let token = match headers::bearer_token(req.headers()) {
        Some(token) => token,
        None => return Error::BadRequest("invalid header".to_string()).into(),
    };

    match repo.authenticate_and_touch(&ctx, token).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse { message: "ok" }),
        Err(err) => Error::from(err).into(),
    }
}
