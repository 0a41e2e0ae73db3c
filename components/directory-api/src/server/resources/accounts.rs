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

use actix_web::{http,
                web::{self,
                      Data,
                      Json,
                      ServiceConfig},
                HttpResponse};

use crate::{db::models::account::Account,
            server::{error::Error,
                     framework::{headers,
                                 middleware::RequestContext},
                     repository::AccountRepository}};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateAccountReq {
    pub email: String,
    #[serde(default)]
    pub name:  String,
}

#[derive(Debug, Serialize)]
pub struct AccountListResponse {
    pub accounts: Vec<Account>,
}

pub struct Accounts {}

impl Accounts {
    // Route registration
    //
    pub fn register(cfg: &mut ServiceConfig) {
        cfg.route("/accounts", web::get().to(get_accounts))
           .route("/accounts", web::post().to(create_account));
    }
}

// Route handlers - these functions can return any Responder trait
//
async fn get_accounts(ctx: RequestContext, repo: Data<AccountRepository>) -> HttpResponse {
    match repo.list_accounts(&ctx).await {
        Ok(accounts) => HttpResponse::Ok().json(AccountListResponse { accounts }),
        Err(err) => Error::from(err).into(),
    }
}

// The response carries the account's api_token. This is the only place the
// token is ever disclosed, so it must not be cached along the way.
async fn create_account(ctx: RequestContext,
                        body: Json<CreateAccountReq>,
                        repo: Data<AccountRepository>)
                        -> HttpResponse {
    match repo.create_account(&ctx, &body.email, &body.name).await {
        Ok(account) => {
            HttpResponse::Ok().insert_header((http::header::CACHE_CONTROL, headers::NO_CACHE))
                              .json(account)
        }
        Err(err) => Error::from(err).into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode,
                    test};
    use serde_json::{json,
                     Value};

    use super::*;
    use crate::{config::CorsCfg,
                db::{error::Error as DbError,
                     models::account::NewAccount,
                     AccountUpdate,
                     DataStore,
                     LookupIndex,
                     MemoryStore},
                server::app};

    fn repo(store: Arc<dyn DataStore>) -> Data<AccountRepository> {
        Data::new(AccountRepository::new(store))
    }

    fn create_req(body: Value) -> test::TestRequest {
        test::TestRequest::post().uri("/api/accounts").set_json(body)
    }

    #[actix_rt::test]
    async fn create_duplicate_then_list() {
        let app = test::init_service(app(repo(Arc::new(MemoryStore::new())),
                                         CorsCfg::default())).await;

        let req = create_req(json!({"email": "a@x.com", "name": "A"})).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(http::header::CACHE_CONTROL).unwrap(),
                   headers::NO_CACHE);
        let created: Value = test::read_body_json(res).await;
        assert_eq!(created["email"], "a@x.com");
        assert_eq!(created["name"], "A");
        assert_eq!(created["last_accessed"], Value::Null);
        assert!(created["account_id"].as_str().map_or(false, |id| !id.is_empty()));
        assert!(created["api_token"].as_str().map_or(false, |t| !t.is_empty()));

        let req = create_req(json!({"email": "a@x.com", "name": "A"})).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let conflict: Value = test::read_body_json(res).await;
        assert_eq!(conflict["status"], 409);
        assert!(conflict["message"].as_str().unwrap().contains("a@x.com"));

        let req = test::TestRequest::get().uri("/api/accounts").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        let accounts = listed["accounts"].as_array().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0], created);
    }

    #[actix_rt::test]
    async fn concurrent_creates_with_same_email() {
        let app = test::init_service(app(repo(Arc::new(MemoryStore::new())),
                                         CorsCfg::default())).await;

        let one = create_req(json!({"email": "r@x.com", "name": "1"})).to_request();
        let two = create_req(json!({"email": "r@x.com", "name": "2"})).to_request();
        let (first, second) = futures::join!(test::call_service(&app, one),
                                             test::call_service(&app, two));

        let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
        statuses.sort_unstable();
        assert_eq!(statuses, vec![200, 409]);

        let req = test::TestRequest::get().uri("/api/accounts/").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["accounts"].as_array().unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn malformed_body_is_a_bad_request() {
        let app = test::init_service(app(repo(Arc::new(MemoryStore::new())),
                                         CorsCfg::default())).await;

        let req = test::TestRequest::post().uri("/api/accounts")
                                           .insert_header((http::header::CONTENT_TYPE,
                                                           "application/json"))
                                           .set_payload("{\"email\": ")
                                           .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({"status": 400, "message": "invalid request"}));

        let req = create_req(json!({"email": "not-an-email"})).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    struct UnreadableStore;

    impl DataStore for UnreadableStore {
        fn read_all(&self) -> crate::db::error::Result<Vec<Account>> { Err(DbError::StorePoisoned) }

        fn insert_unique(&self, _: &NewAccount) -> crate::db::error::Result<()> {
            Err(DbError::StorePoisoned)
        }

        fn lookup_and_update(&self,
                             _: LookupIndex,
                             _: &str,
                             _: AccountUpdate)
                             -> crate::db::error::Result<String> {
            Err(DbError::StorePoisoned)
        }
    }

    #[actix_rt::test]
    async fn store_failures_do_not_leak_details() {
        let app = test::init_service(app(repo(Arc::new(UnreadableStore)), CorsCfg::default())).await;

        for req in vec![test::TestRequest::get().uri("/api/accounts").to_request(),
                        create_req(json!({"email": "a@x.com", "name": "A"})).to_request()]
        {
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body, json!({"status": 500, "message": "internal server error"}));
        }
    }
}
