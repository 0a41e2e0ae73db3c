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

use std::future::Future;

use actix_web::{dev::{Payload,
                      Service,
                      ServiceRequest,
                      ServiceResponse},
                http::header::{HeaderName,
                               HeaderValue},
                Error,
                FromRequest,
                HttpMessage,
                HttpRequest};
use futures::future::{ready,
                      Ready};
use uuid::Uuid;

use crate::server::framework::headers;

const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id stored in the request extensions by [`request_id`].
#[derive(Clone, Debug)]
struct RequestId(String);

/// Per-request values handed explicitly to the repository and anything else
/// that logs on behalf of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new<T: Into<String>>(request_id: T) -> Self {
        RequestContext { request_id: request_id.into(), }
    }
}

impl FromRequest for RequestContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let request_id = match req.extensions().get::<RequestId>() {
            Some(id) => id.0.clone(),
            None => Uuid::new_v4().to_string(),
        };
        ready(Ok(RequestContext { request_id }))
    }
}

// Tags every request with a correlation id, reusing a sane inbound
// `x-request-id` and echoing it on the response.
pub fn request_id<S, B>(req: ServiceRequest,
                        srv: &S)
                        -> impl Future<Output = Result<ServiceResponse<B>, Error>>
    where S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>
{
    let id = req.headers()
                .get(headers::XREQUESTID)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN)
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let fut = srv.call(req);

    async move {
        let mut res = fut.await?;
        if let Ok(value) = HeaderValue::from_str(&id) {
            res.headers_mut()
               .insert(HeaderName::from_static(headers::XREQUESTID), value);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test,
                    web,
                    App,
                    HttpResponse};

    use super::*;

    async fn echo(ctx: RequestContext) -> HttpResponse {
        HttpResponse::Ok().body(ctx.request_id)
    }

    #[actix_rt::test]
    async fn generated_id_is_shared_with_handlers_and_response() {
        let app = test::init_service(App::new().wrap_fn(|req, srv| request_id(req, srv))
                                               .route("/", web::get().to(echo))).await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let header = res.headers()
                        .get(headers::XREQUESTID)
                        .unwrap()
                        .to_str()
                        .unwrap()
                        .to_string();
        let body = test::read_body(res).await;

        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body, header.as_bytes());
    }

    #[actix_rt::test]
    async fn inbound_id_is_reused() {
        let app = test::init_service(App::new().wrap_fn(|req, srv| request_id(req, srv))
                                               .route("/", web::get().to(echo))).await;

        let req = test::TestRequest::get().uri("/")
                                          .insert_header((headers::XREQUESTID, "trace-abc-123"))
                                          .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "trace-abc-123".as_bytes());
    }
}
