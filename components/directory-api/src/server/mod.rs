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

pub mod error;
pub mod framework;
pub mod repository;
pub mod resources;

use std::{io,
          sync::Arc,
          time::Duration};

use actix_cors::Cors;
use actix_web::{body::MessageBody,
                dev::{ServerHandle,
                      ServiceFactory,
                      ServiceRequest,
                      ServiceResponse},
                http::{header,
                       StatusCode},
                middleware::{Logger,
                             NormalizePath},
                web::{self,
                      Data,
                      JsonConfig,
                      ServiceConfig},
                App,
                HttpRequest,
                HttpResponse,
                HttpServer};

use crate::{config::{Config,
                     CorsCfg,
                     GatewayCfg},
            db::DataStore};

use self::{error::Error,
           framework::middleware,
           repository::AccountRepository,
           resources::{accounts::Accounts,
                       secure::Secure}};

// `%{r}a` is the client address as reported by `Forwarded`/`X-Forwarded-For`,
// falling back to the peer address.
const ACCESS_LOG_FORMAT: &str = "%{x-request-id}o %{r}a \"%r\" %s %b %Dms";

#[derive(Debug, Serialize)]
pub struct MessageResponse<'a> {
    pub message: &'a str,
}

/// Endpoint for determining availability of the API process.
///
/// Returns a status 200 on success. Any non-200 responses are an outage or a partial outage.
pub async fn status() -> HttpResponse { HttpResponse::new(StatusCode::OK) }

async fn root() -> HttpResponse { HttpResponse::Ok().body("ok") }

async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse { message: "Hello, API!" })
}

fn json_error_handler(err: actix_web::error::JsonPayloadError,
                      _req: &HttpRequest)
                      -> actix_web::Error {
    debug!("Rejecting request body: {}", err);
    Error::BadRequest("invalid request".to_string()).into()
}

fn cors(cfg: &CorsCfg) -> Cors {
    let cors = Cors::default().allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                              .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                              .max_age(300);
    if cfg.allows_any_origin() {
        return cors.allow_any_origin();
    }
    cfg.allowed_origins
       .iter()
       .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Registers the `/api` scope: CORS, JSON body limits and the account resources.
pub fn api_routes(cfg: &mut ServiceConfig, cors_cfg: &CorsCfg) {
    cfg.service(web::scope("/api").wrap(cors(cors_cfg))
                                  .app_data(JsonConfig::default().content_type_required(false)
                                                                 .limit(16 * 1024)
                                                                 .error_handler(json_error_handler))
                                  .route("", web::get().to(api_root))
                                  .configure(Accounts::register)
                                  .configure(Secure::register));
}

/// The full application: middleware stack plus every route.
pub fn app(repo: Data<AccountRepository>,
           cors_cfg: CorsCfg)
           -> App<impl ServiceFactory<ServiceRequest,
                                      Config = (),
                                      Response = ServiceResponse<impl MessageBody>,
                                      Error = actix_web::Error,
                                      InitError = ()>> {
    App::new().app_data(repo)
              .wrap_fn(|req, srv| middleware::request_id(req, srv))
              .wrap(Logger::new(ACCESS_LOG_FORMAT).exclude("/status"))
              .wrap(NormalizePath::trim())
              .route("/", web::get().to(root))
              .route("/status", web::get().to(status))
              .route("/status", web::head().to(status))
              .configure(|cfg| api_routes(cfg, &cors_cfg))
}

pub async fn run(config: Config, store: Arc<dyn DataStore>) -> io::Result<()> {
    let repo = Data::new(AccountRepository::new(store));
    let cors_cfg = config.cors.clone();
    let grace = config.http.shutdown_timeout;

    info!("acctdir-api listening on {}:{}",
          config.listen_addr(),
          config.listen_port());

    let server = {
        let repo = repo.clone();
        HttpServer::new(move || app(repo.clone(), cors_cfg.clone()))
            .workers(config.handler_count())
            .keep_alive(Duration::from_secs(config.http.keep_alive))
            .shutdown_timeout(grace)
            .disable_signals()
            .bind(config.http.clone())?
            .run()
    };

    let watcher = actix_rt::spawn(shutdown_on_signal(server.handle(), grace));
    info!("started");

    let result = server.await;
    watcher.abort();

    // Last handle to the pool; dropping it closes the datastore connections.
    drop(repo);
    info!("datastore handle released");

    if let Err(ref e) = result {
        warn!("Server stopped with error: {}", e);
    }
    info!("bye");
    result
}

// Waits for SIGINT/SIGTERM, then stops accepting connections and gives
// in-flight requests up to `grace` seconds to finish.
async fn shutdown_on_signal(handle: ServerHandle, grace: u64) {
    let signal = wait_for_signal().await;
    info!("received signal {}", signal);
    info!("terminating, draining in-flight requests for up to {}s", grace);

    handle.stop(true).await;

    info!("shutdown completed");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal,
                              SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!("Unable to listen for SIGTERM, only SIGINT will stop the server: {}",
                  e);
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = tokio::signal::ctrl_c() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
