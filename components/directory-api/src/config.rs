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

//! Configuration for the account directory API service

use std::{env,
          error,
          fmt,
          fs,
          io,
          net::{IpAddr,
                Ipv4Addr,
                SocketAddr,
                ToSocketAddrs},
          option::IntoIter,
          path::{Path,
                 PathBuf}};

use actix_web::http::{header::HeaderValue,
                      Uri};
use serde::de::DeserializeOwned;

use crate::db::config::DataStoreCfg;

/// A configuration struct that can be loaded from a TOML file.
pub trait ConfigFile: DeserializeOwned + Sized {
    fn from_file<T: AsRef<Path>>(filepath: T) -> Result<Self, ConfigError> {
        let path = filepath.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(ConfigError::Parse)
    }
}

pub trait GatewayCfg {
    /// Default number of worker threads to simultaneously handle HTTP requests.
    fn default_handler_count() -> usize { num_cpus::get() }

    /// Number of worker threads to simultaneously handle HTTP requests.
    fn handler_count(&self) -> usize { Self::default_handler_count() }

    fn listen_addr(&self) -> &IpAddr;

    fn listen_port(&self) -> u16;
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http:      HttpCfg,
    pub log:       LogCfg,
    pub cors:      CorsCfg,
    pub datastore: DataStoreCfg,
}

impl ConfigFile for Config {
    fn from_raw(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.cors.validate()?;
        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, io::Error),
    Parse(toml::de::Error),
    LogLevel(String),
    CorsOrigin(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref path, ref e) => {
                write!(f, "Unable to read config file {}: {}", path.display(), e)
            }
            ConfigError::Parse(ref e) => write!(f, "Invalid config: {}", e),
            ConfigError::LogLevel(ref level) => write!(f, "Unknown log level: {:?}", level),
            ConfigError::CorsOrigin(ref origin) => {
                write!(f, "Invalid CORS origin {:?}, expected scheme://host[:port] or \"*\"",
                       origin)
            }
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ConfigError::Io(_, ref e) => Some(e),
            ConfigError::Parse(ref e) => Some(e),
            ConfigError::LogLevel(_) | ConfigError::CorsOrigin(_) => None,
        }
    }
}

impl GatewayCfg for Config {
    fn handler_count(&self) -> usize { self.http.handler_count }

    fn listen_addr(&self) -> &IpAddr { &self.http.listen }

    fn listen_port(&self) -> u16 { self.http.port }
}

/// Public listening net address for HTTP requests
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub listen:           IpAddr,
    pub port:             u16,
    pub handler_count:    usize,
    /// Seconds an idle keep-alive connection is held open
    pub keep_alive:       u64,
    /// Seconds in-flight requests get to finish after a shutdown signal
    pub shutdown_timeout: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        let port = env::var("PORT").ok()
                                   .and_then(|val| val.parse::<u16>().ok())
                                   .unwrap_or(8080);
        HttpCfg { listen: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
                  port,
                  handler_count: Config::default_handler_count(),
                  keep_alive: 60,
                  shutdown_timeout: 10 }
    }
}

impl ToSocketAddrs for HttpCfg {
    type Iter = IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> io::Result<IntoIter<SocketAddr>> {
        match self.listen {
            IpAddr::V4(ref a) => (*a, self.port).to_socket_addrs(),
            IpAddr::V6(ref a) => (*a, self.port).to_socket_addrs(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for terminals.
    Pretty,
    /// One JSON object per line with Cloud Logging severities.
    Json,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogCfg {
    pub level:  String,
    pub format: LogFormat,
}

impl Default for LogCfg {
    fn default() -> Self {
        let level = env::var("LOG_LEVEL").ok()
                                         .filter(|l| !l.is_empty())
                                         .unwrap_or_else(|| String::from("info"));
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };
        LogCfg { level, format }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CorsCfg {
    /// Origins allowed on the `/api` scope. `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl CorsCfg {
    /// True when a `"*"` entry opens the API to every origin. Any explicit
    /// origins listed next to it are then irrelevant.
    pub fn allows_any_origin(&self) -> bool { self.allowed_origins.iter().any(|o| o == "*") }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for origin in self.allowed_origins.iter().filter(|o| *o != "*") {
            let valid = match origin.parse::<Uri>() {
                Ok(uri) => {
                    uri.scheme().is_some()
                    && uri.host().is_some()
                    && uri.path_and_query().map_or(true, |pq| pq.as_str() == "/")
                    && !origin.ends_with('/')
                    && HeaderValue::from_str(origin).is_ok()
                }
                Err(_) => false,
            };
            if !valid {
                return Err(ConfigError::CorsOrigin(origin.clone()));
            }
        }
        Ok(())
    }
}

impl Default for CorsCfg {
    fn default() -> Self {
        CorsCfg { allowed_origins: vec![String::from("*")], }
    }
}
