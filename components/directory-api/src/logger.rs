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

//! Process-wide logger setup.
//!
//! The JSON format writes one object per line and tags every record with a
//! `severity` in Google Cloud Logging vocabulary.

use std::{env,
          io::Write,
          str::FromStr};

use chrono::{DateTime,
             SecondsFormat,
             Utc};
use log::{kv::{self,
              VisitSource},
          Level,
          LevelFilter,
          Record};
use serde_json::{json,
                 Map,
                 Value};

use crate::config::{ConfigError,
                    LogCfg,
                    LogFormat};

/// Installs the global logger. `RUST_LOG`, when set, refines the configured
/// level with per-module filters.
pub fn init(cfg: &LogCfg) -> Result<(), ConfigError> {
    let level = LevelFilter::from_str(&cfg.level).map_err(|_| {
                                                     ConfigError::LogLevel(cfg.level.clone())
                                                 })?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match cfg.format {
        LogFormat::Json => {
            builder.format(|buf, record| writeln!(buf, "{}", json_record(record, Utc::now())))
        }
        LogFormat::Pretty => {
            builder.format(|buf, record| writeln!(buf, "{}", pretty_record(record, Utc::now())))
        }
    };

    // A logger installed earlier (tests, embedding) wins.
    if builder.try_init().is_err() {
        debug!("Logger already initialized, keeping the existing one");
    }
    Ok(())
}

/// https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#LogSeverity
pub fn severity(level: Level) -> &'static str {
    match level {
        Level::Trace => "DEFAULT",
        Level::Debug => "DEBUG",
        Level::Info => "INFO",
        Level::Warn => "WARNING",
        Level::Error => "ERROR",
    }
}

fn json_record(record: &Record, time: DateTime<Utc>) -> Value {
    let mut entry = json!({
        "time": time.to_rfc3339_opts(SecondsFormat::Nanos, true),
        "severity": severity(record.level()),
        "target": record.target(),
        "message": record.args().to_string(),
    });
    if let (Some(file), Some(line)) = (record.file(), record.line()) {
        entry["caller"] = Value::String(format!("{}:{}", file, line));
    }
    for (key, value) in fields(record) {
        entry[key.as_str()] = value;
    }
    entry
}

fn pretty_record(record: &Record, time: DateTime<Utc>) -> String {
    let mut line = format!("[{} {:<5} {}] {}",
                           time.to_rfc3339_opts(SecondsFormat::Millis, true),
                           record.level(),
                           record.target(),
                           record.args());
    for (key, value) in fields(record) {
        match value {
            Value::String(s) => line.push_str(&format!(" {}={}", key, s)),
            other => line.push_str(&format!(" {}={}", key, other)),
        }
    }
    line
}

// Structured fields attached with `info!(request_id = ...; "...")`.
pub(crate) fn fields(record: &Record) -> Map<String, Value> {
    let mut collected = Fields(Map::new());
    if let Err(e) = record.key_values().visit(&mut collected) {
        collected.0
                 .insert("log_fields_error".to_string(), Value::String(e.to_string()));
    }
    collected.0
}

struct Fields(Map<String, Value>);

impl<'kvs> VisitSource<'kvs> for Fields {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }
}
