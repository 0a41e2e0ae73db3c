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

//! Test support: a process-wide logger that keeps every record so tests can
//! assert on what was logged.

use std::sync::{Mutex,
                Once};

use log::{Log,
          Metadata,
          Record};
use serde_json::{Map,
                 Value};

use crate::logger;

#[derive(Clone, Debug)]
pub struct Captured {
    pub target:  String,
    pub message: String,
    pub fields:  Map<String, Value>,
}

struct CaptureLog {
    records: Mutex<Vec<Captured>>,
}

static CAPTURE: CaptureLog = CaptureLog { records: Mutex::new(Vec::new()), };
static INSTALL: Once = Once::new();

impl Log for CaptureLog {
    fn enabled(&self, _: &Metadata) -> bool { true }

    fn log(&self, record: &Record) {
        let captured = Captured { target:  record.target().to_string(),
                                  message: record.args().to_string(),
                                  fields:  logger::fields(record), };
        if let Ok(mut records) = self.records.lock() {
            records.push(captured);
        }
    }

    fn flush(&self) {}
}

/// Installs the capturing logger. Safe to call from every test.
pub fn capture_logs() {
    INSTALL.call_once(|| {
               log::set_logger(&CAPTURE).expect("another logger was installed first");
               log::set_max_level(log::LevelFilter::Trace);
           });
}

/// Records logged so far, across all tests, that match `pred`.
pub fn logged<F>(pred: F) -> Vec<Captured>
    where F: Fn(&Captured) -> bool
{
    CAPTURE.records
           .lock()
           .expect("capture log poisoned")
           .iter()
           .filter(|c| pred(c))
           .cloned()
           .collect()
}
