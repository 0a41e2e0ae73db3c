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

#[macro_use]
extern crate log;

use std::{fmt,
          path::Path,
          process,
          sync::Arc};

use account_directory_api as acctdir_api;
use account_directory_db as acctdir_db;
use clap::{crate_version,
           value_parser,
           Arg,
           ArgAction,
           ArgMatches,
           Command};

use crate::{acctdir_api::{config::{Config,
                                   ConfigError,
                                   ConfigFile},
                          logger,
                          server},
            acctdir_db::{DataStore,
                         DbPool,
                         MemoryStore}};

const CFG_DEFAULT_PATH: &str = "/etc/acctdir/config.toml";

#[actix_rt::main]
async fn main() {
    let matches = app().get_matches();
    let args = match matches.subcommand_matches("start") {
        Some(args) => args,
        None => exit_with("missing subcommand", 1),
    };

    let config = match config_from_args(args) {
        Ok(config) => config,
        Err(e) => exit_with(e, 1),
    };
    if let Err(e) = logger::init(&config.log) {
        exit_with(e, 1);
    }
    debug!("CLI matches: {:?}", matches);

    let store: Arc<dyn DataStore> = if args.get_flag("memory") {
        warn!("Using the in-memory datastore; accounts are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        match DbPool::new(&config.datastore) {
            Ok(pool) => Arc::new(pool),
            Err(e) => exit_with(format!("Unable to reach the datastore: {}", e), 1),
        }
    };

    match server::run(config, store).await {
        Ok(_) => process::exit(0),
        Err(e) => exit_with(e, 1),
    }
}

fn app() -> Command {
    let start = Command::new("start").about("Run the acctdir-api server")
                                     .arg(Arg::new("config").short('c')
                                                            .long("config")
                                                            .value_name("FILE")
                                                            .help("Filepath to configuration file. \
                                                                   [default: /etc/acctdir/config.toml]"))
                                     .arg(Arg::new("port").long("port")
                                                          .value_name("PORT")
                                                          .value_parser(value_parser!(u16))
                                                          .help("Listen port. [default: 8080]"))
                                     .arg(Arg::new("memory").long("memory")
                                                            .action(ArgAction::SetTrue)
                                                            .help("Keep accounts in memory instead \
                                                                   of PostgreSQL"));

    Command::new("acctdir-api").version(crate_version!())
                               .about("Account directory API server")
                               .subcommand_required(true)
                               .arg_required_else_help(true)
                               .subcommand(start)
}

fn config_from_args(args: &ArgMatches) -> Result<Config, ConfigError> {
    let mut config = match args.get_one::<String>("config") {
        Some(cfg_path) => Config::from_file(cfg_path)?,
        None if Path::new(CFG_DEFAULT_PATH).exists() => Config::from_file(CFG_DEFAULT_PATH)?,
        None => Config::default(),
    };

    if let Some(port) = args.get_one::<u16>("port") {
        config.http.port = *port;
    }

    Ok(config)
}

fn exit_with<T>(err: T, code: i32) -> !
    where T: fmt::Display
{
    eprintln!("{}", err);
    process::exit(code)
}
