// Copyright 2025 jonefeewang@gmail.com
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

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stonemq_listener::{setup_local_tracing, setup_tracing, AppResult, BackOff, BackOffAction, ListenerConfig};
use tracing::info;

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    /// also write logs to hourly rolling files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// log level (v: info, vv: debug, vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// print the effective configuration
    PrintConfig,
    /// print what the configured backoff does for successive failures of one record
    BackoffPlan {
        #[arg(short, long, default_value_t = 10)]
        attempts: u32,
    },
}

fn main() -> AppResult<()> {
    let commandline = CommandLine::parse();
    let _log_guard = match &commandline.log_dir {
        Some(log_dir) => Some(setup_tracing(log_dir, commandline.verbose)),
        None => {
            setup_local_tracing(commandline.verbose)?;
            None
        }
    };

    let config_path = commandline.conf.as_ref().map_or_else(
        || {
            let mut path = PathBuf::from("./");
            path.push("listener.toml");
            path
        },
        PathBuf::from,
    );
    info!("loading config from {}", config_path.display());
    let listener_config = ListenerConfig::set_up_config(config_path)?;

    match commandline.command.unwrap_or(Command::PrintConfig) {
        Command::PrintConfig => println!("{:#?}", listener_config),
        Command::BackoffPlan { attempts } => {
            let back_off = listener_config.processor.backoff.build();
            // assumes each redelivery fails right after its delay
            let mut elapsed = Duration::ZERO;
            for attempt in 1..=attempts {
                match back_off.next_action(attempt, elapsed) {
                    BackOffAction::Delay(delay) => {
                        println!("failure {}: redeliver after {} ms", attempt, delay.as_millis());
                        elapsed = elapsed.saturating_add(delay);
                    }
                    BackOffAction::Stop => {
                        println!("failure {}: retries exhausted, record is recovered", attempt);
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
