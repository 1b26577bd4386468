// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line entry point.
//!
//! Exit status: `0` when every job succeeded, `1` when a job or the
//! connection failed, `2` for invalid options.

use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use oracle_csv_exporter::application::orchestrator::ExportOrchestrator;
use oracle_csv_exporter::application::report::write_report;
use oracle_csv_exporter::application::target_resolver::TargetResolver;
use oracle_csv_exporter::config::{AppConfig, CliArgs};
use oracle_csv_exporter::domain::entities::{ExportOptions, TargetSpec};
use oracle_csv_exporter::domain::errors::{ExportError, Result};
use oracle_csv_exporter::infrastructure::oracle::session::OracleSession;
use std::io::{self, BufWriter, Write};
use std::process;

const EXIT_FAILED: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    // Logs go to stderr; stdout may carry CSV.
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    process::exit(run(&args));
}

fn exit_code(e: &ExportError) -> i32 {
    if e.is_fatal() {
        EXIT_USAGE
    } else {
        EXIT_FAILED
    }
}

fn load(args: &CliArgs) -> Result<(AppConfig, TargetSpec)> {
    let config = AppConfig::load(args)?;
    let spec = args.target_spec()?;
    Ok((config, spec))
}

fn run(args: &CliArgs) -> i32 {
    let (config, spec) = match load(args) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return EXIT_USAGE;
        }
    };
    let options = config.export_options();

    let session = match OracleSession::connect(&config.database.credentials()) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return EXIT_FAILED;
        }
    };

    let code = export(&session, &config, &spec, &options);

    if let Err(e) = session.close() {
        error!("Failed to close session: {}", e);
    }
    code
}

fn export(
    session: &OracleSession,
    config: &AppConfig,
    spec: &TargetSpec,
    options: &ExportOptions,
) -> i32 {
    let started_at = Local::now();

    let plan = match TargetResolver::new(session, options).resolve(spec) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            return exit_code(&e);
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = ExportOrchestrator::new(session).run(plan, &mut out);
    if let Err(e) = out.flush() {
        error!("Cannot write to <stdout>: {}", e);
        return EXIT_FAILED;
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            return exit_code(&e);
        }
    };

    if let Some(path) = config.report_path() {
        match write_report(&summary, started_at, &path) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => error!("{}", e),
        }
    }

    let failed = summary.failed_targets();
    info!(
        "Export finished. {}/{} jobs successful in {:.2}s.",
        summary.results.len() - failed.len(),
        summary.results.len(),
        summary.duration
    );
    if summary.is_success() {
        0
    } else {
        error!("Failed targets: {}", failed.join(", "));
        EXIT_FAILED
    }
}
