// Copyright (c) 2026 LinkMap Analyzer Authors.
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

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;
use serde_json::json;

use linkmap_analyzer::{compare_builds, parse_map, render_comparison, render_report, MapInfo};

/// Analyze linker map files for memory layout regressions.
///
/// Reads the map file the toolchain wrote next to the firmware image,
/// reports section sizes and critical symbol addresses, and estimates the
/// heap headroom between the end of BSS and the stack. With `--compare` it
/// diffs two builds and flags changes that shrink that headroom.
#[derive(Parser, Debug)]
#[command(
    name = "linkmap-analyzer",
    version,
    about = "Analyze map files for memory layout",
    long_about = None
)]
struct Cli {
    /// Path to a map file to analyze
    map_file: Option<PathBuf>,

    /// Compare two map files
    #[arg(short = 'c', long = "compare", num_args = 2, value_names = ["MAP_A", "MAP_B"])]
    compare: Option<Vec<PathBuf>>,

    /// Emit JSON instead of the text report
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_spec = if cli.debug { "debug" } else { "warn" };
    // The handle must stay alive until exit or logging stops.
    let _logger = match flexi_logger::Logger::try_with_env_or_str(default_spec)
        .and_then(|logger| logger.log_to_stderr().start())
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            // Alternate format prints the context chain, our stand-in for a
            // diagnostic trace.
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match (&cli.compare, &cli.map_file) {
        (Some(pair), _) => {
            let (path_a, path_b) = (&pair[0], &pair[1]);
            if !cli.json {
                println!(
                    "Comparing map files: {} and {}",
                    path_a.display(),
                    path_b.display()
                );
            }
            let build_a = load_map(path_a)?;
            let build_b = load_map(path_b)?;
            let delta = compare_builds(&build_a, &build_b);
            if cli.json {
                let doc = json!({
                    "build_a": { "file": path_a.display().to_string(), "analysis": build_a.to_json() },
                    "build_b": { "file": path_b.display().to_string(), "analysis": build_b.to_json() },
                    "comparison": delta.to_json(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!("{}", render_report(&path_a.display().to_string(), &build_a));
                print!("{}", render_report(&path_b.display().to_string(), &build_b));
                print!("{}", render_comparison(&delta));
            }
            Ok(ExitCode::SUCCESS)
        }
        (None, Some(path)) => {
            let info = load_map(path)?;
            if cli.json {
                let doc = json!({
                    "file": path.display().to_string(),
                    "analysis": info.to_json(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!("{}", render_report(&path.display().to_string(), &info));
            }
            Ok(ExitCode::SUCCESS)
        }
        (None, None) => {
            Cli::command().print_help()?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn load_map(path: &Path) -> Result<MapInfo> {
    info!("reading map file {}", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read map file {}", path.display()))?;
    Ok(parse_map(&text))
}
