// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Warden - access-control decisions from declarative rules.
#[derive(Parser, Debug)]
#[command(name = "warden", about = "Validate rule files and check access decisions", version)]
struct Args {
	/// Config file (defaults to /etc/warden/warden.toml)
	#[arg(long, global = true, env = "WARDEN_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Load a rule file and report how many rules it contains
	Validate {
		/// Rule file (.toml or .json); falls back to policy.rules_path
		#[arg(long)]
		rules: Option<PathBuf>,
	},

	/// Evaluate one request and print the decision as JSON
	Check(commands::CheckArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	match run(args).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::from(2)
		}
	}
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
	let config = match &args.config {
		Some(path) => warden_config::load_config_with_file(path)?,
		None => warden_config::load_config()?,
	};

	// stdout carries command output; logs go to stderr.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	match args.command {
		Command::Validate { rules } => {
			let path = commands::rules_path(rules, &config)?;
			let count = commands::validate(&path)?;
			println!("{}: {count} rules", path.display());
			Ok(ExitCode::SUCCESS)
		}
		Command::Check(check) => {
			let result = commands::check(check, &config).await?;
			println!("{}", serde_json::to_string_pretty(&result)?);
			Ok(if result.can {
				ExitCode::SUCCESS
			} else {
				ExitCode::from(1)
			})
		}
	}
}
