use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use seed_admission::{
	admission::{
		review::{self, AdmissionReview},
		routes, Coordinator, Phase,
	},
	catalog::CatalogClient,
	config::EngineConfig,
	dependency::{extract_dependencies, KubeLookup},
};
use std::{
	fs,
	io::{self, Read},
	path::{Path, PathBuf},
	sync::Arc,
};

#[derive(Parser)]
#[clap(version, author = "Lach")]
struct Opts {
	#[clap(flatten)]
	engine: EngineConfig,
	#[clap(subcommand)]
	sub: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
	/// Evaluate AdmissionReview and print response review
	Review {
		#[clap(long, value_enum)]
		phase: Phase,
		/// Read review from file instead of stdin
		#[clap(long)]
		file: Option<PathBuf>,
	},
	/// Print secrets and config maps referenced by workload
	Dependencies {
		#[clap(long)]
		kind: String,
		#[clap(long)]
		file: Option<PathBuf>,
	},
	/// Print object as flat lower-cased dotted keys
	Flatten {
		#[clap(long)]
		file: Option<PathBuf>,
	},
	/// Ask catalog whether service plan may be changed
	Plan { service: String },
	/// Print webhook registrations
	Routes,
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
	match file {
		Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display())),
		None => {
			let mut buf = Vec::new();
			io::stdin().read_to_end(&mut buf).context("failed to read stdin")?;
			Ok(buf)
		}
	}
}

fn catalog(config: &EngineConfig) -> Result<CatalogClient> {
	Ok(CatalogClient::new(
		&config.catalog_url,
		config.catalog_timeout(),
		config.catalog_insecure_tls,
	)?)
}

async fn coordinator(config: EngineConfig) -> Result<Coordinator> {
	let mut coordinator = Coordinator::new(config.clone()).with_catalog(Arc::new(catalog(&config)?));
	if config.dependency_check {
		let client = kube::Client::try_default()
			.await
			.context("dependency check needs cluster access")?;
		coordinator = coordinator.with_lookup(Arc::new(KubeLookup::new(client)));
	}
	Ok(coordinator)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let opts: Opts = Opts::parse();

	match opts.sub {
		SubCommand::Review { phase, file } => {
			let request = AdmissionReview::from_slice(&read_input(file.as_deref())?)?;
			let response = if opts.engine.is_enabled() {
				let coordinator = coordinator(opts.engine).await?;
				review::handle(&coordinator, &routes(), phase, request).await?
			} else {
				info!(target: "admission", "admission control is disabled");
				review::allow_all(&request)?
			};
			print_json(&response)?;
		}
		SubCommand::Dependencies { kind, file } => {
			let dependencies = extract_dependencies(&kind, &read_input(file.as_deref())?);
			print_json(&dependencies)?;
		}
		SubCommand::Flatten { file } => {
			let value: serde_json::Value =
				serde_json::from_slice(&read_input(file.as_deref())?).context("input is not json")?;
			print_json(&fieldpath::flatten(&value, fieldpath::DEFAULT_MAX_DEPTH)?)?;
		}
		SubCommand::Plan { service } => {
			let client = catalog(&opts.engine)?;
			match client.check_plan(&service).await {
				Ok(updateable) => println!("{}", updateable),
				Err(e) => {
					warn!(target: "catalog", "{}", e);
					println!("false");
				}
			}
		}
		SubCommand::Routes => print_json(&routes())?,
	}
	Ok(())
}
