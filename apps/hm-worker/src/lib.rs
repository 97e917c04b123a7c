use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use hm_domain::record::DecisionAction;
use hm_service::{Actor, DecisionRequest, MatchService};
use hm_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = hm_cli::VERSION,
	rename_all = "kebab",
	styles = hm_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Match the manager's active job against the candidate pool.
	Manager {
		#[arg(long)]
		id: i64,
	},
	/// Match one candidate against every active job.
	Candidate {
		#[arg(long)]
		id: i64,
	},
	/// Re-embed recently updated candidates into the relational store and the index.
	SyncIndex {
		#[arg(long)]
		limit: Option<u32>,
	},
	RemoveCandidate {
		#[arg(long)]
		id: i64,
	},
	/// Record a decision on a match, e.g. `--action apply --actor candidate:42`.
	Decide {
		#[arg(long)]
		record: Uuid,
		#[arg(long, value_parser = parse_action)]
		action: DecisionAction,
		#[arg(long, value_parser = parse_actor)]
		actor: Actor,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = hm_config::load(&args.config)?;

	init_tracing(&config);

	tracing::info!(command = ?args.command, "Worker starting.");

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.storage.qdrant.vector_dim).await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let sync_limit = config.shortlist.sync_limit;
	let service = MatchService::new(config, db, qdrant);

	match args.command {
		Command::Manager { id } => print_json(&service.run_manager(id).await?),
		Command::Candidate { id } => print_json(&service.run_candidate(id).await?),
		Command::SyncIndex { limit } =>
			print_json(&service.sync_index(limit.unwrap_or(sync_limit)).await?),
		Command::RemoveCandidate { id } => {
			service.remove_candidate_from_index(id).await?;

			Ok(())
		},
		Command::Decide { record, action, actor } => {
			let updated =
				service.record_decision(DecisionRequest { record_id: record, action, actor }).await?;

			print_json(&updated)
		},
	}
}

fn init_tracing(config: &hm_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

fn parse_action(raw: &str) -> Result<DecisionAction, String> {
	DecisionAction::parse(raw).ok_or_else(|| {
		format!(
			"Unknown action {raw}. Expected apply, reject_by_candidate, reject_by_manager, accept or expire."
		)
	})
}

/// `candidate:<id>`, `manager:<id>` or `system`.
fn parse_actor(raw: &str) -> Result<Actor, String> {
	if raw == "system" {
		return Ok(Actor::System);
	}

	let (role, id) = raw.split_once(':').ok_or_else(|| format!("Malformed actor {raw}."))?;
	let id: i64 = id.parse().map_err(|_| format!("Actor id {id} is not an integer."))?;

	match role {
		"candidate" => Ok(Actor::Candidate(id)),
		"manager" => Ok(Actor::Manager(id)),
		_ => Err(format!("Unknown actor role {role}.")),
	}
}
