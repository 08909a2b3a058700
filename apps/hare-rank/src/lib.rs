pub mod local;
pub mod remote;

use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre;
use serde::Serialize;

use hare_domain::conditions::ConditionScope;

#[derive(Debug, Parser)]
#[command(
	version = hare_cli::VERSION,
	rename_all = "kebab",
	styles = hare_cli::styles(),
)]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Rank local documents against a query with BM25+.
	Search(SearchArgs),
	/// Extract weighted keywords from a text.
	Keywords(KeywordsArgs),
	/// Check a condition set written as JSON.
	Validate(ValidateArgs),
	/// Retrieve chunks from the vector store.
	Query(QueryArgs),
	/// Embed and store chunks from a JSON array of inputs.
	Ingest(IngestArgs),
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
	pub query: String,
	/// Documents to rank; each file is one document titled by its file stem.
	#[arg(long, short = 'f', value_name = "FILE", num_args = 1..)]
	pub file: Vec<PathBuf>,
	/// Inline documents to rank.
	#[arg(long, short = 't', value_name = "TEXT", num_args = 1..)]
	pub text: Vec<String>,
	#[arg(long, value_name = "N", default_value_t = 5)]
	pub top_k: usize,
	/// Reads BM25 parameters from `[lexical]`.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct KeywordsArgs {
	/// Text to extract from; read from `--file` when omitted.
	pub text: Option<String>,
	#[arg(long, short = 'f', value_name = "FILE", conflicts_with = "text")]
	pub file: Option<PathBuf>,
	#[arg(long, value_enum, default_value_t = ExtractMode::Text)]
	pub mode: ExtractMode,
	#[arg(long, value_name = "LEVEL", default_value = "balanced")]
	pub level: String,
	/// Explicit lorebook keys, only used with `--mode lorebook`.
	#[arg(long = "key", value_name = "KEY")]
	pub keys: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExtractMode {
	Text,
	Chat,
	Lorebook,
	Tfidf,
}

#[derive(Debug, clap::Args)]
pub struct ValidateArgs {
	#[arg(value_name = "FILE", required_unless_present = "kinds")]
	pub file: Option<PathBuf>,
	#[arg(long, value_enum, default_value_t = Scope::Chunk)]
	pub scope: Scope,
	/// Print the accepted rule types and exit.
	#[arg(long)]
	pub kinds: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scope {
	Collection,
	Chunk,
}
impl From<Scope> for ConditionScope {
	fn from(scope: Scope) -> Self {
		match scope {
			Scope::Collection => Self::Collection,
			Scope::Chunk => Self::Chunk,
		}
	}
}

#[derive(Debug, clap::Args)]
pub struct QueryArgs {
	pub query: String,
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long = "collection", value_name = "ID", required = true)]
	pub collections: Vec<String>,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
	/// Conversation state as JSON.
	#[arg(long, value_name = "FILE")]
	pub context: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct IngestArgs {
	#[arg(value_name = "FILE")]
	pub input: PathBuf,
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, value_name = "ID")]
	pub collection: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	match args.command {
		Command::Search(args) => {
			hare_cli::init_tracing(hare_cli::DEFAULT_LOG_FILTER);

			print_json(&local::search(&args)?)
		},
		Command::Keywords(args) => {
			hare_cli::init_tracing(hare_cli::DEFAULT_LOG_FILTER);

			print_json(&local::keywords(&args)?)
		},
		Command::Validate(args) => {
			if args.kinds {
				return print_json(&hare_domain::conditions::rule_kinds().collect::<Vec<_>>());
			}

			let report = local::validate(&args)?;

			print_json(&report)?;

			if !report.valid {
				eyre::bail!("Condition set has {} problem(s).", report.errors.len());
			}

			Ok(())
		},
		Command::Query(args) => print_json(&remote::query(args).await?),
		Command::Ingest(args) => print_json(&remote::ingest(args).await?),
	}
}

pub(crate) fn read_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let raw = fs::read_to_string(path)?;

	serde_json::from_str(&raw)
		.map_err(|err| eyre::eyre!("Failed to parse {}: {err}", path.display()))
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize + ?Sized,
{
	let json = serde_json::to_string_pretty(value)?;

	println!("{json}");

	Ok(())
}
