//! Command-line surface for serving and maintaining the dataset.
//!
//! # Responsibility
//! - Parse subcommands and hand them to the core services.
//! - Print machine-readable (JSON) results on stdout.
//!
//! # Invariants
//! - Destructive commands need an explicit flag.
//! - Batch commands report progress through the log, never stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use quizgraph_api::AppState;
use quizgraph_core::db::open_db;
use quizgraph_core::{
    AppConfig, CascadeReport, CascadingMutator, Collection, DuplicatePolicy, IntegrityValidator,
    LogProgress, ObjectId, QueryFacade, SqliteRecordStore,
};
use rusqlite::Connection;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(
    name = "quizgraph",
    version,
    about = "Serve and maintain the quiz / question / answer dataset."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API.
    Serve,
    /// Report records whose references do not resolve.
    Validate {
        /// Only check one collection.
        #[arg(long)]
        collection: Option<Collection>,
    },
    /// List values shared by more than one record, optionally removing them.
    Duplicates(DuplicatesArgs),
    /// Remove quizzes together with their questions and answers.
    RemoveQuizzes {
        #[arg(required = true)]
        ids: Vec<ObjectId>,
    },
    /// Delete every answer, question and quiz.
    Reset {
        /// Confirm the wipe.
        #[arg(long)]
        yes: bool,
    },
    /// List quiz addresses.
    Addresses {
        /// Only quizzes whose ingestion finished.
        #[arg(long, conflicts_with = "unparsed")]
        parsed: bool,
        /// Only quizzes still waiting for ingestion.
        #[arg(long)]
        unparsed: bool,
    },
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct DuplicatesArgs {
    pub collection: Collection,
    pub attribute: String,
    /// Remove the duplicated records through the cascade.
    #[arg(long)]
    pub remove: bool,
    /// Keep the first record of every duplicated value.
    #[arg(long, requires = "remove")]
    pub keep_one: bool,
}

impl DuplicatesArgs {
    fn policy(&self) -> DuplicatePolicy {
        if self.keep_one {
            DuplicatePolicy::RemoveAllButOne
        } else {
            DuplicatePolicy::RemoveAllMatching
        }
    }
}

impl Cli {
    /// Dispatches the parsed subcommand.
    pub fn run(self, config: &AppConfig) -> Result<()> {
        match self.command {
            Command::Serve => serve(config),
            Command::Validate { collection } => with_store(config, |store| {
                let validator = IntegrityValidator::new(store);
                let mut progress = LogProgress::new();
                let output = match collection {
                    Some(collection) => json!(validator.validate(collection, &mut progress)?),
                    None => json!(validator.validate_all(&mut progress)?),
                };
                print_json(&output)
            }),
            Command::Duplicates(args) => with_store(config, |store| {
                let mutator = CascadingMutator::new(store);
                if !args.remove {
                    let values = mutator.find_duplicates(args.collection, &args.attribute)?;
                    return print_json(&json!(values));
                }
                let report = mutator.remove_all_duplicates(
                    args.collection,
                    &args.attribute,
                    args.policy(),
                    &mut LogProgress::new(),
                )?;
                print_json(&report_json(&report))
            }),
            Command::RemoveQuizzes { ids } => with_store(config, |store| {
                let report =
                    CascadingMutator::new(store).remove_quizzes(&ids, &mut LogProgress::new())?;
                print_json(&report_json(&report))
            }),
            Command::Reset { yes } => {
                if !yes {
                    bail!("reset deletes every record; pass --yes to confirm");
                }
                with_store(config, |store| {
                    let report = CascadingMutator::new(store).remove_all(&mut LogProgress::new())?;
                    print_json(&report_json(&report))
                })
            }
            Command::Addresses { parsed, unparsed } => with_store(config, |store| {
                let facade = QueryFacade::new(store);
                let addresses = if parsed {
                    facade.parsed_addresses()?
                } else if unparsed {
                    facade.unparsed_addresses()?
                } else {
                    facade.addresses()?
                };
                print_json(&json!(addresses))
            }),
        }
    }
}

fn serve(config: &AppConfig) -> Result<()> {
    let conn = open_connection(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime
        .block_on(quizgraph_api::serve(AppState::new(conn), config.bind_addr))
        .with_context(|| format!("HTTP server on {} failed", config.bind_addr))
}

fn with_store<T>(
    config: &AppConfig,
    op: impl FnOnce(&SqliteRecordStore<'_>) -> Result<T>,
) -> Result<T> {
    let conn = open_connection(config)?;
    let store = SqliteRecordStore::try_new(&conn)?;
    op(&store)
}

fn open_connection(config: &AppConfig) -> Result<Connection> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    info!(
        "event=db_open module=cli status=ok path={}",
        config.db_path.display()
    );
    Ok(conn)
}

fn report_json(report: &CascadeReport) -> serde_json::Value {
    json!({
        "quizzes": report.quizzes,
        "questions": report.questions,
        "answers": report.answers,
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, DuplicatesArgs};
    use clap::{CommandFactory, Parser};
    use quizgraph_core::{Collection, DuplicatePolicy};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_duplicates_with_policy() {
        let cli = Cli::try_parse_from([
            "quizgraph",
            "duplicates",
            "quizzes",
            "address",
            "--remove",
            "--keep-one",
        ])
        .unwrap();
        let Command::Duplicates(args) = cli.command else {
            panic!("expected duplicates command");
        };
        assert_eq!(
            args,
            DuplicatesArgs {
                collection: Collection::Quizzes,
                attribute: "address".to_string(),
                remove: true,
                keep_one: true,
            }
        );
        assert_eq!(args.policy(), DuplicatePolicy::RemoveAllButOne);
    }

    #[test]
    fn keep_one_requires_remove() {
        assert!(Cli::try_parse_from(["quizgraph", "duplicates", "quizzes", "address", "--keep-one"])
            .is_err());
    }

    #[test]
    fn remove_quizzes_parses_ids_and_rejects_garbage() {
        let cli = Cli::try_parse_from([
            "quizgraph",
            "remove-quizzes",
            "00000000000000000000000a",
            "00000000000000000000000b",
        ])
        .unwrap();
        let Command::RemoveQuizzes { ids } = cli.command else {
            panic!("expected remove-quizzes command");
        };
        assert_eq!(ids.len(), 2);

        assert!(Cli::try_parse_from(["quizgraph", "remove-quizzes", "nope"]).is_err());
        assert!(Cli::try_parse_from(["quizgraph", "remove-quizzes"]).is_err());
    }

    #[test]
    fn validate_accepts_singular_collection_names() {
        let cli = Cli::try_parse_from(["quizgraph", "validate", "--collection", "answer"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Validate {
                collection: Some(Collection::Answers)
            }
        );
    }
}
