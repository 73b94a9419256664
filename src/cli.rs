use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::commands::discover::DiscoverArgs;
use crate::commands::execute::ExecuteArgs;
use crate::reconcile::discover::ListSelection;
use crate::reconcile::filter::FilterSpec;

#[derive(Parser)]
#[command(name = "listops")]
#[command(version, about = "Bulk mailing-list lifecycle reconciliation for hosted-forge projects")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the project-metadata API answers
    Ping,

    /// Walk the project catalog, classify every list, write a command file
    Discover {
        /// First catalog page to read
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Stop after this many pages
        #[arg(long)]
        length: Option<u32>,

        /// Projects per catalog page
        #[arg(long)]
        page_size: Option<u32>,

        /// Keep only lists the list service does not know about
        #[arg(long, conflicts_with = "only_empty")]
        only_missing: bool,

        /// Keep only lists with zero messages
        #[arg(long)]
        only_empty: bool,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Re-emit a command file keeping only matching projects and lists
    Filter {
        /// Command file to read
        #[arg(long)]
        input: PathBuf,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(subcommand)]
        predicate: Predicate,
    },

    /// Execute the command a file carries against both backends
    Execute {
        /// Command file to execute
        file: PathBuf,

        /// Delete lists without checking that their archives are empty
        #[arg(long)]
        force: bool,

        /// Report what would happen without mutating either backend
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum Predicate {
    /// Keep lists created before DATE (YYYY-MM-DD)
    AgeBefore { date: NaiveDate },

    /// Keep lists whose feature was last updated before DATE (YYYY-MM-DD)
    ArchiveStaleBefore { date: NaiveDate },

    /// Keep lists missing from the list service
    Missing,

    /// Keep lists not named NAME
    NameNot { name: String },

    /// Keep projects with an issue tracker but no "issues" list yet
    IssuesCorrelation,
}

impl From<Predicate> for FilterSpec {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::AgeBefore { date } => FilterSpec::AgeBefore(date),
            Predicate::ArchiveStaleBefore { date } => FilterSpec::ArchiveStaleBefore(date),
            Predicate::Missing => FilterSpec::MissingFromMlm,
            Predicate::NameNot { name } => FilterSpec::NameNot(name),
            Predicate::IssuesCorrelation => FilterSpec::IssuesCorrelation,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Commands::Ping => commands::ping::run()?,
        Commands::Discover {
            start,
            length,
            page_size,
            only_missing,
            only_empty,
            out,
        } => {
            let keep = if only_missing {
                ListSelection::MissingOnly
            } else if only_empty {
                ListSelection::EmptyOnly
            } else {
                ListSelection::All
            };
            commands::discover::run(&DiscoverArgs {
                start,
                length,
                page_size,
                keep,
                out,
            })?
        }
        Commands::Filter {
            input,
            out,
            predicate,
        } => commands::filter::run(&predicate.into(), &input, out.as_deref())?,
        Commands::Execute {
            file,
            force,
            dry_run,
        } => commands::execute::run(&ExecuteArgs {
            file,
            force,
            dry_run,
        })?,
    };

    report.print();
    Ok(())
}
