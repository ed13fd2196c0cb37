//! CLI command definitions for the `mockloop` binary.
//!
//! Uses clap derive macros for argument parsing. Each subcommand maps to one
//! engine operation, so a whole interview can be driven from a shell.

pub mod interview;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run automated mock interviews against an LLM interviewer.
#[derive(Parser)]
#[command(name = "mockloop", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interview and print the first question.
    Start {
        /// Candidate user id.
        #[arg(long)]
        user: i64,

        /// Position being interviewed for.
        #[arg(long)]
        position: String,

        /// Display name of the interview.
        #[arg(long)]
        name: String,

        /// Resume text.
        #[arg(long, conflicts_with = "resume_file", required_unless_present = "resume_file")]
        resume: Option<String>,

        /// Read the resume from a file.
        #[arg(long)]
        resume_file: Option<PathBuf>,

        /// Generation backend; defaults to `default_provider` from config.toml.
        #[arg(long)]
        provider: Option<String>,
    },

    /// Answer the open question and get the next one.
    ///
    /// Without an answer, asks the next question (or the first question of an
    /// interview whose start failed).
    Answer {
        /// Interview id.
        id: i64,

        /// Answer text.
        text: Option<String>,

        /// Interview question id being answered; defaults to the latest.
        #[arg(long)]
        question: Option<i64>,
    },

    /// Score the interview and end it.
    End {
        /// Interview id.
        id: i64,
    },

    /// List a user's interviews.
    #[command(alias = "ls")]
    List {
        /// Candidate user id.
        #[arg(long)]
        user: i64,
    },

    /// Show an interview summary.
    Show {
        /// Interview id.
        id: i64,
    },

    /// Show the question/answer transcript of an interview.
    Questions {
        /// Interview id.
        id: i64,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
