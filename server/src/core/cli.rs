use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use crate::data::sql::Backend;
use crate::data::types::RecordKind;
use crate::domain::workflow::Workflow;

use super::constants::{
    DEFAULT_AUDIT_PAGE_SIZE, DEFAULT_SEARCH_PAGE_SIZE, ENV_ACTOR, ENV_AUDIT_IDENTITY_FIELD,
    ENV_AUDIT_NOTIFY, ENV_AUDIT_NOTIFY_CAPACITY, ENV_CONFIG, ENV_DATABASE_PATH, ENV_DEBUG,
    ENV_FILTER_MAX_CONDITIONS, ENV_FILTER_MAX_JSON_BYTES,
};

#[derive(Parser)]
#[command(name = "coachyard")]
#[command(version, long_about = None)]
#[command(about = "Coach maintenance records: filters, workflows and audit trail")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = ENV_DATABASE_PATH)]
    pub database_path: Option<PathBuf>,

    /// Maximum size of a serialized filter in bytes
    #[arg(long, global = true, env = ENV_FILTER_MAX_JSON_BYTES)]
    pub filter_max_json_bytes: Option<usize>,

    /// Maximum number of conditions in a filter
    #[arg(long, global = true, env = ENV_FILTER_MAX_CONDITIONS)]
    pub filter_max_conditions: Option<usize>,

    /// Natural identifier used to tag changed array entries
    #[arg(long, global = true, env = ENV_AUDIT_IDENTITY_FIELD)]
    pub audit_identity_field: Option<String>,

    /// Enable or disable change notifications
    #[arg(long, global = true, env = ENV_AUDIT_NOTIFY)]
    pub audit_notify: Option<bool>,

    /// Change notification buffer per subscriber
    #[arg(long, global = true, env = ENV_AUDIT_NOTIFY_CAPACITY)]
    pub audit_notify_capacity: Option<usize>,

    /// Actor recorded in audit entries
    #[arg(long, global = true, env = ENV_ACTOR)]
    pub actor: Option<String>,
}

/// Serialized filter, inline or from a file
#[derive(Args, Clone, Debug)]
pub struct FilterArgs {
    /// Filter conditions as a JSON array
    #[arg(long, short = 'f', conflicts_with = "filter_file")]
    pub filter: Option<String>,

    /// Read filter conditions from a JSON file
    #[arg(long)]
    pub filter_file: Option<PathBuf>,

    /// Record kind the filter applies to (master or history)
    #[arg(long, short = 'k', default_value = "master")]
    pub kind: RecordKind,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile a filter and print its predicate and SQL
    Compile {
        #[command(flatten)]
        filter: FilterArgs,

        /// SQL dialect to render (sqlite or postgres)
        #[arg(long, default_value = "sqlite")]
        dialect: Backend,
    },
    /// Search coach records with a filter
    Search {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value_t = DEFAULT_SEARCH_PAGE_SIZE)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Print only the number of matching records
        #[arg(long)]
        count: bool,
    },
    /// Import coach records from a JSON array file
    Import {
        file: PathBuf,

        #[arg(long, short = 'k', default_value = "master")]
        kind: RecordKind,
    },
    /// Run a workflow on selected coaches
    Update {
        workflow: Workflow,

        /// Value to set (a date or a status)
        value: String,

        /// Coach numbers to update
        #[arg(required = true, num_args = 1..)]
        coachnos: Vec<String>,

        /// Free-text note stored with the audit entry
        #[arg(long)]
        description: Option<String>,
    },
    /// Diff two JSON snapshot files
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Pair array entries by identifier instead of position
        #[arg(long)]
        by_identity: bool,
    },
    /// List audit log entries, newest first
    Audit {
        #[arg(long, default_value_t = DEFAULT_AUDIT_PAGE_SIZE)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Only entries for this entity (table name)
        #[arg(long)]
        entity: Option<String>,

        /// Only entries by this actor
        #[arg(long)]
        by: Option<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub filter_max_json_bytes: Option<usize>,
    pub filter_max_conditions: Option<usize>,
    pub audit_identity_field: Option<String>,
    pub audit_notify: Option<bool>,
    pub audit_notify_capacity: Option<usize>,
    pub actor: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        debug: cli.debug,
        config: cli.config,
        database_path: cli.database_path,
        filter_max_json_bytes: cli.filter_max_json_bytes,
        filter_max_conditions: cli.filter_max_conditions,
        audit_identity_field: cli.audit_identity_field,
        audit_notify: cli.audit_notify,
        audit_notify_capacity: cli.audit_notify_capacity,
        actor: cli.actor,
    };
    (config, cli.command)
}
