//! Core application

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::core::cli::{self, Commands, FilterArgs};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::SqliteService;
use crate::data::filters::{SqlParams, compile_for, compile_lenient, parse_filters};
use crate::data::sql::Backend;
use crate::data::sqlite::repositories::{count_records, get_records, search_records, upsert_records};
use crate::data::types::{AuditLogQuery, Record, RecordKind, records_to_json};
use crate::domain::audit::{
    ArrayAlignment, AuditEntry, AuditService, ChangeNotifier, DiffOptions, diff_with,
};
use crate::domain::workflow::{WorkflowRequest, run_workflow};

pub struct CoreApp {
    pub config: AppConfig,
    pub database: SqliteService,
    pub audit: AuditService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;

        match command {
            Commands::Compile { filter, dialect } => {
                Self::compile_filter(&config, &filter, dialect)
            }
            Commands::Diff {
                old,
                new,
                by_identity,
            } => Self::diff_files(&config, &old, &new, by_identity),
            command => {
                let app = Self::init(config).await?;
                let result = app.execute(command).await;
                app.database.close().await;
                result
            }
        }
    }

    async fn init(config: AppConfig) -> Result<Self> {
        let database = SqliteService::init(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database: {}",
                    config.database.path.display()
                )
            })?;

        let mut audit = AuditService::new(database.pool().clone(), diff_options(&config, false));
        if config.audit.notify {
            audit = audit.with_notifier(ChangeNotifier::new(config.audit.notify_capacity));
        } else {
            tracing::debug!("Change notifications disabled by config");
        }

        Ok(Self {
            config,
            database,
            audit,
        })
    }

    async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Search {
                filter,
                limit,
                offset,
                count,
            } => self.search(&filter, limit, offset, count).await,
            Commands::Import { file, kind } => self.import(&file, kind).await,
            Commands::Update {
                workflow,
                value,
                coachnos,
                description,
            } => {
                let outcome = run_workflow(
                    self.database.pool(),
                    &self.audit,
                    WorkflowRequest {
                        workflow,
                        coachnos,
                        value,
                        actor: self.config.audit.actor.clone(),
                        description,
                    },
                )
                .await?;
                print_json(&json!({
                    "workflow": workflow.as_str(),
                    "field": workflow.field(),
                    "updated": outcome.updated,
                    "missing": outcome.missing,
                    "audit_id": outcome.audit.id,
                }))
            }
            Commands::Audit {
                limit,
                offset,
                entity,
                by,
            } => {
                let rows = self
                    .audit
                    .list(&AuditLogQuery {
                        limit,
                        offset,
                        entity_name: entity,
                        actor: by,
                    })
                    .await?;
                print_json(&rows)
            }
            Commands::Compile { .. } | Commands::Diff { .. } => {
                anyhow::bail!("Command does not use the database")
            }
        }
    }

    /// Malformed filters are logged and ignored, so the search runs unfiltered
    async fn search(&self, args: &FilterArgs, limit: u32, offset: u32, count: bool) -> Result<()> {
        let compiled = compile_lenient(&read_filter(args)?, args.kind, &self.config.filters);
        let pool = self.database.pool();

        if count {
            let total = count_records(pool, args.kind, &compiled.predicate).await?;
            return print_json(&json!({ "kind": args.kind, "count": total }));
        }

        let records = search_records(pool, args.kind, &compiled.predicate, limit, offset).await?;
        print_json(&records_to_json(&records))
    }

    async fn import(&self, file: &Path, kind: RecordKind) -> Result<()> {
        let value = read_json_file(file)?;
        let items = value
            .as_array()
            .with_context(|| format!("Expected a JSON array of records: {}", file.display()))?;
        let records = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Record::from_json(kind, item)
                    .with_context(|| format!("Invalid record at index {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut coachnos: Vec<String> = records.iter().filter_map(Record::identity).collect();
        coachnos.sort();
        coachnos.dedup();

        // Inserted coaches shift positions, so pair snapshot entries by coach number
        let entry = AuditEntry::new(self.config.audit.actor.clone(), "import", kind.table())
            .with_description(format!("{} records from {}", records.len(), file.display()))
            .with_alignment(ArrayAlignment::ByIdentity);

        let mut tx = self.database.pool().begin().await?;
        let before = get_records(&mut tx, kind, &coachnos).await?;
        let written = upsert_records(&mut tx, &records).await?;
        let after = get_records(&mut tx, kind, &coachnos).await?;
        let old = records_to_json(&before);
        let new = records_to_json(&after);
        let row = self.audit.record_on(&mut tx, entry, &old, &new).await?;
        tx.commit().await?;

        self.audit.publish(&row, &old, &new);
        self.database.checkpoint().await?;

        tracing::info!(%kind, written, audit_id = row.id, "Import complete");
        print_json(&json!({ "kind": kind, "written": written, "audit_id": row.id }))
    }

    fn compile_filter(config: &AppConfig, args: &FilterArgs, dialect: Backend) -> Result<()> {
        let conditions = parse_filters(&read_filter(args)?, args.kind, &config.filters)?;
        let compiled = compile_for(args.kind, &conditions);

        let mut params = SqlParams::default();
        let sql = compiled.predicate.to_sql(dialect.dialect(), &mut params);

        print_json(&json!({
            "kind": args.kind,
            "dialect": dialect.name(),
            "predicate": compiled.predicate.to_string(),
            "connectives": compiled.connectives,
            "group": compiled.group_operator(),
            "sql": sql,
            "params": params.values,
        }))
    }

    fn diff_files(config: &AppConfig, old: &Path, new: &Path, by_identity: bool) -> Result<()> {
        let old_value = read_json_file(old)?;
        let new_value = read_json_file(new)?;
        let change = diff_with(&old_value, &new_value, &diff_options(config, by_identity));
        print_json(&change)
    }

    fn init_logging(debug: bool) {
        let level = if debug { "debug" } else { "info" };
        let default_filter = format!("{},{}={}", level, APP_NAME_LOWER, level);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

fn diff_options(config: &AppConfig, by_identity: bool) -> DiffOptions {
    DiffOptions {
        identity_field: config.audit.identity_field.clone(),
        alignment: if by_identity {
            ArrayAlignment::ByIdentity
        } else {
            ArrayAlignment::Positional
        },
    }
}

fn read_filter(args: &FilterArgs) -> Result<String> {
    match (&args.filter, &args.filter_file) {
        (Some(inline), _) => Ok(inline.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file: {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn read_json_file(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
