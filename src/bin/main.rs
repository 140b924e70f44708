//! mediaql CLI - Compile and run media library queries
//!
//! Usage:
//!   mediaql explain --schema <schema.toml> --query <query.json>
//!   mediaql search --schema <schema.toml> --query <query.json> [--db <file>]
//!   mediaql values --schema <schema.toml> --attribute <aspect.attr> [--grouped]
//!
//! Examples:
//!   mediaql explain --schema media.toml --query recent.json --dialect tsql
//!   mediaql search --schema media.toml --query recent.json --db library.db
//!   mediaql values --schema media.toml --attribute video.Title --group-by first-character

use clap::{Parser, Subcommand, ValueEnum};
use mediaql::compiler::CompilerOptions;
use mediaql::config::Settings;
use mediaql::model::{AttributePath, Filter, MediaItemQuery};
use mediaql::query::{
    CompiledDistinctValueQuery, CompiledGroupedValueQuery, CompiledItemQuery, ExplainedStatement,
    GroupingFunction,
};
use mediaql::schema::{AspectId, SchemaSnapshot};
use mediaql::sql::Dialect;
use mediaql::store::SqliteStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediaql")]
#[command(about = "mediaql - Compile media library queries to SQL")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to MEDIAQL_CONFIG, ./mediaql.toml, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect, overriding the settings
    #[arg(short, long, global = true)]
    dialect: Option<DialectArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements of an item query without running them
    Explain {
        /// Schema definition (TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Item query (JSON)
        #[arg(short, long)]
        query: PathBuf,
    },

    /// Run an item query and print the items as JSON
    Search {
        /// Schema definition (TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Item query (JSON)
        #[arg(short, long)]
        query: PathBuf,

        /// SQLite database (defaults to [store] database)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List distinct values or value groups of one attribute
    Values {
        /// Schema definition (TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Attribute as <aspect>.<attribute>
        #[arg(short, long)]
        attribute: String,

        /// Aspects items must have
        #[arg(short, long, value_delimiter = ',')]
        necessary: Vec<String>,

        /// Filter tree (JSON)
        #[arg(short, long)]
        filter: Option<PathBuf>,

        /// Count items per value
        #[arg(short, long)]
        grouped: bool,

        /// Fold value groups (implies --grouped)
        #[arg(long)]
        group_by: Option<GroupByArg>,

        /// Print the statement instead of running it
        #[arg(long)]
        explain: bool,

        /// SQLite database (defaults to [store] database)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Sqlite,
    Postgres,
    Tsql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Tsql => Dialect::TSql,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum GroupByArg {
    FirstCharacter,
}

impl From<GroupByArg> for GroupingFunction {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::FirstCharacter => GroupingFunction::FirstCharacter,
        }
    }
}

/// Settings and compiler options shared by every command.
struct Context {
    settings: Settings,
    options: CompilerOptions,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    mediaql::logging::init(&settings.logging.level);

    let mut options = settings.compiler_options();
    if let Some(dialect) = cli.dialect {
        options.dialect = dialect.into();
    }
    let ctx = Context { settings, options };

    match cli.command {
        Commands::Explain { schema, query } => cmd_explain(&ctx, &schema, &query),
        Commands::Search { schema, query, db } => cmd_search(&ctx, &schema, &query, db),
        Commands::Values {
            schema,
            attribute,
            necessary,
            filter,
            grouped,
            group_by,
            explain,
            db,
        } => cmd_values(
            &ctx,
            &schema,
            &attribute,
            &necessary,
            filter.as_deref(),
            grouped,
            group_by.map(GroupingFunction::from),
            explain,
            db,
        ),
    }
}

fn cmd_explain(ctx: &Context, schema: &Path, query: &Path) -> ExitCode {
    let compiled = match compile_item_query(ctx, schema, query) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match compiled.explain() {
        Ok(statements) => {
            print_statements(&statements);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_search(ctx: &Context, schema: &Path, query: &Path, db: Option<PathBuf>) -> ExitCode {
    let compiled = match compile_item_query(ctx, schema, query) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut store = match open_store(ctx, db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match compiled.execute(&mut store) {
        Ok(items) => print_json(&items),
        Err(e) => {
            eprintln!("Query error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_values(
    ctx: &Context,
    schema: &Path,
    attribute: &str,
    necessary: &[String],
    filter: Option<&Path>,
    grouped: bool,
    group_by: Option<GroupingFunction>,
    explain: bool,
    db: Option<PathBuf>,
) -> ExitCode {
    let Some(path) = AttributePath::parse(attribute) else {
        eprintln!("Invalid attribute '{}': expected <aspect>.<attribute>", attribute);
        return ExitCode::FAILURE;
    };
    let snapshot = match load_schema(ctx, schema) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let filter: Option<Filter> = match filter.map(read_json).transpose() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let necessary: Vec<AspectId> = necessary.iter().map(|s| AspectId::from(s.as_str())).collect();

    if grouped || group_by.is_some() {
        let compiled = match CompiledGroupedValueQuery::compile(
            snapshot,
            &path,
            &necessary,
            filter.as_ref(),
            &ctx.options,
        ) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Compilation error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if explain {
            return match compiled.explain() {
                Ok(statements) => {
                    print_statements(&statements);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Compilation error: {}", e);
                    ExitCode::FAILURE
                }
            };
        }

        let mut store = match open_store(ctx, db) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        let groups = match compiled.execute(&mut store) {
            Ok(g) => g,
            Err(e) => {
                eprintln!("Query error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        match group_by {
            Some(grouping) => print_json(&grouping.apply(&path, &groups)),
            None => print_json(&groups),
        }
    } else {
        let compiled = match CompiledDistinctValueQuery::compile(
            snapshot,
            &path,
            &necessary,
            filter.as_ref(),
            &ctx.options,
        ) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Compilation error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if explain {
            return match compiled.explain() {
                Ok(statements) => {
                    print_statements(&statements);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Compilation error: {}", e);
                    ExitCode::FAILURE
                }
            };
        }

        let mut store = match open_store(ctx, db) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        match compiled.execute(&mut store) {
            Ok(values) => print_json(&values),
            Err(e) => {
                eprintln!("Query error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn load_schema(ctx: &Context, path: &Path) -> Result<Arc<SchemaSnapshot>, String> {
    SchemaSnapshot::from_file(path, ctx.settings.naming.clone())
        .map(Arc::new)
        .map_err(|e| format!("Error loading schema '{}': {}", path.display(), e))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Error parsing '{}': {}", path.display(), e))
}

fn compile_item_query(ctx: &Context, schema: &Path, query: &Path) -> Result<CompiledItemQuery, String> {
    let snapshot = load_schema(ctx, schema)?;
    let query: MediaItemQuery = read_json(query)?;
    CompiledItemQuery::compile(snapshot, &query, &ctx.options)
        .map_err(|e| format!("Compilation error: {}", e))
}

fn open_store(ctx: &Context, db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let path = match db {
        Some(path) => path,
        None => ctx
            .settings
            .store
            .resolved_database()
            .map_err(|e| format!("Error resolving database path: {}", e))?
            .ok_or_else(|| "No database given: pass --db or set [store] database".to_string())?,
    };
    SqliteStore::open(&path).map_err(|e| format!("Error opening '{}': {}", path.display(), e))
}

fn print_statements(statements: &[ExplainedStatement]) {
    for (i, stmt) in statements.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("-- {}", stmt.label);
        println!("{};", stmt.sql);
        if !stmt.params.is_empty() {
            let params: Vec<String> = stmt.params.iter().map(|p| p.to_string()).collect();
            println!("-- params: {}", params.join(", "));
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}
