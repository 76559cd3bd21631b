//! mysql-mcp-client: MCP stdio client for MySQL tool servers
//!
//! One-shot CLI over the session protocol: each subcommand spawns its own
//! tool-server process, performs the handshake and database connection,
//! runs, and tears the session down again.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mysql_mcp_client::config::{self, Config};
use mysql_mcp_client::mcp::client::{Session, SessionOptions};
use mysql_mcp_client::mcp::transport::StdioTransport;
use mysql_mcp_client::router::{self, NormalizedResult};
use mysql_mcp_client::schema;
use mysql_mcp_client::translate::{Translation, Translator};

/// MCP stdio client for MySQL tool servers.
///
/// Drives a MySQL tool server over the Model Context Protocol, with
/// natural-language-to-SQL translation grounded in the live schema.
#[derive(Parser, Debug)]
#[command(name = "mysql-mcp-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Spawn the tool server and test the database connection
    Connect,

    /// Run a SELECT statement (read-only path)
    Query {
        /// The SQL statement to run
        sql: String,
    },

    /// Run a write statement (INSERT, UPDATE, DELETE, ...)
    Exec {
        /// The SQL statement to run
        sql: String,
    },

    /// List the tables of the connected database
    Tables,

    /// Show the column schema of one table
    Describe {
        /// The table to describe
        table: String,
    },

    /// Translate a natural-language query into SQL
    Ask {
        /// The natural-language query
        text: String,

        /// Execute the generated statement
        #[arg(long)]
        run: bool,

        /// With --run, refuse anything that is not a SELECT
        #[arg(long)]
        read_only: bool,

        /// Skip schema introspection (ungrounded translation)
        #[arg(long)]
        no_schema: bool,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the mysql-mcp-client CLI.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting mysql-mcp-client"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cfg, args.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Dispatches one subcommand.
async fn run(cfg: &Config, command: CliCommand) -> CliResult {
    match command {
        CliCommand::Connect => connect(cfg).await,
        CliCommand::Query { sql } => query(cfg, &sql).await,
        CliCommand::Exec { sql } => exec(cfg, &sql).await,
        CliCommand::Tables => tables(cfg).await,
        CliCommand::Describe { table } => describe(cfg, &table).await,
        CliCommand::Ask {
            text,
            run,
            read_only,
            no_schema,
        } => ask(cfg, &text, run, read_only, no_schema).await,
    }
}

/// Spawns the tool server, performs the handshake, and connects the
/// database. Every subcommand starts here; sessions are never shared.
async fn open_session(cfg: &Config) -> Result<Session<StdioTransport>, Box<dyn std::error::Error>> {
    let options = SessionOptions {
        call_timeout: Duration::from_secs(cfg.call_timeout_secs),
    };
    let mut session = Session::spawn(&cfg.server, &cfg.connection, options)?;

    if let Err(e) = session.initialize().await {
        session.close().await;
        return Err(e.into());
    }

    match session.connect_db(&cfg.connection).await {
        Ok(result) => {
            if let Some(status) = result.text() {
                info!(status, "database connected");
            }
            Ok(session)
        }
        Err(e) => {
            session.close().await;
            Err(e.into())
        }
    }
}

async fn connect(cfg: &Config) -> CliResult {
    let mut session = open_session(cfg).await?;
    session.close().await;
    println!(
        "Connected to {}:{}/{}",
        cfg.connection.host, cfg.connection.port, cfg.connection.database
    );
    Ok(())
}

async fn query(cfg: &Config, sql: &str) -> CliResult {
    let mut session = open_session(cfg).await?;
    let outcome = router::execute_read_only(&mut session, sql).await;
    session.close().await;
    print_result(&outcome?);
    Ok(())
}

async fn exec(cfg: &Config, sql: &str) -> CliResult {
    let mut session = open_session(cfg).await?;
    let outcome = router::execute(&mut session, sql).await;
    session.close().await;
    print_result(&outcome?);
    Ok(())
}

async fn tables(cfg: &Config) -> CliResult {
    let mut session = open_session(cfg).await?;
    let outcome = schema::list_table_names(&mut session).await;
    session.close().await;

    for (i, name) in outcome?.iter().enumerate() {
        println!("{}. {name}", i + 1);
    }
    Ok(())
}

async fn describe(cfg: &Config, table: &str) -> CliResult {
    let mut session = open_session(cfg).await?;
    let outcome = schema::describe_table(&mut session, table).await;
    session.close().await;

    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

async fn ask(cfg: &Config, text: &str, run: bool, read_only: bool, no_schema: bool) -> CliResult {
    let translator = Translator::new(&cfg.deepseek)?;
    let mut session = open_session(cfg).await?;

    let grounding = if no_schema {
        None
    } else {
        match schema::introspect(&mut session).await {
            Ok(report) => {
                for failure in &report.failures {
                    eprintln!(
                        "Warning: could not describe table `{}`: {}",
                        failure.table, failure.error
                    );
                }
                Some(report.tables)
            }
            Err(e) => {
                session.close().await;
                return Err(e.into());
            }
        }
    };

    let translation = match translator.translate(text, grounding.as_deref()).await {
        Ok(translation) => translation,
        Err(e) => Translation::failure(&e),
    };

    println!("SQL: {}", translation.sql);
    println!("Explanation: {}", translation.explanation);

    if run {
        if translation.sql.is_empty() {
            session.close().await;
            eprintln!("Nothing to run: no SQL statement was produced.");
            return Ok(());
        }
        let outcome = if read_only {
            router::execute_read_only(&mut session, &translation.sql).await
        } else {
            router::execute(&mut session, &translation.sql).await
        };
        session.close().await;
        print_result(&outcome?);
    } else {
        session.close().await;
    }

    Ok(())
}

/// Prints a normalised result: pretty JSON when the payload decoded,
/// verbatim text otherwise.
fn print_result(result: &NormalizedResult) {
    match result {
        NormalizedResult::Json(value) => match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{value}"),
        },
        NormalizedResult::Text(text) => println!("{text}"),
        NormalizedResult::Absent => eprintln!("(no result payload)"),
    }
}
