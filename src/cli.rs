use crate::config::{ConnectionConfig, ResolvedConfig, ResolvedConfigFile};
use crate::constants::{DEFAULT_DBNAME, INPUT_BUFFER_BYTES};
use crate::db::PgDatabase;
use crate::errors::{AppError, AppResult};
use crate::formatter::SubstitutionRules;
use crate::loader::{LoadPlan, TableLoader};
use crate::models::Table;
use crate::parser::{MalformedRowPolicy, RowReader};
use crate::scripts::SqlScripts;
use crate::ui::create_progress_bar;
use crate::utils::{format_duration, mb_from_bytes, per_second, round_two_decimals};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Everything needed to load one table, however it was requested.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub table: Table,
    pub file: PathBuf,
    pub connection: ConnectionConfig,
    pub with_post_body: bool,
    pub assume_yes: bool,
    pub resolved: ResolvedConfig,
}

impl LoadRequest {
    /// Builds a request from the `load` subcommand's matches.
    pub fn from_matches(sub: &ArgMatches) -> AppResult<Self> {
        let table: Table = sub
            .get_one::<String>("table")
            .expect("table is required")
            .parse()?;

        let mut resolved = ResolvedConfig::default();
        if let Some(&batch_size) = sub.get_one::<usize>("batch_size") {
            resolved.batch_size = batch_size;
        }
        if let Some(sql_dir) = sub.get_one::<PathBuf>("sql_dir") {
            resolved.sql_dir = sql_dir.clone();
        }
        if let Some(policy) = sub.get_one::<String>("on_malformed") {
            resolved.on_malformed_row = policy.parse::<MalformedRowPolicy>()?;
        }
        if sub.get_flag("no_progress") {
            resolved.progress = false;
        }
        resolved.validate()?;

        let connection = ConnectionConfig {
            dbname: sub
                .get_one::<String>("dbname")
                .expect("dbname has default_value")
                .clone(),
            host: sub.get_one::<String>("host").cloned(),
            port: sub.get_one::<u16>("port").copied(),
            username: sub.get_one::<String>("username").cloned(),
            password: sub.get_one::<String>("password").cloned(),
        };

        Ok(Self {
            table,
            file: sub
                .get_one::<PathBuf>("file")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(table.default_input_file())),
            connection,
            with_post_body: sub.get_flag("with_post_body"),
            assume_yes: sub.get_flag("yes"),
            resolved,
        })
    }

    /// Builds a request from a loaded TOML configuration file.
    pub fn from_config_file(file_config: ResolvedConfigFile) -> AppResult<Self> {
        let table: Table = file_config.table.parse()?;
        Ok(Self {
            table,
            file: file_config
                .file
                .unwrap_or_else(|| PathBuf::from(table.default_input_file())),
            connection: file_config.database,
            with_post_body: file_config.with_post_body,
            assume_yes: file_config.assume_yes,
            resolved: file_config.resolved,
        })
    }
}

/// Builds the command-line interface.
///
/// - `load`: load one table with options given as flags
/// - `toml`: load one table as described by a TOML configuration file
pub fn build_command() -> Command<'static> {
    Command::new("sedump-pg")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("load")
                .about("Drop, recreate and load one table from its XML dump")
                .after_help("Tables: Users, Badges, Posts, Tags, Votes, PostLinks, PostHistory, Comments\nExample:\n  sedump-pg load Posts -d stackoverflow -f dumps/Posts.xml --with-post-body")
                .arg(
                    Arg::new("table")
                        .help("The table to work on")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("dbname")
                        .short('d')
                        .long("dbname")
                        .help("Name of database to create the table in. The database must exist.")
                        .default_value(DEFAULT_DBNAME)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .help("Name of the file to extract data from (defaults to <TABLE>.xml)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Username for the database")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Password for the database")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("port")
                        .short('P')
                        .long("port")
                        .help("Port to connect with the database on")
                        .value_parser(clap::value_parser!(u16))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("host")
                        .short('H')
                        .long("host")
                        .help("Hostname for the database")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("with_post_body")
                        .long("with-post-body")
                        .help("Import the posts with the post body. Only used if importing Posts")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("batch_size")
                        .short('b')
                        .long("batch-size")
                        .help("Rows per INSERT statement and transaction")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("sql_dir")
                        .long("sql-dir")
                        .help("Directory with the <TABLE>_pre.sql and <TABLE>_post.sql scripts")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("on_malformed")
                        .long("on-malformed")
                        .help("What to do with rows that cannot be parsed: 'skip' or 'abort'")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Do not ask before dropping the table")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no_progress")
                        .long("no-progress")
                        .help("Do not draw a progress bar")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

/// Parses command-line arguments and executes the load.
///
/// Returns `Ok(())` when the load finished or the user cancelled at the
/// prompt. Returns an error if arguments or configuration are invalid, the
/// input or SQL scripts cannot be read, the dump is broken, or the database
/// rejects a statement.
pub fn cli() -> AppResult<()> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("load", sub)) => run_workflow(&LoadRequest::from_matches(sub)?),
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .expect("config is required");

            let file_config = ResolvedConfigFile::from_toml_file(config_path)?;
            run_workflow(&LoadRequest::from_config_file(file_config)?)
        }
        _ => cmd_for_help
            .print_help()
            .map_err(|e| AppError::Io(format!("Failed to print help: {e}"))),
    }
}

fn run_workflow(request: &LoadRequest) -> AppResult<()> {
    let table = request.table;

    if request.with_post_body && table != Table::Posts {
        warn!(table = table.name(), "--with-post-body only applies to Posts, ignoring");
    }

    if !request.assume_yes {
        let stdin = io::stdin();
        if !confirm_drop(table, stdin.lock(), io::stdout())? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let scripts = SqlScripts::load(&request.resolved.sql_dir, table)?;

    let input_error = |e: io::Error| AppError::InputFile {
        path: request.file.display().to_string(),
        reason: e.to_string(),
    };
    let file = File::open(&request.file).map_err(input_error)?;
    let input_bytes = file.metadata().map_err(input_error)?.len();

    print_load_info(request, input_bytes);

    let pb = create_progress_bar(input_bytes, request.resolved.progress)?;
    let reader = BufReader::with_capacity(INPUT_BUFFER_BYTES, pb.wrap_read(file));
    let rows = RowReader::new(reader, request.resolved.on_malformed_row);

    let plan = LoadPlan::new(
        table,
        SubstitutionRules::for_table(table, request.with_post_body),
        scripts,
        request.resolved.batch_size,
    );

    let start = Instant::now();
    let mut loader = TableLoader::new(&plan);
    let mut db = loader.connect(|| PgDatabase::connect(&request.connection))?;
    let result = loader.run(&mut db, rows);
    pb.finish_and_clear();
    let summary = result?;

    let elapsed = start.elapsed();
    let input_mb = mb_from_bytes(input_bytes);
    info!(
        table = table.name(),
        rows = summary.rows,
        skipped = summary.rows_skipped,
        statements = summary.statements,
        elapsed = format_duration(elapsed),
        throughput_mb_s = per_second(input_mb, elapsed),
        "Load completed successfully"
    );

    Ok(())
}

/// Asks before the pre-processing script drops the table.
///
/// Any answer starting with `y` or `Y` confirms.
pub fn confirm_drop<R: BufRead, W: Write>(table: Table, mut input: R, mut output: W) -> AppResult<bool> {
    write!(output, "This will drop the {table} table. Are you sure [y/n]?")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer
        .chars()
        .next()
        .map_or(false, |c| c.eq_ignore_ascii_case(&'y')))
}

fn print_load_info(request: &LoadRequest, input_bytes: u64) {
    info!(
        table = request.table.name(),
        file = %request.file.display(),
        input_mb = round_two_decimals(mb_from_bytes(input_bytes)),
        dbname = %request.connection.dbname,
        batch_size = request.resolved.batch_size,
        on_malformed_row = request.resolved.on_malformed_row.as_str(),
        "Starting load"
    );
}
