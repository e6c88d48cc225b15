//! sedump-pg library
//!
//! This crate provides the core functionality for the `sedump-pg` binary.
//! Keep the crate root minimal; implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library is organized into modules that handle the stages of loading a
//! Stack Exchange XML dump into PostgreSQL:
//!
//! - [`parser`] - Streams `<row/>` elements out of a dump and groups them into batches
//! - [`formatter`] - Turns records into escaped SQL tuples and `INSERT` statements
//! - [`loader`] - Runs pre-SQL, batched inserts and post-SQL for one table
//! - [`db`] - PostgreSQL connection implementing the loader's [`loader::Database`] seam
//! - [`scripts`] - Loads the per-table pre/post SQL scripts
//! - [`cli`] - Command-line interface wiring everything together
//! - [`models`] - Tables, their column templates, and parsed records
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use sedump_pg::formatter::SubstitutionRules;
//! use sedump_pg::loader::{LoadPlan, TableLoader};
//! use sedump_pg::models::Table;
//! use sedump_pg::parser::{MalformedRowPolicy, RowReader};
//! use sedump_pg::{config::ConnectionConfig, db::PgDatabase, errors::AppResult, scripts::SqlScripts};
//! use std::{fs::File, io::BufReader, path::Path};
//!
//! # fn example() -> AppResult<()> {
//! let table = Table::Comments;
//! let plan = LoadPlan::new(
//!     table,
//!     SubstitutionRules::for_table(table, false),
//!     SqlScripts::load(Path::new("sql"), table)?,
//!     500,
//! );
//! let rows = RowReader::new(BufReader::new(File::open("Comments.xml")?), MalformedRowPolicy::Skip);
//!
//! let mut loader = TableLoader::new(&plan);
//! let mut db = loader.connect(|| PgDatabase::connect(&ConnectionConfig::default()))?;
//! let summary = loader.run(&mut db, rows)?;
//! println!("{} rows loaded", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod errors;
pub mod formatter;
pub mod loader;
pub mod models;
pub mod parser;
pub mod scripts;
pub mod ui;
pub mod utils;
