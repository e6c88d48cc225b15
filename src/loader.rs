//! Drives one table load: pre-SQL, batched inserts, post-SQL.
//!
//! Every statement runs in its own committed transaction, so a failure part
//! way through leaves the batches already loaded in place. Rerunning the
//! load starts over from the pre-SQL drop/create.

use crate::errors::{AppError, AppResult};
use crate::formatter::{insert_statement, RowFormatter, SubstitutionRules};
use crate::models::Table;
use crate::parser::{BatchExt, RowReader};
use crate::scripts::SqlScripts;
use crate::utils::{format_duration, per_second, round_two_decimals};
use std::fmt;
use std::io::BufRead;
use std::time::Instant;
use tracing::{debug, error, info};

/// A connection able to run SQL and commit it.
pub trait Database {
    /// Executes `sql` (possibly several statements) as one transaction and
    /// commits it.
    fn execute_and_commit(&mut self, sql: &str) -> AppResult<()>;
}

/// Where a table load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Connecting,
    PreProcessing,
    Loading,
    PostProcessing,
    Done,
    Failed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::PreProcessing => "pre-processing",
            Self::Loading => "loading",
            Self::PostProcessing => "post-processing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything fixed for the duration of one load.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub table: Table,
    pub rules: SubstitutionRules,
    pub scripts: SqlScripts,
    pub batch_size: usize,
}

impl LoadPlan {
    pub fn new(
        table: Table,
        rules: SubstitutionRules,
        scripts: SqlScripts,
        batch_size: usize,
    ) -> Self {
        Self {
            table,
            rules,
            scripts,
            batch_size,
        }
    }
}

/// Counters reported at the end of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows inserted
    pub rows: u64,
    /// Malformed row elements dropped by the reader
    pub rows_skipped: u64,
    /// Batches pulled from the reader
    pub batches: u64,
    /// INSERT statements executed
    pub statements: u64,
}

/// Runs the load state machine for one table.
pub struct TableLoader<'p> {
    plan: &'p LoadPlan,
    phase: LoadPhase,
}

impl<'p> TableLoader<'p> {
    pub fn new(plan: &'p LoadPlan) -> Self {
        Self {
            plan,
            phase: LoadPhase::Connecting,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Opens the database connection with `connect`.
    pub fn connect<D, F>(&mut self, connect: F) -> AppResult<D>
    where
        F: FnOnce() -> AppResult<D>,
    {
        self.enter(LoadPhase::Connecting);
        let start = Instant::now();
        let db = connect().map_err(|e| self.fail(e))?;
        debug!(elapsed_secs = elapsed_secs(start), "Connected to database");
        Ok(db)
    }

    /// Runs pre-processing, loading and post-processing against `db`.
    ///
    /// On error the loader moves to [`LoadPhase::Failed`] and the error is
    /// returned unchanged.
    pub fn run<D, R>(&mut self, db: &mut D, rows: RowReader<R>) -> AppResult<LoadSummary>
    where
        D: Database,
        R: BufRead,
    {
        match self.run_phases(db, rows) {
            Ok(summary) => {
                self.enter(LoadPhase::Done);
                Ok(summary)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn run_phases<D, R>(&mut self, db: &mut D, rows: RowReader<R>) -> AppResult<LoadSummary>
    where
        D: Database,
        R: BufRead,
    {
        let table = self.plan.table;

        self.enter(LoadPhase::PreProcessing);
        let start = Instant::now();
        info!(table = table.name(), "Pre-processing");
        run_script(db, &self.plan.scripts.pre)?;
        info!(
            elapsed_secs = elapsed_secs(start),
            "Pre-processing finished"
        );

        self.enter(LoadPhase::Loading);
        let start = Instant::now();
        info!(table = table.name(), batch_size = self.plan.batch_size, "Processing data");
        let summary = self.load_rows(db, rows)?;
        let elapsed = start.elapsed();
        info!(
            rows = summary.rows,
            skipped = summary.rows_skipped,
            statements = summary.statements,
            elapsed = format_duration(elapsed),
            rows_per_sec = per_second(summary.rows as f64, elapsed),
            "Table processing finished"
        );

        self.enter(LoadPhase::PostProcessing);
        let start = Instant::now();
        info!(table = table.name(), "Post-processing");
        run_script(db, &self.plan.scripts.post)?;
        info!(
            elapsed_secs = elapsed_secs(start),
            "Post-processing finished"
        );

        Ok(summary)
    }

    fn load_rows<D, R>(&self, db: &mut D, mut rows: RowReader<R>) -> AppResult<LoadSummary>
    where
        D: Database,
        R: BufRead,
    {
        let table = self.plan.table;
        let formatter = RowFormatter::new(table.columns(), &self.plan.rules);
        let mut summary = LoadSummary::default();

        for batch in rows.by_ref().try_batches(self.plan.batch_size) {
            let batch = batch?;
            summary.batches += 1;

            let tuples: Vec<String> = batch.iter().map(|record| formatter.format(record)).collect();
            let Some(statement) = insert_statement(table, &tuples) else {
                continue;
            };

            db.execute_and_commit(&statement)?;
            summary.rows += tuples.len() as u64;
            summary.statements += 1;
            debug!(
                batch = summary.batches,
                rows = summary.rows,
                "Committed batch"
            );
        }

        summary.rows_skipped = rows.rows_skipped();
        Ok(summary)
    }

    fn enter(&mut self, phase: LoadPhase) {
        debug!(from = %self.phase, to = %phase, "Load phase change");
        self.phase = phase;
    }

    fn fail(&mut self, err: AppError) -> AppError {
        error!(
            table = self.plan.table.name(),
            phase = %self.phase,
            error = %err,
            "Load failed"
        );
        self.phase = LoadPhase::Failed;
        err
    }
}

/// Runs a pre/post script; blank scripts are skipped.
fn run_script<D: Database>(db: &mut D, sql: &str) -> AppResult<()> {
    if sql.trim().is_empty() {
        debug!("Script is empty, nothing to run");
        return Ok(());
    }
    db.execute_and_commit(sql)
}

fn elapsed_secs(start: Instant) -> f64 {
    round_two_decimals(start.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MalformedRowPolicy;

    #[derive(Default)]
    struct RecordingDb {
        executed: Vec<String>,
        fail_on: Option<usize>,
    }

    impl Database for RecordingDb {
        fn execute_and_commit(&mut self, sql: &str) -> AppResult<()> {
            if self.fail_on == Some(self.executed.len()) {
                return Err(AppError::Database {
                    code: Some("42601".to_string()),
                    message: "syntax error".to_string(),
                });
            }
            self.executed.push(sql.to_string());
            Ok(())
        }
    }

    fn plan(table: Table, pre: &str, post: &str, batch_size: usize) -> LoadPlan {
        LoadPlan::new(
            table,
            SubstitutionRules::for_table(table, false),
            SqlScripts::new(pre, post),
            batch_size,
        )
    }

    fn reader(xml: &str) -> RowReader<&[u8]> {
        RowReader::new(xml.as_bytes(), MalformedRowPolicy::Skip)
    }

    #[test]
    fn test_runs_pre_inserts_post_in_order() {
        let plan = plan(Table::Tags, "CREATE TABLE Tags ();", "CREATE INDEX x;", 10);
        let mut db = RecordingDb::default();
        let mut loader = TableLoader::new(&plan);

        let summary = loader
            .run(&mut db, reader(r#"<tags><row Id="1" TagName="rust" /></tags>"#))
            .unwrap();

        assert_eq!(db.executed.len(), 3);
        assert_eq!(db.executed[0], "CREATE TABLE Tags ();");
        assert_eq!(
            db.executed[1],
            "INSERT INTO Tags VALUES\n('1', 'rust', NULL, NULL, NULL);"
        );
        assert_eq!(db.executed[2], "CREATE INDEX x;");
        assert_eq!(summary.rows, 1);
        assert_eq!(loader.phase(), LoadPhase::Done);
    }

    #[test]
    fn test_blank_scripts_are_not_executed() {
        let plan = plan(Table::Tags, "", "  \n", 10);
        let mut db = RecordingDb::default();

        TableLoader::new(&plan)
            .run(&mut db, reader(r#"<row Id="1" />"#))
            .unwrap();

        assert_eq!(db.executed.len(), 1);
        assert!(db.executed[0].starts_with("INSERT INTO Tags"));
    }

    #[test]
    fn test_empty_dump_executes_no_insert() {
        let plan = plan(Table::Votes, "pre", "post", 10);
        let mut db = RecordingDb::default();

        let summary = TableLoader::new(&plan)
            .run(&mut db, reader("<votes></votes>"))
            .unwrap();

        assert_eq!(db.executed, vec!["pre", "post"]);
        assert_eq!(summary, LoadSummary::default());
    }

    #[test]
    fn test_database_error_stops_run_and_keeps_prior_batches() {
        let plan = plan(Table::Badges, "pre", "post", 1);
        let mut db = RecordingDb {
            fail_on: Some(2),
            ..RecordingDb::default()
        };
        let mut loader = TableLoader::new(&plan);

        let err = loader
            .run(
                &mut db,
                reader(r#"<row Id="1" /><row Id="2" /><row Id="3" />"#),
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Database { .. }));
        assert_eq!(loader.phase(), LoadPhase::Failed);
        // pre-SQL and the first batch were committed; post-SQL never ran
        assert_eq!(db.executed.len(), 2);
        assert!(db.executed[1].contains("('1', NULL, NULL, NULL)"));
    }

    #[test]
    fn test_pre_sql_failure_loads_nothing() {
        let plan = plan(Table::Badges, "pre", "post", 10);
        let mut db = RecordingDb {
            fail_on: Some(0),
            ..RecordingDb::default()
        };
        let mut loader = TableLoader::new(&plan);

        assert!(loader.run(&mut db, reader(r#"<row Id="1" />"#)).is_err());
        assert!(db.executed.is_empty());
        assert_eq!(loader.phase(), LoadPhase::Failed);
    }

    #[test]
    fn test_xml_error_aborts_after_committed_batches() {
        let plan = plan(Table::Badges, "", "post", 1);
        let mut db = RecordingDb::default();
        let mut loader = TableLoader::new(&plan);

        let err = loader
            .run(&mut db, reader(r#"<badges><row Id="1" /></users>"#))
            .unwrap_err();

        assert!(matches!(err, AppError::Xml { .. }));
        assert_eq!(db.executed.len(), 1);
        assert_eq!(loader.phase(), LoadPhase::Failed);
    }

    #[test]
    fn test_truncated_dump_fails_before_post_sql() {
        let plan = plan(Table::Tags, "pre", "post", 10);
        let mut db = RecordingDb::default();
        let mut loader = TableLoader::new(&plan);
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<tags>\n  <row Id=\"1\" TagName=\"rust\" />\n  <row Id=\"2\" TagName=\"sql\" />\n";

        let err = loader
            .run(
                &mut db,
                RowReader::new(xml.as_bytes(), MalformedRowPolicy::Abort),
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Xml { .. }));
        assert_eq!(loader.phase(), LoadPhase::Failed);
        // the partial batch is dropped with the error and post-SQL never runs
        assert_eq!(db.executed, vec!["pre"]);
    }

    #[test]
    fn test_skipped_rows_are_counted() {
        let plan = plan(Table::Badges, "", "", 10);
        let mut db = RecordingDb::default();

        let summary = TableLoader::new(&plan)
            .run(&mut db, reader(r#"<row Id="1" /><row Id=2 /><row Id="3" />"#))
            .unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.statements, 1);
    }

    #[test]
    fn test_connect_failure_marks_failed() {
        let plan = plan(Table::Users, "", "", 10);
        let mut loader = TableLoader::new(&plan);

        let result: AppResult<RecordingDb> = loader.connect(|| {
            Err(AppError::Database {
                code: None,
                message: "connection refused".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(loader.phase(), LoadPhase::Failed);
    }

    #[test]
    fn test_connect_then_run() {
        let plan = plan(Table::Users, "", "", 10);
        let mut loader = TableLoader::new(&plan);
        assert_eq!(loader.phase(), LoadPhase::Connecting);

        let mut db = loader.connect(|| Ok(RecordingDb::default())).unwrap();
        loader.run(&mut db, reader(r#"<row Id="1" />"#)).unwrap();

        assert_eq!(loader.phase(), LoadPhase::Done);
        assert_eq!(db.executed.len(), 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LoadPhase::PreProcessing.to_string(), "pre-processing");
        assert_eq!(LoadPhase::Failed.to_string(), "failed");
    }
}
