use crate::config::ConnectionConfig;
use crate::constants::DEFAULT_HOST;
use crate::errors::AppResult;
use crate::loader::Database;
use postgres::error::DbError;
use postgres::{Client, Config, NoTls};
use tracing::{info, warn};

/// PostgreSQL connection used for a table load.
pub struct PgDatabase {
    client: Client,
}

impl PgDatabase {
    /// Connects with the given parameters.
    ///
    /// Missing host and user fall back to `localhost` and `$USER`, matching
    /// what `psql` would use. Server notices are forwarded to the log as
    /// warnings.
    pub fn connect(conn: &ConnectionConfig) -> AppResult<Self> {
        let config = pg_config(conn);
        info!(
            dbname = %conn.dbname,
            host = conn.host.as_deref().unwrap_or(DEFAULT_HOST),
            "Connecting to database"
        );
        let client = config.connect(NoTls)?;
        Ok(Self { client })
    }
}

impl Database for PgDatabase {
    fn execute_and_commit(&mut self, sql: &str) -> AppResult<()> {
        let mut tx = self.client.transaction()?;
        tx.batch_execute(sql)?;
        tx.commit()?;
        Ok(())
    }
}

fn pg_config(conn: &ConnectionConfig) -> Config {
    let mut config = Config::new();
    config
        .dbname(&conn.dbname)
        .host(conn.host.as_deref().unwrap_or(DEFAULT_HOST))
        .notice_callback(log_notice);

    if let Some(port) = conn.port {
        config.port(port);
    }
    if let Some(user) = conn.username.clone().or_else(|| std::env::var("USER").ok()) {
        config.user(&user);
    }
    if let Some(password) = &conn.password {
        config.password(password);
    }
    config
}

fn log_notice(notice: DbError) {
    warn!(
        severity = notice.severity(),
        code = notice.code().code(),
        message = notice.message(),
        "Warning from the database"
    );
}
