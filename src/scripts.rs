use crate::errors::{AppError, AppResult};
use crate::models::Table;
use std::fs;
use std::path::Path;

/// The SQL run around a table load: drop/create before, indexes after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlScripts {
    pub pre: String,
    pub post: String,
}

impl SqlScripts {
    pub fn new(pre: impl Into<String>, post: impl Into<String>) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
        }
    }

    /// Reads `<Table>_pre.sql` and `<Table>_post.sql` from `sql_dir`.
    ///
    /// Both files must exist; an empty file means "nothing to run".
    pub fn load(sql_dir: &Path, table: Table) -> AppResult<Self> {
        let pre = read_script(&sql_dir.join(table.pre_script_name()))?;
        let post = read_script(&sql_dir.join(table.post_script_name()))?;
        Ok(Self { pre, post })
    }
}

fn read_script(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|e| AppError::Script {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
