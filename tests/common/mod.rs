//! Common test utilities for integration tests

use sedump_pg::errors::AppResult;
use sedump_pg::loader::Database;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Helper function to create a test XML file in a directory
#[allow(dead_code)]
pub fn create_test_xml_file(path: &Path, content: &str) {
    let parent = path.parent().unwrap();
    fs::create_dir_all(parent).unwrap();
    fs::File::create(path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}

/// Database stand-in that records every committed statement.
#[derive(Debug, Default)]
pub struct RecordingDb {
    pub executed: Vec<String>,
}

impl RecordingDb {
    /// Statements that are bulk inserts, in execution order.
    #[allow(dead_code)]
    pub fn inserts(&self) -> Vec<&str> {
        self.executed
            .iter()
            .map(String::as_str)
            .filter(|sql| sql.starts_with("INSERT INTO"))
            .collect()
    }
}

impl Database for RecordingDb {
    fn execute_and_commit(&mut self, sql: &str) -> AppResult<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }
}

/// Three comments; the last one has no UserId and a quote in its text
#[allow(dead_code)]
pub const COMMENTS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<comments>
  <row Id="1" PostId="10" Score="2" Text="Nice answer" CreationDate="2010-08-01T12:00:00.000" UserId="7" />
  <row Id="2" PostId="10" Score="0" Text="Thanks!" CreationDate="2010-08-01T12:05:00.000" UserId="8" />
  <row Id="3" PostId="11" Score="1" Text="Don&apos;t do that" CreationDate="2010-08-02T09:00:00.000" />
</comments>"#;

/// Posts with an empty ViewCount, a missing ViewCount and awkward bodies
#[allow(dead_code)]
pub const POSTS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<posts>
  <row Id="1" PostTypeId="1" CreationDate="2008-07-31T21:42:52.667" Score="5" ViewCount="" Body="&lt;p&gt;It&apos;s &quot;quoted&quot;&lt;/p&gt;&#xA;" Title="First" />
  <row Id="2" PostTypeId="2" ParentId="1" CreationDate="2008-07-31T22:17:57.883" Score="3" Body="line one&#xA;line two" />
  <row Id="3" PostTypeId="1" CreationDate="2008-08-01T10:00:00.000" ViewCount="120" Body="plain" Title="Third" />
</posts>"#;
