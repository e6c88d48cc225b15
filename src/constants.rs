// Connection defaults
pub const DEFAULT_DBNAME: &str = "stackoverflow";
pub const DEFAULT_HOST: &str = "localhost";

// Pipeline defaults
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_SQL_DIR: &str = "sql";

// Every data row in a dump is a `<row .../>` element
pub const ROW_ELEMENT: &[u8] = b"row";

// Read-ahead buffer for dump files
pub const INPUT_BUFFER_BYTES: usize = 1024 * 1024;

// Placeholder substituted with the escaped raw value inside a substitution rule
pub const VALUE_PLACEHOLDER: &str = "{value}";
