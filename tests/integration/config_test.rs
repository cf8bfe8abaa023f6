//! Configuration loading tests.

use pretty_assertions::assert_eq;
use rowscan::db::MemoryExecutor;
use rowscan::{ColumnMatch, Config, Session};
use std::sync::Arc;

#[test]
fn test_load_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[session]
timing_name = "reports.select"
column_match = "exact"
slow_query_ms = 500

[connections.default]
host = "db.internal"
database = "reports"
user = "reader"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.session.timing_name, "reports.select");
    assert_eq!(config.session.column_match, ColumnMatch::Exact);
    assert_eq!(config.session.slow_query_ms, Some(500));

    let conn = config.get_connection(None).unwrap();
    assert_eq!(
        conn.to_connection_string().unwrap(),
        "postgres://reader@db.internal:5432/reports"
    );
}

#[test]
fn test_invalid_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[session\ntiming_name = 1").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
}

#[test]
fn test_session_uses_loaded_settings() {
    let config: Config = toml::from_str("[session]\ntiming_name = \"app.q\"\n").unwrap();
    let session = Session::from_config(Arc::new(MemoryExecutor::new()), &config.session);

    assert_eq!(session.config().timing_name, "app.q");
    assert_eq!(session.config().column_match, ColumnMatch::IgnoreAsciiCase);
}
