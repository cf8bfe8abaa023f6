//! PostgreSQL integration tests.
//!
//! Skipped unless DATABASE_URL points at a reachable database. Every query
//! computes its rows, so no schema setup is needed.

use super::common::{session_with_diagnostics, Account, User};
use pretty_assertions::assert_eq;
use rowscan::config::ConnectionConfig;
use rowscan::db::PostgresExecutor;
use rowscan::{record, Destination, Session, Value};
use std::sync::Arc;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test executor.
async fn get_test_executor() -> Option<PostgresExecutor> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresExecutor::connect(&config).await.ok()
}

#[tokio::test]
async fn test_select_all_computed_rows() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let rows = session
        .select_all(
            Destination::sequence(&mut users),
            "SELECT n::bigint AS id, 'user_' || n AS name, now() AS extra
             FROM generate_series(1, ?) AS n",
            &[Value::Int(4)],
        )
        .await
        .unwrap();

    assert_eq!(rows, 4);
    assert_eq!(users[3].name, "user_4");
    assert_eq!(diagnostics.timings().len(), 1);

    executor.close().await;
}

#[tokio::test]
async fn test_select_one_with_typed_columns() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let session = Session::new(executor.clone());
    let mut account = Account::default();

    let found = session
        .select_one(
            Destination::single(&mut account),
            "SELECT 9::int4 AS id, 'Main' AS name, NULL::float8 AS balance, true AS active",
            &[],
        )
        .await
        .unwrap();

    assert!(found);
    assert_eq!(account.id, 9);
    assert_eq!(account.display_name, "Main");
    assert_eq!(account.balance, None);
    assert!(account.active);

    executor.close().await;
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Price {
    id: i64,
    amount: String,
    created: Option<String>,
}

record!(Price {
    id,
    amount,
    created,
});

#[tokio::test]
async fn test_numeric_and_timestamptz_keep_their_values() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let session = Session::new(executor.clone());
    let mut prices: Vec<Price> = Vec::new();

    let rows = session
        .select_all(
            Destination::sequence(&mut prices),
            "SELECT 1::int8 AS id, 12.50::numeric AS amount,
                    '2024-02-29 13:45:30+00'::timestamptz AS created",
            &[],
        )
        .await
        .unwrap();

    assert_eq!(rows, 1);
    assert_eq!(
        prices,
        vec![Price {
            id: 1,
            amount: "12.50".to_string(),
            created: Some("2024-02-29 13:45:30+00".to_string()),
        }]
    );

    executor.close().await;
}

#[tokio::test]
async fn test_unreadable_column_fails_instead_of_null() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut prices: Vec<Price> = Vec::new();

    let err = session
        .select_all(
            Destination::sequence(&mut prices),
            "SELECT 1::int8 AS id, '1.5' AS amount, ARRAY['2024-01-01'] AS created",
            &[],
        )
        .await
        .unwrap_err();

    assert_eq!(err.rows_processed, 0);
    assert_eq!(err.error.category(), "Scan Error");
    assert!(prices.is_empty());
    assert!(diagnostics.errors().is_empty());

    executor.close().await;
}

#[tokio::test]
async fn test_missing_column_is_binding_error() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let session = Session::new(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(Destination::sequence(&mut users), "SELECT 1::bigint AS id", &[])
        .await
        .unwrap_err();

    assert_eq!(err.rows_processed, 0);
    assert_eq!(err.error.category(), "Binding Error");

    executor.close().await;
}

#[tokio::test]
async fn test_unknown_table_is_execution_error() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = Arc::new(executor);
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(
            Destination::sequence(&mut users),
            "SELECT id, name FROM nonexistent_table_xyz",
            &[],
        )
        .await
        .unwrap_err();

    assert_eq!(err.error.category(), "Execution Error");
    assert_eq!(diagnostics.errors().len(), 1);

    executor.close().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_port() {
    let config = ConnectionConfig {
        host: Some("localhost".to_string()),
        port: 59999,
        database: Some("testdb".to_string()),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
    };

    let result = PostgresExecutor::connect(&config).await;
    assert!(result.is_err());
}
