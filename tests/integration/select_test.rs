//! End-to-end select tests over the in-memory executor.

use super::common::{session_with_diagnostics, Account, User};
use pretty_assertions::assert_eq;
use rowscan::db::{MemoryExecutor, ResultSet};
use rowscan::diagnostics::Event;
use rowscan::{ColumnMatch, Destination, Error, Session, SessionConfig, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn users_result() -> ResultSet {
    ResultSet::from_names(
        ["id", "name", "extra"],
        vec![
            vec![Value::Int(1), Value::from("Ann"), Value::from("a")],
            vec![Value::Int(2), Value::from("Bo"), Value::from("b")],
            vec![Value::Int(3), Value::from("Cy"), Value::from("c")],
        ],
    )
}

#[tokio::test]
async fn test_three_rows_with_extra_column() {
    let executor = Arc::new(
        MemoryExecutor::new().with_result("SELECT id, name, extra FROM users", users_result()),
    );
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let rows = session
        .select_all(
            Destination::sequence(&mut users),
            "SELECT id, name, extra FROM users",
            &[],
        )
        .await
        .unwrap();

    assert_eq!(rows, 3);
    assert_eq!(
        users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
        vec!["Ann", "Bo", "Cy"]
    );
    assert_eq!(executor.opened_cursors(), 1);
    assert_eq!(executor.closed_cursors(), 1);
    assert_eq!(diagnostics.timings().len(), 1);
    assert!(diagnostics.errors().is_empty());
}

#[tokio::test]
async fn test_missing_column_fails_before_any_record() {
    let executor = Arc::new(MemoryExecutor::new().with_result(
        "SELECT id FROM users",
        ResultSet::from_names(["id"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]),
    ));
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(Destination::sequence(&mut users), "SELECT id FROM users", &[])
        .await
        .unwrap_err();

    assert_eq!(err.rows_processed, 0);
    assert_eq!(err.error, Error::binding("name", "name"));
    assert!(users.is_empty());
    assert_eq!(executor.closed_cursors(), 1);
    assert_eq!(diagnostics.timings().len(), 1);
}

#[tokio::test]
async fn test_parameters_are_interpolated_before_execution() {
    let sql = "SELECT id, name FROM users WHERE name = 'O''Hara' AND id > 10";
    let executor = Arc::new(MemoryExecutor::new().with_result(
        sql,
        ResultSet::from_names(
            ["id", "name"],
            vec![vec![Value::Int(11), Value::from("O'Hara")]],
        ),
    ));
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let rows = session
        .select_all(
            Destination::sequence(&mut users),
            "SELECT id, name FROM users WHERE name = ? AND id > ?",
            &[Value::from("O'Hara"), Value::Int(10)],
        )
        .await
        .unwrap();

    assert_eq!(rows, 1);
    assert_eq!(executor.executed(), vec![sql.to_string()]);
    assert_eq!(diagnostics.timings()[0].tag("sql"), Some(sql));
}

#[tokio::test]
async fn test_ignored_field_keeps_its_value() {
    let executor = Arc::new(MemoryExecutor::new().with_result(
        "SELECT * FROM accounts",
        ResultSet::from_names(
            ["ID", "Name", "balance", "active", "cache_key"],
            vec![vec![
                Value::Int(7),
                Value::from("Main"),
                Value::Null,
                Value::Int(1),
                Value::from("from-db"),
            ]],
        ),
    ));
    let session = Session::new(executor);
    let mut account = Account {
        cache_key: "local".to_string(),
        ..Account::default()
    };

    let found = session
        .select_one(Destination::single(&mut account), "SELECT * FROM accounts", &[])
        .await
        .unwrap();

    assert!(found);
    assert_eq!(
        account,
        Account {
            id: 7,
            display_name: "Main".to_string(),
            balance: None,
            active: true,
            cache_key: "local".to_string(),
        }
    );
}

#[tokio::test]
async fn test_exact_matching_rejects_other_case() {
    let executor = Arc::new(MemoryExecutor::new().with_result(
        "q",
        ResultSet::from_names(["ID", "NAME"], vec![vec![Value::Int(1), Value::from("x")]]),
    ));
    let config = SessionConfig {
        column_match: ColumnMatch::Exact,
        ..SessionConfig::default()
    };
    let session = Session::from_config(executor, &config);
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(Destination::sequence(&mut users), "q", &[])
        .await
        .unwrap_err();

    assert_eq!(err.error.category(), "Binding Error");
}

#[tokio::test]
async fn test_mapping_keeps_later_row_per_key() {
    let executor = Arc::new(MemoryExecutor::new().with_result(
        "q",
        ResultSet::from_names(
            ["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("first")],
                vec![Value::Int(2), Value::from("other")],
                vec![Value::Int(1), Value::from("second")],
            ],
        ),
    ));
    let session = Session::new(executor);
    let mut by_id: HashMap<i64, User> = HashMap::new();

    let rows = session
        .select_all(Destination::mapping(&mut by_id, |u: &User| u.id), "q", &[])
        .await
        .unwrap();

    assert_eq!(rows, 3);
    assert_eq!(by_id.len(), 2);
    assert_eq!(by_id[&1].name, "second");
}

#[tokio::test]
async fn test_mapping_into_btree_by_name() {
    let executor = Arc::new(MemoryExecutor::new().with_result("q", users_result()));
    let session = Session::new(executor);
    let mut by_name: BTreeMap<String, User> = BTreeMap::new();

    session
        .select_all(
            Destination::mapping(&mut by_name, |u: &User| u.name.clone()),
            "q",
            &[],
        )
        .await
        .unwrap();

    assert_eq!(
        by_name.keys().cloned().collect::<Vec<_>>(),
        vec!["Ann".to_string(), "Bo".to_string(), "Cy".to_string()]
    );
}

#[tokio::test]
async fn test_iteration_failure_keeps_stored_records() {
    let executor = Arc::new(MemoryExecutor::new().with_iteration_error(
        "q",
        users_result(),
        2,
        "connection reset",
    ));
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(Destination::sequence(&mut users), "q", &[])
        .await
        .unwrap_err();

    assert_eq!(err.rows_processed, 2);
    assert_eq!(err.error.category(), "Iteration Error");
    assert_eq!(users.len(), 2);
    assert_eq!(executor.closed_cursors(), 1);
    assert_eq!(diagnostics.timings().len(), 1);
}

#[tokio::test]
async fn test_query_failure_reports_error_and_timing() {
    let executor = Arc::new(MemoryExecutor::new().with_query_error("q", "relation does not exist"));
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_all(Destination::sequence(&mut users), "q", &[])
        .await
        .unwrap_err();

    assert_eq!(err.rows_processed, 0);
    assert_eq!(err.error.category(), "Execution Error");
    assert_eq!(executor.opened_cursors(), 0);

    let events = diagnostics.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        Event::Error { name, .. } if name == "rowscan.select.query_error"
    ));
    assert!(matches!(&events[1], Event::Timing { name, .. } if name == "rowscan.select"));
}

#[tokio::test]
async fn test_select_one_reads_only_the_first_row() {
    let executor = Arc::new(MemoryExecutor::new().with_result("q", users_result()));
    let session = Session::new(executor.clone());
    let mut user = User::default();

    let found = session
        .select_one(Destination::single(&mut user), "q", &[])
        .await
        .unwrap();

    assert!(found);
    assert_eq!(user.id, 1);
    assert_eq!(executor.closed_cursors(), 1);
}

#[tokio::test]
async fn test_select_one_without_rows_leaves_record_alone() {
    let executor = Arc::new(
        MemoryExecutor::new().with_result("q", ResultSet::from_names(["id", "name"], Vec::new())),
    );
    let session = Session::new(executor);
    let mut user = User {
        id: 42,
        name: "kept".to_string(),
    };

    let found = session
        .select_one(Destination::single(&mut user), "q", &[])
        .await
        .unwrap();

    assert!(!found);
    assert_eq!(user.id, 42);
    assert_eq!(user.name, "kept");
}

#[tokio::test]
async fn test_wrong_destination_shape_runs_no_query() {
    let executor = Arc::new(MemoryExecutor::new().with_result("q", users_result()));
    let (session, diagnostics) = session_with_diagnostics(executor.clone());
    let mut users: Vec<User> = Vec::new();

    let err = session
        .select_one(Destination::sequence(&mut users), "q", &[])
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Shape Error");
    assert!(executor.executed().is_empty());
    assert!(diagnostics.events().is_empty());
}
