//! Record types and fixtures shared by the integration tests.

use rowscan::record;
use rowscan::{MemoryDiagnostics, Session};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

record!(User { id, name });

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub display_name: String,
    pub balance: Option<f64>,
    pub active: bool,
    pub cache_key: String,
}

record!(Account {
    id,
    display_name => "name",
    balance,
    active,
    cache_key => ignore,
});

/// Builds a session over `executor` that records its diagnostics in memory.
pub fn session_with_diagnostics(
    executor: Arc<dyn rowscan::Executor>,
) -> (Session, Arc<MemoryDiagnostics>) {
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let session = Session::new(executor).with_diagnostics(diagnostics.clone());
    (session, diagnostics)
}
