//! Statement interceptor.
//!
//! The [`Interceptor`] sits between a driver connection and the binding
//! layer. It owns one [`Session`], prepares one executor per statement text
//! and keeps the session's transaction in step with the connection:
//!
//! - autocommit on: every routed statement runs in its own transaction
//! - autocommit off: the first routed statement opens a transaction that
//!   stays open until `commit`, `rollback`, or autocommit is switched back on
//!
//! # Usage
//!
//! ```ignore
//! let mut interceptor = Interceptor::new(&factory);
//! let facts = StatementFacts::select("employee", &["name"]).with_where(..);
//! match interceptor.execute("SELECT name FROM employee WHERE id = ?", &facts, &[Value::Int(1)])? {
//!     Some(result) => { /* routed */ }
//!     None => { /* run the statement the ordinary way */ }
//! }
//! ```

use clusterbind_core::{Result, Value};
use clusterbind_engine::{Session, SessionFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::executor::{build_executor, Executor};
use crate::facts::StatementFacts;
use crate::output::ExecutorResult;

struct Prepared {
    table: String,
    executor: Arc<dyn Executor>,
}

/// Routes statements of one connection through a session
pub struct Interceptor {
    session: Session,
    autocommit: bool,
    prepared: HashMap<String, Prepared>,
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("session", &self.session)
            .field("autocommit", &self.autocommit)
            .field("prepared", &self.prepared.len())
            .finish()
    }
}

impl Interceptor {
    /// Interceptor with a fresh session; autocommit as configured
    pub fn new(factory: &Arc<SessionFactory>) -> Self {
        Self {
            autocommit: factory.config().autocommit,
            session: factory.open_session(),
            prepared: HashMap::new(),
        }
    }

    /// The session statements run in
    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Whether autocommit is on
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Switch autocommit; switching it on commits an open transaction
    pub fn set_autocommit(&mut self, autocommit: bool) -> Result<()> {
        if autocommit && !self.autocommit && self.session.is_active() {
            self.session.commit()?;
        }
        debug!(target: "clusterbind::sql", autocommit, "Autocommit changed");
        self.autocommit = autocommit;
        Ok(())
    }

    /// Commit the open transaction, if any
    pub fn commit(&mut self) -> Result<()> {
        if self.session.is_active() {
            self.session.commit()?;
        }
        Ok(())
    }

    /// Roll back the open transaction, if any
    pub fn rollback(&mut self) -> Result<()> {
        if self.session.is_active() {
            self.session.rollback()?;
        }
        Ok(())
    }

    /// Executor for a statement text, built on first use
    pub fn prepare(&mut self, sql: &str, facts: &StatementFacts) -> Arc<dyn Executor> {
        if let Some(prepared) = self.prepared.get(sql) {
            return Arc::clone(&prepared.executor);
        }
        let executor = build_executor(self.session.factory(), facts);
        self.prepared.insert(
            sql.to_string(),
            Prepared {
                table: facts.table.clone(),
                executor: Arc::clone(&executor),
            },
        );
        executor
    }

    /// Run a statement; `Ok(None)` means fall back
    pub fn execute(&mut self, sql: &str, facts: &StatementFacts, bindings: &[Value]) -> Result<Option<ExecutorResult>> {
        let executor = self.prepare(sql, facts);
        if !executor.is_routed() {
            return executor.execute(&mut self.session, bindings);
        }
        self.begin_if_needed()?;
        executor.execute(&mut self.session, bindings)
    }

    /// Run a statement once per parameter set; `Ok(None)` means fall back
    pub fn execute_batch(
        &mut self,
        sql: &str,
        facts: &StatementFacts,
        parameter_sets: Vec<Vec<Value>>,
    ) -> Result<Option<ExecutorResult>> {
        let executor = self.prepare(sql, facts);
        if !executor.is_routed() {
            return Ok(None);
        }
        self.begin_if_needed()?;
        executor.execute_batch(&mut self.session, parameter_sets)
    }

    /// Forget prepared statements on a table and its cached handler,
    /// after the table's definition changed
    pub fn invalidate_table(&mut self, table: &str) {
        self.prepared.retain(|_, p| p.table != table);
        self.session.factory().invalidate(table);
        info!(target: "clusterbind::sql", table, "Prepared statements invalidated");
    }

    /// Number of prepared statements
    pub fn prepared_count(&self) -> usize {
        self.prepared.len()
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.autocommit && !self.session.is_active() {
            self.session.begin()?;
        }
        Ok(())
    }
}
