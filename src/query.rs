//! The storage-engine seam and the query proxy the pipeline works on.

use serde_json::Map;

use crate::ast::{Condition, QueryCmd, SortOrder, Value};
use crate::error::GridResult;
use crate::transpiler::{Dialect, ToSql};

/// One fetched row or document.
pub type Record = Map<String, serde_json::Value>;

/// Shape of the rows returned by [`ProxyQuery::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hydration {
    /// JSON objects keyed by column.
    #[default]
    Object,
    /// JSON arrays of values in projected-column order.
    Array,
}

/// A storage engine able to run [`QueryCmd`]s.
pub trait Backend: Clone + std::fmt::Debug {
    /// Run the command with its bounds and sort.
    fn fetch(&self, cmd: &QueryCmd, params: &[Value]) -> GridResult<Vec<Record>>;

    /// Number of rows matching the command's predicates.
    fn count(&self, cmd: &QueryCmd, params: &[Value]) -> GridResult<usize>;

    /// SQL-specific capabilities, when the engine is relational.
    fn as_relational(&self) -> Option<&dyn Relational> {
        None
    }
}

/// Capabilities only relational engines have.
pub trait Relational {
    fn dialect(&self) -> Dialect;

    fn render(&self, cmd: &QueryCmd) -> String {
        cmd.to_sql_with_dialect(self.dialect())
    }

    fn render_count(&self, cmd: &QueryCmd) -> String {
        cmd.to_count_sql(self.dialect())
    }
}

/// The narrow surface filters see while applying themselves.
pub trait FilterQuery {
    /// AND a condition onto the query.
    fn and_where(&mut self, condition: Condition);

    /// Add a condition to the query's OR group.
    fn or_where(&mut self, condition: Condition);

    /// Bind a parameter, returning the placeholder to use in a condition.
    fn bind(&mut self, value: Value) -> Value;
}

/// A [`QueryCmd`] plus the backend that runs it.
///
/// Sorting is stored and only applied at execution, bounds are written
/// straight into the command.
#[derive(Debug, Clone)]
pub struct ProxyQuery<B> {
    backend: B,
    cmd: QueryCmd,
    params: Vec<Value>,
    sort_by: Option<String>,
    sort_order: SortOrder,
}

impl<B: Backend> ProxyQuery<B> {
    pub fn new(backend: B, cmd: QueryCmd) -> Self {
        Self {
            backend,
            cmd,
            params: Vec::new(),
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The wrapped command, without the pending sort.
    pub fn cmd(&self) -> &QueryCmd {
        &self.cmd
    }

    pub fn parameters(&self) -> &[Value] {
        &self.params
    }

    pub fn set_sort_by(&mut self, field: Option<String>) {
        self.sort_by = field;
    }

    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// `0` clears the offset.
    pub fn set_first_result(&mut self, offset: usize) {
        self.cmd.set_offset(offset);
    }

    pub fn first_result(&self) -> usize {
        self.cmd.offset().unwrap_or(0)
    }

    /// `0` means unbounded.
    pub fn set_max_results(&mut self, limit: usize) {
        self.cmd.set_limit(limit);
    }

    pub fn max_results(&self) -> usize {
        self.cmd.limit().unwrap_or(0)
    }

    /// The command as it will actually run, sort included.
    pub fn final_cmd(&self) -> QueryCmd {
        let mut cmd = self.cmd.clone();
        if let Some(field) = &self.sort_by {
            cmd.set_sort(field.clone(), self.sort_order);
        }
        cmd
    }

    /// Execute against the backend.
    ///
    /// Works on a copy of the command, so calling it repeatedly never stacks
    /// sort state.
    pub fn execute(&self, hydration: Hydration) -> GridResult<Vec<serde_json::Value>> {
        let cmd = self.final_cmd();
        tracing::debug!("Executing query on '{}' ({} params)", cmd.table, self.params.len());
        let records = self.backend.fetch(&cmd, &self.params)?;
        Ok(records
            .into_iter()
            .map(|record| hydrate(record, &cmd.columns, hydration))
            .collect())
    }

    /// Count the rows matching the predicates, ignoring sort and bounds.
    pub fn count(&self) -> GridResult<usize> {
        self.backend.count(&self.cmd.predicates_only(), &self.params)
    }

    /// Rendered SQL, for relational backends.
    pub fn sql(&self) -> Option<String> {
        self.backend
            .as_relational()
            .map(|relational| relational.render(&self.final_cmd()))
    }
}

impl<B: Backend> FilterQuery for ProxyQuery<B> {
    fn and_where(&mut self, condition: Condition) {
        tracing::debug!("AND {}", condition);
        self.cmd.push_and(condition);
    }

    fn or_where(&mut self, condition: Condition) {
        tracing::debug!("OR {}", condition);
        self.cmd.push_or(condition);
    }

    fn bind(&mut self, value: Value) -> Value {
        self.params.push(value);
        Value::Param(self.params.len())
    }
}

fn hydrate(record: Record, columns: &[String], hydration: Hydration) -> serde_json::Value {
    match hydration {
        Hydration::Object => serde_json::Value::Object(record),
        Hydration::Array if columns.is_empty() => {
            serde_json::Value::Array(record.into_iter().map(|(_, v)| v).collect())
        }
        Hydration::Array => serde_json::Value::Array(
            columns
                .iter()
                .map(|c| record.get(c).cloned().unwrap_or(serde_json::Value::Null))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::conditions::eq;
    use crate::memory::MemoryBackend;
    use serde_json::json;

    fn users() -> ProxyQuery<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.insert_many(
            "users",
            vec![
                json!({"id": 1, "name": "carol"}),
                json!({"id": 2, "name": "alice"}),
                json!({"id": 3, "name": "bob"}),
            ],
        );
        ProxyQuery::new(backend, QueryCmd::get("users"))
    }

    #[test]
    fn test_execute_is_idempotent() {
        let mut query = users();
        query.set_sort_by(Some("name".into()));
        query.set_sort_order(SortOrder::Desc);

        let first = query.execute(Hydration::Object).unwrap();
        let second = query.execute(Hydration::Object).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0]["name"], "carol");
        assert_eq!(query.cmd().sort(), None);
    }

    #[test]
    fn test_bounds_are_eager() {
        let mut query = users();
        query.set_first_result(1);
        query.set_max_results(1);
        assert_eq!(query.cmd().offset(), Some(1));
        assert_eq!(query.max_results(), 1);
        assert_eq!(query.execute(Hydration::Object).unwrap().len(), 1);
        assert_eq!(query.count().unwrap(), 3);
    }

    #[test]
    fn test_bind_allocates_positions() {
        let mut query = users();
        let p = query.bind(Value::from("bob"));
        assert_eq!(p, Value::Param(1));
        query.and_where(eq("name", p));
        let rows = query.execute(Hydration::Object).unwrap();
        assert_eq!(rows, vec![json!({"id": 3, "name": "bob"})]);
    }

    #[test]
    fn test_array_hydration_follows_columns() {
        let mut query = users();
        query.cmd = query.cmd.clone().columns(["name", "id"]);
        query.set_sort_by(Some("id".into()));
        let rows = query.execute(Hydration::Array).unwrap();
        assert_eq!(rows[0], json!(["carol", 1]));
    }

    #[test]
    fn test_memory_backend_has_no_sql() {
        assert_eq!(users().sql(), None);
    }
}
