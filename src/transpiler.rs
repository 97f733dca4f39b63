//! SQL Transpiler for the query AST.
//!
//! Converts [`QueryCmd`]s into executable SQL strings for the relational
//! backend, including the `COUNT(*)` projection the pager counts with.

use crate::ast::*;

/// Largest LIMIT / OFFSET both engines accept (a signed 64-bit integer).
const MAX_BOUND: usize = i64::MAX as usize;

/// Plain column names, optionally dotted: `name`, `author.name`.
pub fn is_identifier(column: &str) -> bool {
    !column.is_empty()
        && column.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    SQLite,
}

impl Dialect {
    /// Guess the dialect from a connection URL.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite:") {
            Dialect::SQLite
        } else {
            Dialect::Postgres
        }
    }

    fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::SQLite => format!("?{}", n),
        }
    }
}

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Convert this node to a Postgres SQL string.
    fn to_sql(&self) -> String {
        self.to_sql_with_dialect(Dialect::Postgres)
    }

    /// Convert this node to SQL for the given dialect.
    fn to_sql_with_dialect(&self, dialect: Dialect) -> String;
}

impl ToSql for QueryCmd {
    fn to_sql_with_dialect(&self, dialect: Dialect) -> String {
        self.to_select_sql(dialect)
    }
}

impl QueryCmd {
    /// Generate the `SELECT COUNT(*)` form: predicates only, no sort or bounds.
    pub fn to_count_sql(&self, dialect: Dialect) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        push_where(&mut sql, self, dialect);
        sql
    }

    /// Generate SELECT SQL.
    fn to_select_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::from("SELECT ");

        // Columns
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        push_where(&mut sql, self, dialect);

        let mut order_by: Option<String> = None;
        let mut limit: Option<usize> = None;
        let mut offset: Option<usize> = None;

        for cage in &self.cages {
            match &cage.kind {
                CageKind::Sort(order) => match cage.conditions.first() {
                    Some(cond) if is_identifier(&cond.column) => {
                        order_by = Some(format!("{} {}", cond.column, order.as_sql()));
                    }
                    Some(cond) => tracing::warn!("Not sorting on '{}': not a column name", cond.column),
                    None => {}
                },
                CageKind::Limit(n) => limit = Some(*n),
                CageKind::Offset(n) => offset = Some(*n),
                CageKind::Filter => {}
            }
        }

        // ORDER BY
        if let Some(order) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        // LIMIT; SQLite only accepts OFFSET after a LIMIT
        match (limit, offset, dialect) {
            (Some(n), _, _) => sql.push_str(&format!(" LIMIT {}", n.min(MAX_BOUND))),
            (None, Some(_), Dialect::SQLite) => sql.push_str(" LIMIT -1"),
            _ => {}
        }

        // OFFSET
        if let Some(n) = offset {
            sql.push_str(&format!(" OFFSET {}", n.min(MAX_BOUND)));
        }

        sql
    }
}

/// WHERE - each cage group is joined with AND.
fn push_where(sql: &mut String, cmd: &QueryCmd, dialect: Dialect) {
    let mut where_groups: Vec<String> = Vec::new();

    for cage in cmd.filters() {
        let joiner = match cage.logical_op {
            LogicalOp::And => " AND ",
            LogicalOp::Or => " OR ",
        };
        let conditions: Vec<String> = cage
            .conditions
            .iter()
            .map(|c| condition_sql(c, dialect))
            .collect();
        let group = conditions.join(joiner);
        // Wrap OR groups in parentheses for correct precedence
        if cage.logical_op == LogicalOp::Or && cage.conditions.len() > 1 {
            where_groups.push(format!("({})", group));
        } else {
            where_groups.push(group);
        }
    }

    if !where_groups.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_groups.join(" AND "));
    }
}

fn value_sql(value: &Value, dialect: Dialect) -> String {
    match value {
        Value::Param(n) => dialect.placeholder(*n),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| value_sql(v, dialect)).collect();
            format!("({})", parts.join(", "))
        }
        v => v.to_string(),
    }
}

/// Pattern matching flavour of a string operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    /// `%` and `_` wildcards, `\` escapes
    Like,
    /// `*` and `?` wildcards, bracket classes quote
    Glob,
}

impl Pattern {
    fn wildcard(self) -> &'static str {
        match self {
            Pattern::Like => "%",
            Pattern::Glob => "*",
        }
    }

    /// SQL expression matching the parameter's text literally.
    fn escape_sql(self, expr: &str) -> String {
        match self {
            Pattern::Like => format!(
                r"replace(replace(replace({}, '\', '\\'), '%', '\%'), '_', '\_')",
                expr
            ),
            Pattern::Glob => format!(
                "replace(replace(replace({}, '[', '[[]'), '*', '[*]'), '?', '[?]')",
                expr
            ),
        }
    }

    fn escape_text(self, text: &str) -> String {
        match self {
            Pattern::Like => text
                .replace('\\', r"\\")
                .replace('%', r"\%")
                .replace('_', r"\_"),
            Pattern::Glob => text
                .replace('[', "[[]")
                .replace('*', "[*]")
                .replace('?', "[?]"),
        }
    }

    fn escape_clause(self) -> &'static str {
        match self {
            Pattern::Like => r" ESCAPE '\'",
            Pattern::Glob => "",
        }
    }
}

/// Build a LIKE/GLOB pattern expression around a value, wildcards in the
/// value itself matching literally.
fn pattern_sql(value: &Value, dialect: Dialect, pattern: Pattern, lead: bool, trail: bool) -> String {
    let wildcard = pattern.wildcard();
    match value {
        Value::Param(_) => {
            let mut parts = Vec::with_capacity(3);
            if lead {
                parts.push(format!("'{}'", wildcard));
            }
            parts.push(pattern.escape_sql(&value_sql(value, dialect)));
            if trail {
                parts.push(format!("'{}'", wildcard));
            }
            parts.join(" || ")
        }
        v => {
            let text = pattern
                .escape_text(&v.as_text().unwrap_or_default())
                .replace('\'', "''");
            format!(
                "'{}{}{}'",
                if lead { wildcard } else { "" },
                text,
                if trail { wildcard } else { "" }
            )
        }
    }
}

/// Convert condition to SQL string.
fn condition_sql(cond: &Condition, dialect: Dialect) -> String {
    let column = &cond.column;
    let value = || value_sql(&cond.value, dialect);

    match cond.op {
        Operator::Eq => format!("{} = {}", column, value()),
        Operator::Ne => format!("{} != {}", column, value()),
        Operator::Gt => format!("{} > {}", column, value()),
        Operator::Gte => format!("{} >= {}", column, value()),
        Operator::Lt => format!("{} < {}", column, value()),
        Operator::Lte => format!("{} <= {}", column, value()),
        Operator::Contains | Operator::NotContains | Operator::StartsWith | Operator::EndsWith => {
            let (keyword, pattern) = match (dialect, cond.case_sensitive) {
                (Dialect::Postgres, true) => ("LIKE", Pattern::Like),
                (Dialect::Postgres, false) => ("ILIKE", Pattern::Like),
                // SQLite LIKE ignores ASCII case, GLOB does not
                (Dialect::SQLite, true) => ("GLOB", Pattern::Glob),
                (Dialect::SQLite, false) => ("LIKE", Pattern::Like),
            };
            let (lead, trail) = match cond.op {
                Operator::StartsWith => (false, true),
                Operator::EndsWith => (true, false),
                _ => (true, true),
            };
            let negate = if cond.op == Operator::NotContains { "NOT " } else { "" };
            format!(
                "{} {}{} {}{}",
                column,
                negate,
                keyword,
                pattern_sql(&cond.value, dialect, pattern, lead, trail),
                pattern.escape_clause()
            )
        }
        Operator::In | Operator::NotIn => {
            let empty = matches!(&cond.value, Value::Array(items) if items.is_empty());
            match (cond.op, empty) {
                (Operator::In, true) => "1 = 0".to_string(),
                (_, true) => "1 = 1".to_string(),
                (Operator::In, false) => format!("{} IN {}", column, value()),
                _ => format!("{} NOT IN {}", column, value()),
            }
        }
        Operator::IsNull => format!("{} IS NULL", column),
        Operator::IsNotNull => format!("{} IS NOT NULL", column),
    }
}
