use serde::{Deserialize, Serialize};

use crate::ast::{Operator, Value};

/// A single condition within a cage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Column (or document field) the condition tests
    pub column: String,
    /// Comparison operator
    pub op: Operator,
    /// Value to compare against
    pub value: Value,
    /// Only meaningful for the string operators
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

impl Condition {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
            case_sensitive: true,
        }
    }

    /// Same condition, compared without regard to case.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op_str = match self.op {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Contains => "~",
            Operator::NotContains => "!~",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => return write!(f, "{} IS NULL", self.column),
            Operator::IsNotNull => return write!(f, "{} IS NOT NULL", self.column),
        };
        write!(f, "{} {} {}", self.column, op_str, self.value)
    }
}

pub fn eq(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Eq, value)
}

pub fn ne(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Ne, value)
}

pub fn gt(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Gt, value)
}

pub fn gte(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Gte, value)
}

pub fn lt(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Lt, value)
}

pub fn lte(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Lte, value)
}

pub fn contains(column: &str, value: impl Into<Value>) -> Condition {
    Condition::new(column, Operator::Contains, value)
}

pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Condition {
    let arr: Vec<Value> = values.into_iter().map(Into::into).collect();
    Condition::new(column, Operator::In, Value::Array(arr))
}

pub fn is_null(column: &str) -> Condition {
    Condition::new(column, Operator::IsNull, Value::Null)
}

pub fn is_not_null(column: &str) -> Condition {
    Condition::new(column, Operator::IsNotNull, Value::Null)
}
