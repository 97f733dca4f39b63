use serde::{Deserialize, Serialize};

use crate::ast::conditions::eq;
use crate::ast::{Cage, CageKind, Condition, Operator, SortOrder, Value};

/// A read command against one table or collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryCmd {
    /// Target table / collection
    pub table: String,
    /// Projected columns, empty meaning all
    #[serde(default)]
    pub columns: Vec<String>,
    /// Cages (filters, sorts, limits, offsets)
    #[serde(default)]
    pub cages: Vec<Cage>,
}

impl QueryCmd {
    /// Create a new command for the given table.
    pub fn get(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            cages: vec![],
        }
    }

    /// Builder: project the given columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: add an AND-ed condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.push_and(condition);
        self
    }

    /// Builder: `column = value`.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(eq(column, value))
    }

    /// Append a condition as its own AND cage.
    pub fn push_and(&mut self, condition: Condition) {
        self.cages.push(Cage::filter(condition));
    }

    /// Append a condition to the command's single OR group.
    ///
    /// The group is created on first use, at that position in the cage list.
    pub fn push_or(&mut self, condition: Condition) {
        match self.cages.iter_mut().find(|c| c.is_or_group()) {
            Some(group) => group.conditions.push(condition),
            None => {
                let mut group = Cage::or_group();
                group.conditions.push(condition);
                self.cages.push(group);
            }
        }
    }

    /// Replace any sort with `column` in the given direction.
    pub fn set_sort(&mut self, column: impl Into<String>, order: SortOrder) {
        self.cages.retain(|c| !matches!(c.kind, CageKind::Sort(_)));
        self.cages.push(Cage {
            kind: CageKind::Sort(order),
            conditions: vec![Condition::new(column, Operator::Eq, Value::Null)],
            logical_op: Default::default(),
        });
    }

    /// Replace the limit; `0` removes it.
    pub fn set_limit(&mut self, limit: usize) {
        self.cages.retain(|c| !matches!(c.kind, CageKind::Limit(_)));
        if limit > 0 {
            self.cages.push(bound(CageKind::Limit(limit)));
        }
    }

    /// Replace the offset; `0` removes it.
    pub fn set_offset(&mut self, offset: usize) {
        self.cages.retain(|c| !matches!(c.kind, CageKind::Offset(_)));
        if offset > 0 {
            self.cages.push(bound(CageKind::Offset(offset)));
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.cages.iter().find_map(|c| match c.kind {
            CageKind::Limit(n) => Some(n),
            _ => None,
        })
    }

    pub fn offset(&self) -> Option<usize> {
        self.cages.iter().find_map(|c| match c.kind {
            CageKind::Offset(n) => Some(n),
            _ => None,
        })
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.cages.iter().find_map(|c| match c.kind {
            CageKind::Sort(order) => c.conditions.first().map(|cond| (cond.column.as_str(), order)),
            _ => None,
        })
    }

    /// Predicate cages only.
    pub fn filters(&self) -> impl Iterator<Item = &Cage> {
        self.cages
            .iter()
            .filter(|c| c.kind == CageKind::Filter && !c.conditions.is_empty())
    }

    /// Copy of this command with limit and offset removed.
    pub fn without_bounds(&self) -> Self {
        let mut cmd = self.clone();
        cmd.cages
            .retain(|c| !matches!(c.kind, CageKind::Limit(_) | CageKind::Offset(_)));
        cmd
    }

    /// Copy of this command reduced to its predicates (what a count needs).
    pub fn predicates_only(&self) -> Self {
        let mut cmd = self.clone();
        cmd.cages.retain(|c| c.kind == CageKind::Filter);
        cmd
    }
}

fn bound(kind: CageKind) -> Cage {
    Cage {
        kind,
        conditions: vec![],
        logical_op: Default::default(),
    }
}
