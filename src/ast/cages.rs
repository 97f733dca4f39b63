use serde::{Deserialize, Serialize};

use crate::ast::{Condition, LogicalOp, SortOrder};

/// What a cage contributes to the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CageKind {
    /// Predicate group
    Filter,
    /// ORDER BY on the first condition's column
    Sort(SortOrder),
    Limit(usize),
    Offset(usize),
}

/// A bracketed group of conditions.
///
/// Filter cages are AND-ed with each other; conditions inside one cage are
/// joined with the cage's `logical_op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cage {
    pub kind: CageKind,
    pub conditions: Vec<Condition>,
    pub logical_op: LogicalOp,
}

impl Cage {
    pub fn filter(condition: Condition) -> Self {
        Self {
            kind: CageKind::Filter,
            conditions: vec![condition],
            logical_op: LogicalOp::And,
        }
    }

    pub fn or_group() -> Self {
        Self {
            kind: CageKind::Filter,
            conditions: vec![],
            logical_op: LogicalOp::Or,
        }
    }

    pub fn is_or_group(&self) -> bool {
        self.kind == CageKind::Filter && self.logical_op == LogicalOp::Or
    }
}
