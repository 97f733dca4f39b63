//! Engine-neutral query AST.
//!
//! A [`QueryCmd`] is what filters build and what backends execute. Relational
//! backends transpile it to SQL, the document backend evaluates it directly.

pub mod cages;
pub mod cmd;
pub mod conditions;
pub mod operators;
pub mod values;

pub use self::cages::{Cage, CageKind};
pub use self::cmd::QueryCmd;
pub use self::conditions::Condition;
pub use self::operators::{LogicalOp, Operator, SortOrder};
pub use self::values::Value;
