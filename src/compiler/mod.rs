/*!
  Compilation of expression and statement trees into typed instruction
  sequences. The AST lives in [`expression`] and [`statement`] (with a
  fluent [`StatementBuilder`]); [`emit`] holds the compiler itself,
  including label creation, marking, and offset resolution.
*/

mod emit;
mod expression;
mod statement;

pub use emit::{compile, Compiler, Label};
pub use expression::{BinaryOp, Expression};
pub use statement::{AssignTarget, LocalType, Statement, StatementBuilder};
