/*!
  The statement tree and its fluent builder. A statement compiles to an
  instruction sequence with no net stack effect (`return` aside); blocks
  introduce a fresh scope level, so declarations inside a block are
  invisible to siblings and ancestors.
*/

use string_cache::DefaultAtom;

use super::expression::{argument_slot, Expression};

/// The semantic type of a declared local. Declaration metadata only: the
/// compiler does not type-check expressions against it.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum LocalType {
  Int,
  Long,
  Float,
  Double,
  Bool,
}

/// The destination of an assignment: a named local or an argument slot.
#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
  Local(DefaultAtom),
  Arg(u16),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
  /// Binds a fresh local slot to `name` in the enclosing scope. Emits no
  /// instructions; slot allocation is a compile-time side effect.
  Declare { name: DefaultAtom, ty: LocalType },
  /// Evaluates `value` and stores it into `target`.
  Assign { target: AssignTarget, value: Expression },
  /// An ordered sequence of statements sharing one new scope level.
  Block(Vec<Statement>),
  /// Single- or two-armed conditional.
  If {
    condition: Expression,
    then: Box<Statement>,
    otherwise: Option<Box<Statement>>,
  },
  /// Pre-tested loop: the condition runs before every iteration,
  /// including the first.
  While {
    condition: Expression,
    body: Box<Statement>,
  },
  /// Evaluates the expression and returns it to the caller.
  Return(Expression),
}

impl Statement {
  pub fn declare(name: &str, ty: LocalType) -> Statement {
    Statement::Declare { name: DefaultAtom::from(name), ty }
  }

  /// An assignment to a named local. `@N` names denote argument slot `N`.
  pub fn assign(name: &str, value: Expression) -> Statement {
    let target = match argument_slot(name) {
      Some(index) => AssignTarget::Arg(index),
      None => AssignTarget::Local(DefaultAtom::from(name)),
    };
    Statement::Assign { target, value }
  }

  /// An assignment to an argument slot.
  pub fn assign_arg(index: u16, value: Expression) -> Statement {
    Statement::Assign { target: AssignTarget::Arg(index), value }
  }

  pub fn block(statements: Vec<Statement>) -> Statement {
    Statement::Block(statements)
  }

  pub fn if_then(condition: Expression, then: Statement) -> Statement {
    Statement::If {
      condition,
      then: Box::new(then),
      otherwise: None,
    }
  }

  pub fn if_else(condition: Expression, then: Statement, otherwise: Statement) -> Statement {
    Statement::If {
      condition,
      then: Box::new(then),
      otherwise: Some(Box::new(otherwise)),
    }
  }

  pub fn while_loop(condition: Expression, body: Statement) -> Statement {
    Statement::While {
      condition,
      body: Box::new(body),
    }
  }

  pub fn ret(value: Expression) -> Statement {
    Statement::Return(value)
  }

  /// A builder for block statements.
  pub fn builder() -> StatementBuilder {
    StatementBuilder::new()
  }
}

/**
  A helper for constructing block statements fluently:

  ```
  use ilgen::{Expression, LocalType, Statement};

  let body = Statement::builder()
    .declare("a", LocalType::Int)
    .assign("a", Expression::int(40))
    .ret(Expression::add(Expression::var("a"), Expression::int(2)))
    .build();
  ```
*/
#[derive(Default)]
pub struct StatementBuilder {
  statements: Vec<Statement>,
}

impl StatementBuilder {
  pub fn new() -> StatementBuilder {
    StatementBuilder { statements: Vec::new() }
  }

  /// Appends a statement.
  pub fn push(mut self, statement: Statement) -> StatementBuilder {
    self.statements.push(statement);
    self
  }

  pub fn declare(self, name: &str, ty: LocalType) -> StatementBuilder {
    self.push(Statement::declare(name, ty))
  }

  pub fn assign(self, name: &str, value: Expression) -> StatementBuilder {
    self.push(Statement::assign(name, value))
  }

  pub fn assign_arg(self, index: u16, value: Expression) -> StatementBuilder {
    self.push(Statement::assign_arg(index, value))
  }

  pub fn if_then(self, condition: Expression, then: Statement) -> StatementBuilder {
    self.push(Statement::if_then(condition, then))
  }

  pub fn if_else(
      self,
      condition: Expression,
      then: Statement,
      otherwise: Statement,
    ) -> StatementBuilder
  {
    self.push(Statement::if_else(condition, then, otherwise))
  }

  pub fn while_loop(self, condition: Expression, body: Statement) -> StatementBuilder {
    self.push(Statement::while_loop(condition, body))
  }

  /// Appends a nested block built by `action` on a fresh builder.
  pub fn block<F>(self, action: F) -> StatementBuilder
  where
    F: FnOnce(StatementBuilder) -> StatementBuilder,
  {
    let nested = action(StatementBuilder::new());
    self.push(nested.build())
  }

  pub fn ret(self, value: Expression) -> StatementBuilder {
    self.push(Statement::ret(value))
  }

  /// Turns the builder into a block statement.
  pub fn build(self) -> Statement {
    Statement::Block(self.statements)
  }
}
