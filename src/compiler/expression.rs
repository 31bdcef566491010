/*!
  The expression tree. An expression compiles to an instruction sequence
  that leaves the expression's value on top of the evaluation stack.
  Expressions are immutable trees: each node exclusively owns its
  children, and nothing is shared.
*/

use string_cache::DefaultAtom;

use crate::bytecode::Opcode;

/// The binary operators of the expression language. Each maps to exactly
/// one zero-operand instruction.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  And,
  Or,
  Lt,
  Gt,
  Eq,
}

impl BinaryOp {
  /// The instruction performing this operation on the two topmost stack
  /// values.
  pub fn opcode(self) -> Opcode {
    match self {
      BinaryOp::Add => Opcode::Add,
      BinaryOp::Sub => Opcode::Sub,
      BinaryOp::Mul => Opcode::Mul,
      BinaryOp::Div => Opcode::Div,
      BinaryOp::Rem => Opcode::Rem,
      BinaryOp::And => Opcode::And,
      BinaryOp::Or => Opcode::Or,
      BinaryOp::Lt => Opcode::Clt,
      BinaryOp::Gt => Opcode::Cgt,
      BinaryOp::Eq => Opcode::Ceq,
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
  /// A 32-bit integer literal.
  Int(i32),
  /// A boolean literal; lowers to the integer 0 or 1.
  Bool(bool),
  /// A named local variable, resolved through the scope chain.
  Var(DefaultAtom),
  /// An argument slot, addressed by position rather than by name.
  Arg(u16),
  /// A binary operation over two subexpressions. The left operand is
  /// evaluated first; the ordering is a contract.
  Binary {
    op: BinaryOp,
    left: Box<Expression>,
    right: Box<Expression>,
  },
}

/// Names of the form `@N` denote argument slot `N` rather than a local.
pub(crate) fn argument_slot(name: &str) -> Option<u16> {
  if name.len() > 1 && name.starts_with('@') {
    name[1..].parse::<u16>().ok()
  } else {
    None
  }
}

/// Constructors in the shape of the statement builder's fluent API.
impl Expression {
  pub fn int(value: i32) -> Expression {
    Expression::Int(value)
  }

  pub fn boolean(value: bool) -> Expression {
    Expression::Bool(value)
  }

  pub fn truth() -> Expression {
    Expression::Bool(true)
  }

  pub fn falsehood() -> Expression {
    Expression::Bool(false)
  }

  /// A variable reference. `@N` names denote argument slot `N`.
  pub fn var(name: &str) -> Expression {
    match argument_slot(name) {
      Some(index) => Expression::Arg(index),
      None => Expression::Var(DefaultAtom::from(name)),
    }
  }

  pub fn arg(index: u16) -> Expression {
    Expression::Arg(index)
  }

  fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
      op,
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn add(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Add, left, right)
  }

  pub fn sub(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Sub, left, right)
  }

  pub fn mul(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Mul, left, right)
  }

  pub fn div(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Div, left, right)
  }

  pub fn rem(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Rem, left, right)
  }

  pub fn and(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::And, left, right)
  }

  pub fn or(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Or, left, right)
  }

  pub fn lt(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Lt, left, right)
  }

  pub fn gt(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Gt, left, right)
  }

  pub fn eq(left: Expression, right: Expression) -> Expression {
    Expression::binary(BinaryOp::Eq, left, right)
  }
}
