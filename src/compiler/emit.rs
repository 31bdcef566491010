/*!
  Functions to produce an instruction sequence from a statement tree.

  The compilation pipeline is this:
  ```text
  Statement/Expression trees -> [`Compiler::compile_statement`] -> fragments ->⋯

  ⋯-> [`Compiler::finish`] -> label resolution -> `Vec<Instruction>`
  ```
  Instructions whose operands are known at emission time are stored as
  fixed fragments. A branch to a label is kept symbolic until `finish`,
  when every fragment's byte offset is known: labels bind to offsets, and
  each branch operand becomes the distance from the end of the branch's
  own bytes to its target. Label branches always use the long (32-bit
  offset) branch forms, so every fragment's width is known up front and
  resolution is a single pass.
*/

use std::sync::Arc;

use tracing::debug;

use crate::bytecode::{Instruction, Opcode};
use crate::error::{Error, Result};
use crate::scope::Scope;
use super::statement::{AssignTarget, Statement};
use super::expression::{argument_slot, Expression};

/// A branch target. Labels start unbound and are bound by [`Compiler::mark`]
/// exactly once; encoding waits until every referenced label is bound.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Label(usize);

enum Fragment {
  Fixed(Instruction),
  Branch { opcode: Opcode, target: Label },
}

/// Encoded width of a long-form branch: one opcode byte plus an `i32`.
const BRANCH_LEN: usize = 5;

impl Fragment {
  fn byte_len(&self) -> usize {
    match self {
      Fragment::Fixed(instruction) => instruction.byte_len(),
      Fragment::Branch { .. } => BRANCH_LEN,
    }
  }
}

/// Compiles statement and expression trees into instruction sequences.
///
/// Local slot indices increase monotonically over the life of one
/// compiler and are never reused, even when the block that declared them
/// ends. That forgoes slot reuse for simplicity; the slot space is 16
/// bits deep.
pub struct Compiler {
  code: Vec<Fragment>,
  /// Fragment index each label is bound to, once marked.
  labels: Vec<Option<usize>>,
  next_local: usize,
}

impl Compiler {
  pub fn new() -> Compiler {
    Compiler {
      code: Vec::new(),
      labels: Vec::new(),
      next_local: 0,
    }
  }

  /// Appends one fully formed instruction.
  pub fn emit(&mut self, instruction: Instruction) {
    self.code.push(Fragment::Fixed(instruction));
  }

  /// Appends a long-form branch to a label, bound or not.
  pub fn emit_branch(&mut self, opcode: Opcode, target: Label) {
    self.code.push(Fragment::Branch { opcode, target });
  }

  /// Creates a fresh, unbound label.
  pub fn define_label(&mut self) -> Label {
    self.labels.push(None);
    Label(self.labels.len() - 1)
  }

  /// Binds `label` to the current emission point.
  ///
  /// Panics if the label is already bound; a label transitions from
  /// unbound to bound exactly once.
  pub fn mark(&mut self, label: Label) {
    let slot = &mut self.labels[label.0];
    if slot.is_some() {
      unreachable!("Error: label {:?} was marked twice.", label);
    }
    *slot = Some(self.code.len());
  }

  /// Compiles a statement against `scope`.
  pub fn compile_statement(&mut self, statement: &Statement, scope: &Arc<Scope>) -> Result<()> {
    match statement {

      Statement::Declare { name, .. } => {
        let index = self.next_local;
        self.next_local += 1;
        scope.add(name, index)?;
      }

      Statement::Assign { target, value } => {
        match target {
          // `@N` names address argument slots even when the target was
          // constructed directly rather than through the facade.
          AssignTarget::Local(name) => match argument_slot(name) {
            Some(index) => {
              self.compile_expression(value, scope)?;
              self.emit(store_argument(index));
            }
            None => {
              let index = scope.get(name)?;
              self.compile_expression(value, scope)?;
              self.emit(store_local(index));
            }
          },
          AssignTarget::Arg(index) => {
            self.compile_expression(value, scope)?;
            self.emit(store_argument(*index));
          }
        }
      }

      Statement::Block(children) => {
        let child_scope = scope.create_child();
        for child in children {
          self.compile_statement(child, &child_scope)?;
        }
        // The child scope dies here; its bindings are invisible to
        // siblings, though the slots they occupied are not reclaimed.
      }

      Statement::If { condition, then, otherwise: None } => {
        let end = self.define_label();
        self.compile_expression(condition, scope)?;
        self.emit_branch(Opcode::Brfalse, end);
        self.compile_statement(then, scope)?;
        self.mark(end);
      }

      Statement::If { condition, then, otherwise: Some(otherwise) } => {
        let else_target = self.define_label();
        let end = self.define_label();
        self.compile_expression(condition, scope)?;
        self.emit_branch(Opcode::Brfalse, else_target);
        self.compile_statement(then, scope)?;
        self.emit_branch(Opcode::Br, end);
        self.mark(else_target);
        self.compile_statement(otherwise, scope)?;
        self.mark(end);
      }

      Statement::While { condition, body } => {
        let start = self.define_label();
        let end = self.define_label();
        self.mark(start);
        self.compile_expression(condition, scope)?;
        self.emit_branch(Opcode::Brfalse, end);
        self.compile_statement(body, scope)?;
        self.emit_branch(Opcode::Br, start);
        self.mark(end);
      }

      Statement::Return(value) => {
        self.compile_expression(value, scope)?;
        self.emit(Instruction::Simple(Opcode::Ret));
      }

    }
    Ok(())
  }

  /// Compiles an expression against `scope`. The emitted sequence leaves
  /// the expression's value on top of the evaluation stack.
  pub fn compile_expression(&mut self, expression: &Expression, scope: &Arc<Scope>) -> Result<()> {
    match expression {

      Expression::Int(value) => {
        self.emit(load_constant(*value));
      }

      Expression::Bool(value) => {
        self.emit(load_constant(*value as i32));
      }

      Expression::Var(name) => match argument_slot(name) {
        Some(index) => self.emit(load_argument(index)),
        None => {
          let index = scope.get(name)?;
          self.emit(load_local(index));
        }
      },

      Expression::Arg(index) => {
        self.emit(load_argument(*index));
      }

      Expression::Binary { op, left, right } => {
        // Left before right, always; the ordering is a contract.
        self.compile_expression(left, scope)?;
        self.compile_expression(right, scope)?;
        self.emit(Instruction::Simple(op.opcode()));
      }

    }
    Ok(())
  }

  /**
    Resolves every label and returns the finished instruction sequence.

    Fails with `UnboundLabel` if any branch targets a label that was never
    marked. Branch operands are byte distances relative to the position
    immediately following the branch instruction's own bytes.
  */
  pub fn finish(self) -> Result<Vec<Instruction>> {
    // Byte offset of each fragment, plus the end-of-sequence offset so a
    // label marked after the last instruction still resolves.
    let mut offsets = Vec::with_capacity(self.code.len() + 1);
    let mut position = 0usize;
    for fragment in &self.code {
      offsets.push(position);
      position += fragment.byte_len();
    }
    offsets.push(position);

    let mut instructions = Vec::with_capacity(self.code.len());
    for (index, fragment) in self.code.iter().enumerate() {
      let instruction = match fragment {

        Fragment::Fixed(instruction) => *instruction,

        Fragment::Branch { opcode, target } => {
          let bound = self.labels[target.0]
            .ok_or(Error::UnboundLabel { label: target.0 })?;
          let relative = offsets[bound] as isize - (offsets[index] + BRANCH_LEN) as isize;
          Instruction::Int(*opcode, relative as i32)
        }

      };
      instructions.push(instruction);
    }

    debug!(
      instructions = instructions.len(),
      bytes = position,
      locals = self.next_local,
      "compilation finished"
    );
    Ok(instructions)
  }
}

impl Default for Compiler {
  fn default() -> Compiler {
    Compiler::new()
  }
}

/// Compiles a statement tree against a fresh root scope and resolves all
/// labels, producing the final instruction sequence.
pub fn compile(statement: &Statement) -> Result<Vec<Instruction>> {
  let scope = Scope::new();
  let mut compiler = Compiler::new();
  compiler.compile_statement(statement, &scope)?;
  compiler.finish()
}

/// Smallest encoding that pushes the integer constant `value`.
fn load_constant(value: i32) -> Instruction {
  match value {
    0 => Instruction::Simple(Opcode::LdcI4_0),
    1 => Instruction::Simple(Opcode::LdcI4_1),
    2 => Instruction::Simple(Opcode::LdcI4_2),
    3 => Instruction::Simple(Opcode::LdcI4_3),
    4 => Instruction::Simple(Opcode::LdcI4_4),
    5 => Instruction::Simple(Opcode::LdcI4_5),
    6 => Instruction::Simple(Opcode::LdcI4_6),
    7 => Instruction::Simple(Opcode::LdcI4_7),
    8 => Instruction::Simple(Opcode::LdcI4_8),
    v if v >= -128 && v <= 127 => Instruction::SByte(Opcode::LdcI4S, v as i8),
    _ => Instruction::Int(Opcode::LdcI4, value),
  }
}

/// Smallest encoding that loads local slot `index`.
fn load_local(index: u16) -> Instruction {
  match index {
    0 => Instruction::Simple(Opcode::Ldloc0),
    1 => Instruction::Simple(Opcode::Ldloc1),
    2 => Instruction::Simple(Opcode::Ldloc2),
    3 => Instruction::Simple(Opcode::Ldloc3),
    i if i <= 255 => Instruction::Byte(Opcode::LdlocS, i as u8),
    _ => Instruction::UShort(Opcode::Ldloc, index),
  }
}

/// Smallest encoding that stores into local slot `index`.
fn store_local(index: u16) -> Instruction {
  match index {
    0 => Instruction::Simple(Opcode::Stloc0),
    1 => Instruction::Simple(Opcode::Stloc1),
    2 => Instruction::Simple(Opcode::Stloc2),
    3 => Instruction::Simple(Opcode::Stloc3),
    i if i <= 255 => Instruction::Byte(Opcode::StlocS, i as u8),
    _ => Instruction::UShort(Opcode::Stloc, index),
  }
}

/// Smallest encoding that loads argument slot `index`.
fn load_argument(index: u16) -> Instruction {
  match index {
    0 => Instruction::Simple(Opcode::Ldarg0),
    1 => Instruction::Simple(Opcode::Ldarg1),
    2 => Instruction::Simple(Opcode::Ldarg2),
    3 => Instruction::Simple(Opcode::Ldarg3),
    i if i <= 255 => Instruction::Byte(Opcode::LdargS, i as u8),
    _ => Instruction::UShort(Opcode::Ldarg, index),
  }
}

/// Smallest encoding that stores into argument slot `index`. There are no
/// dedicated forms for slots 0 through 3.
fn store_argument(index: u16) -> Instruction {
  if index <= 255 {
    Instruction::Byte(Opcode::StargS, index as u8)
  } else {
    Instruction::UShort(Opcode::Starg, index)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::compiler::statement::LocalType;

  use super::*;

  #[test]
  fn literal_tiering() {
    assert_eq!(load_constant(0), Instruction::Simple(Opcode::LdcI4_0));
    assert_eq!(load_constant(5), Instruction::Simple(Opcode::LdcI4_5));
    assert_eq!(load_constant(8), Instruction::Simple(Opcode::LdcI4_8));
    // -1 takes the short form; ldc.i4.m1 is decodable but never emitted.
    assert_eq!(load_constant(-1), Instruction::SByte(Opcode::LdcI4S, -1));
    assert_eq!(load_constant(9), Instruction::SByte(Opcode::LdcI4S, 9));
    assert_eq!(load_constant(127), Instruction::SByte(Opcode::LdcI4S, 127));
    assert_eq!(load_constant(-128), Instruction::SByte(Opcode::LdcI4S, -128));
    assert_eq!(load_constant(128), Instruction::Int(Opcode::LdcI4, 128));
    assert_eq!(load_constant(-129), Instruction::Int(Opcode::LdcI4, -129));
    assert_eq!(load_constant(1000), Instruction::Int(Opcode::LdcI4, 1000));
  }

  #[test]
  fn slot_tiering() {
    assert_eq!(load_local(3), Instruction::Simple(Opcode::Ldloc3));
    assert_eq!(load_local(4), Instruction::Byte(Opcode::LdlocS, 4));
    assert_eq!(load_local(255), Instruction::Byte(Opcode::LdlocS, 255));
    assert_eq!(load_local(256), Instruction::UShort(Opcode::Ldloc, 256));
    assert_eq!(store_local(2), Instruction::Simple(Opcode::Stloc2));
    assert_eq!(store_local(300), Instruction::UShort(Opcode::Stloc, 300));
    assert_eq!(load_argument(0), Instruction::Simple(Opcode::Ldarg0));
    assert_eq!(load_argument(4), Instruction::Byte(Opcode::LdargS, 4));
    assert_eq!(load_argument(1000), Instruction::UShort(Opcode::Ldarg, 1000));
    assert_eq!(store_argument(0), Instruction::Byte(Opcode::StargS, 0));
    assert_eq!(store_argument(999), Instruction::UShort(Opcode::Starg, 999));
  }

  #[test]
  fn a_literal_return_compiles_to_the_dedicated_form() {
    let instructions = compile(&Statement::ret(Expression::int(5))).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_5),
        Instruction::Simple(Opcode::Ret),
      ]
    );
  }

  #[test]
  fn a_wide_literal_return_takes_the_full_form() {
    let instructions = compile(&Statement::ret(Expression::int(1000))).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Int(Opcode::LdcI4, 1000),
        Instruction::Simple(Opcode::Ret),
      ]
    );
  }

  #[test]
  fn binary_operands_compile_left_then_right() {
    let instructions =
      compile(&Statement::ret(Expression::sub(Expression::int(7), Expression::int(9)))).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_7),
        Instruction::SByte(Opcode::LdcI4S, 9),
        Instruction::Simple(Opcode::Sub),
        Instruction::Simple(Opcode::Ret),
      ]
    );
  }

  #[test]
  fn booleans_lower_to_integer_constants() {
    let instructions = compile(&Statement::ret(Expression::truth())).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_1),
        Instruction::Simple(Opcode::Ret),
      ]
    );
  }

  #[test]
  fn assignment_resolves_the_declared_slot() {
    let body = Statement::builder()
      .declare("a", LocalType::Int)
      .declare("b", LocalType::Int)
      .assign("b", Expression::int(2))
      .build();
    let instructions = compile(&body).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_2),
        Instruction::Simple(Opcode::Stloc1),
      ]
    );
  }

  #[test]
  fn assignment_to_an_undeclared_variable_fails() {
    let body = Statement::assign("ghost", Expression::int(1));
    assert_eq!(
      compile(&body),
      Err(Error::UnboundVariable { name: "ghost".to_string() })
    );
  }

  #[test]
  fn reading_an_undeclared_variable_fails() {
    let body = Statement::ret(Expression::var("ghost"));
    assert_eq!(
      compile(&body),
      Err(Error::UnboundVariable { name: "ghost".to_string() })
    );
  }

  #[test]
  fn single_armed_if_branches_past_the_then_arm() {
    // if (arg0 < 42) return false; return true
    let body = Statement::builder()
      .if_then(
        Expression::lt(Expression::arg(0), Expression::int(42)),
        Statement::ret(Expression::falsehood()),
      )
      .ret(Expression::truth())
      .build();
    let instructions = compile(&body).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::Ldarg0),          // offset 0
        Instruction::SByte(Opcode::LdcI4S, 42),       // offset 1
        Instruction::Simple(Opcode::Clt),             // offset 3
        Instruction::Int(Opcode::Brfalse, 2),         // offset 5, next 10, target 12
        Instruction::Simple(Opcode::LdcI4_0),         // offset 10
        Instruction::Simple(Opcode::Ret),             // offset 11
        Instruction::Simple(Opcode::LdcI4_1),         // offset 12
        Instruction::Simple(Opcode::Ret),             // offset 13
      ]
    );
  }

  #[test]
  fn two_armed_if_jumps_over_the_else_arm() {
    let body = Statement::builder()
      .declare("x", LocalType::Int)
      .if_else(
        Expression::arg(0),
        Statement::assign("x", Expression::int(1)),
        Statement::assign("x", Expression::int(2)),
      )
      .ret(Expression::var("x"))
      .build();
    let instructions = compile(&body).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::Ldarg0),          // offset 0
        Instruction::Int(Opcode::Brfalse, 7),         // offset 1, next 6, else at 13
        Instruction::Simple(Opcode::LdcI4_1),         // offset 6
        Instruction::Simple(Opcode::Stloc0),          // offset 7
        Instruction::Int(Opcode::Br, 2),              // offset 8, next 13, end at 15
        Instruction::Simple(Opcode::LdcI4_2),         // offset 13
        Instruction::Simple(Opcode::Stloc0),          // offset 14
        Instruction::Simple(Opcode::Ldloc0),          // offset 15
        Instruction::Simple(Opcode::Ret),             // offset 16
      ]
    );
  }

  #[test]
  fn while_loops_test_the_condition_first_and_branch_back() {
    // x := 0; while (arg0 > 0) { x := x + 2; arg0 := arg0 - 1 }; return x
    let body = Statement::builder()
      .declare("x", LocalType::Int)
      .assign("x", Expression::int(0))
      .while_loop(
        Expression::gt(Expression::arg(0), Expression::int(0)),
        Statement::builder()
          .assign("x", Expression::add(Expression::var("x"), Expression::int(2)))
          .assign_arg(0, Expression::sub(Expression::arg(0), Expression::int(1)))
          .build(),
      )
      .ret(Expression::var("x"))
      .build();
    let instructions = compile(&body).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_0),         // offset 0
        Instruction::Simple(Opcode::Stloc0),          // offset 1
        Instruction::Simple(Opcode::Ldarg0),          // offset 2, loop start
        Instruction::Simple(Opcode::LdcI4_0),         // offset 3
        Instruction::Simple(Opcode::Cgt),             // offset 4
        Instruction::Int(Opcode::Brfalse, 14),        // offset 6, next 11, end at 25
        Instruction::Simple(Opcode::Ldloc0),          // offset 11
        Instruction::Simple(Opcode::LdcI4_2),         // offset 12
        Instruction::Simple(Opcode::Add),             // offset 13
        Instruction::Simple(Opcode::Stloc0),          // offset 14
        Instruction::Simple(Opcode::Ldarg0),          // offset 15
        Instruction::Simple(Opcode::LdcI4_1),         // offset 16
        Instruction::Simple(Opcode::Sub),             // offset 17
        Instruction::Byte(Opcode::StargS, 0),         // offset 18
        Instruction::Int(Opcode::Br, -23),            // offset 20, next 25, start at 2
        Instruction::Simple(Opcode::Ldloc0),          // offset 25
        Instruction::Simple(Opcode::Ret),             // offset 26
      ]
    );
  }

  #[test]
  fn block_scopes_shadow_and_expire() {
    // declare x; x := 1; { declare x; x := 2 }; return x
    let body = Statement::builder()
      .declare("x", LocalType::Int)
      .assign("x", Expression::int(1))
      .block(|b| {
        b.declare("x", LocalType::Int)
          .assign("x", Expression::int(2))
      })
      .ret(Expression::var("x"))
      .build();
    let instructions = compile(&body).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::Simple(Opcode::LdcI4_1),
        Instruction::Simple(Opcode::Stloc0),          // outer x = slot 0
        Instruction::Simple(Opcode::LdcI4_2),
        Instruction::Simple(Opcode::Stloc1),          // inner x = slot 1
        Instruction::Simple(Opcode::Ldloc0),          // outer x again
        Instruction::Simple(Opcode::Ret),
      ]
    );
  }

  #[test]
  fn duplicate_declaration_in_one_block_fails() {
    let body = Statement::builder()
      .declare("x", LocalType::Int)
      .declare("x", LocalType::Int)
      .build();
    assert_eq!(
      compile(&body),
      Err(Error::DuplicateBinding { name: "x".to_string() })
    );
  }

  #[test]
  fn a_branch_to_an_unmarked_label_fails_to_finalize() {
    let mut compiler = Compiler::new();
    let nowhere = compiler.define_label();
    compiler.emit_branch(Opcode::Br, nowhere);
    assert_eq!(compiler.finish(), Err(Error::UnboundLabel { label: 0 }));
  }

  #[test]
  #[should_panic(expected = "marked twice")]
  fn marking_a_label_twice_panics() {
    let mut compiler = Compiler::new();
    let label = compiler.define_label();
    compiler.mark(label);
    compiler.mark(label);
  }

  #[test]
  fn a_label_marked_at_the_end_of_the_body_resolves() {
    let mut compiler = Compiler::new();
    let end = compiler.define_label();
    compiler.emit_branch(Opcode::Br, end);
    compiler.mark(end);
    assert_eq!(
      compiler.finish(),
      Ok(vec![Instruction::Int(Opcode::Br, 0)])
    );
  }
}
