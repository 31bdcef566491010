/*!
  Typed CIL-style instruction emission and decoding for stack-machine
  method bodies.

  The crate has three cooperating parts:

  - [`bytecode`] is the closed instruction table: every modeled mnemonic
    with its exact wire encoding, plus binary encode/decode and a
    disassembly listing. Encoding and decoding are mutual inverses for
    every instruction in the table.
  - [`Scope`] is a chain-linked symbol table binding variable names to
    local slot indices, with shadowing across levels and lookup fallback
    to ancestors.
  - [`compiler`] holds the expression and statement trees, a fluent
    [`StatementBuilder`], and the compiler that lowers a tree to an
    instruction sequence with branch labels resolved to byte offsets.

  Turning a finished sequence into something callable is the host's
  business; this crate stops at the instruction list and its bytes.

  ```
  use ilgen::{bytecode, compile, Expression, LocalType, Statement};

  let body = Statement::builder()
    .declare("a", LocalType::Int)
    .declare("b", LocalType::Int)
    .assign("a", Expression::int(40))
    .assign("b", Expression::int(2))
    .ret(Expression::add(Expression::var("a"), Expression::var("b")))
    .build();

  let instructions = compile(&body)?;
  let bytes = bytecode::encode(&instructions);
  assert_eq!(bytecode::decode(&bytes)?, instructions);
  # Ok::<(), ilgen::Error>(())
  ```
*/

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prettytable;

pub mod bytecode;
pub mod compiler;
mod error;
mod scope;

pub use compiler::{
  compile, AssignTarget, BinaryOp, Compiler, Expression, Label, LocalType, Statement,
  StatementBuilder,
};
pub use error::{Error, Result};
pub use scope::Scope;
