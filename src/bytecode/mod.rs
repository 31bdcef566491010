/*!

  The wire format of the instruction set. An instruction is a one-byte
  opcode (or the two-byte sentinel `0xFE` followed by a second selector
  byte for the extended page) followed by a fixed-width operand of 0, 1,
  2, 4, or 8 bytes, always little-endian regardless of host byte order.
  Branch operands are offsets relative to the position immediately after
  the branch instruction's own bytes.

  One design decision that needed to be made is whether to store the
  operands of each mnemonic as data members of enum variants, with one
  variant per mnemonic. With well over a hundred mnemonics that design
  buries the handful of distinct operand layouts under per-mnemonic
  proliferation, so the split here mirrors the byte stream itself: an
  [`Opcode`] enum carries the mnemonic and wire code (one variant per
  mnemonic, discriminant = encoding), and [`Instruction`] pairs an opcode
  with one of the eight operand shapes.

*/

mod assembly;
mod binary;
mod instruction;
mod opcode;

pub use assembly::{disassemble, listing};
pub use binary::{decode, encode, encode_instruction};
pub use instruction::Instruction;
pub use opcode::{Opcode, OperandKind, EXTENDED_PREFIX};
