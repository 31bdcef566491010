/*!
  This module is responsible for the encoding and decoding of binary
  instructions.

  An encoded instruction is one opcode byte (two for the `0xFE` extended
  page) followed by a fixed-width operand in little-endian byte order. The
  two directions are mutual inverses: decoding the bytes produced by
  encoding any well-formed instruction reproduces an equal instruction, and
  re-encoding a decoded sequence reproduces the input bytes exactly.
*/

use nom::number::complete::{le_f32, le_f64, le_i32, le_i64, le_i8, le_u16, le_u8};
use tracing::trace;

use super::instruction::Instruction;
use super::opcode::{Opcode, OperandKind, EXTENDED_PREFIX};
use crate::error::{Error, Result};

/// Appends the encoding of one instruction to `buffer`.
pub fn encode_instruction(instruction: &Instruction, buffer: &mut Vec<u8>) {
  debug_assert!(
    instruction.shape_matches(),
    "operand shape disagrees with the opcode table for {:?}",
    instruction
  );

  let opcode = instruction.opcode();
  if opcode.is_extended() {
    buffer.push(EXTENDED_PREFIX);
  }
  buffer.push((opcode.code() & 0xFF) as u8);

  match *instruction {
    Instruction::Simple(_) => {}
    Instruction::Byte(_, value) => buffer.push(value),
    Instruction::SByte(_, value) => buffer.push(value as u8),
    Instruction::UShort(_, value) => buffer.extend_from_slice(&value.to_le_bytes()),
    Instruction::Int(_, value) => buffer.extend_from_slice(&value.to_le_bytes()),
    Instruction::Long(_, value) => buffer.extend_from_slice(&value.to_le_bytes()),
    Instruction::Float(_, value) => buffer.extend_from_slice(&value.to_le_bytes()),
    Instruction::Double(_, value) => buffer.extend_from_slice(&value.to_le_bytes()),
  }
}

/// Encodes a whole instruction sequence into one byte stream.
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
  let mut buffer = Vec::with_capacity(instructions.iter().map(Instruction::byte_len).sum());
  for instruction in instructions {
    encode_instruction(instruction, &mut buffer);
  }
  buffer
}

/**
  Decodes a byte stream into the typed instruction sequence it encodes.

  Empty input decodes to the empty sequence. A byte (or `0xFE` byte pair)
  with no table entry fails with [`Error::UnknownOpcode`]; a stream ending
  inside an operand fails with [`Error::TruncatedStream`]. There is no
  partial recovery: the first failure aborts the decode.
*/
pub fn decode(bytes: &[u8]) -> Result<Vec<Instruction>> {
  let mut decoded = Vec::new();
  let mut rest = bytes;

  while !rest.is_empty() {
    let offset = bytes.len() - rest.len();
    let (remaining, instruction) = decode_instruction(rest, offset)?;
    trace!(offset, instruction = %instruction, "decoded");
    decoded.push(instruction);
    rest = remaining;
  }

  Ok(decoded)
}

fn decode_instruction(input: &[u8], offset: usize) -> Result<(&[u8], Instruction)> {
  let (input, first) = read(le_u8, input, offset)?;

  let (input, opcode) = if first == EXTENDED_PREFIX {
    let (input, second) = read(le_u8, input, offset)?;
    match Opcode::from_extended(second) {
      Some(opcode) => (input, opcode),
      None => {
        return Err(Error::UnknownOpcode { byte: first, extended: Some(second), offset });
      }
    }
  } else {
    match Opcode::from_primary(first) {
      Some(opcode) => (input, opcode),
      None => {
        return Err(Error::UnknownOpcode { byte: first, extended: None, offset });
      }
    }
  };

  let (input, instruction) = match opcode.operand_kind() {

    OperandKind::None => (input, Instruction::Simple(opcode)),

    OperandKind::Byte => {
      let (input, value) = read(le_u8, input, offset)?;
      (input, Instruction::Byte(opcode, value))
    }

    OperandKind::SByte => {
      let (input, value) = read(le_i8, input, offset)?;
      (input, Instruction::SByte(opcode, value))
    }

    OperandKind::UShort => {
      let (input, value) = read(le_u16, input, offset)?;
      (input, Instruction::UShort(opcode, value))
    }

    OperandKind::Int => {
      let (input, value) = read(le_i32, input, offset)?;
      (input, Instruction::Int(opcode, value))
    }

    OperandKind::Long => {
      let (input, value) = read(le_i64, input, offset)?;
      (input, Instruction::Long(opcode, value))
    }

    OperandKind::Float => {
      let (input, value) = read(le_f32, input, offset)?;
      (input, Instruction::Float(opcode, value))
    }

    OperandKind::Double => {
      let (input, value) = read(le_f64, input, offset)?;
      (input, Instruction::Double(opcode, value))
    }

  };

  Ok((input, instruction))
}

/// Runs one `nom` number parser, mapping a short read to `TruncatedStream`.
fn read<'a, T>(
    parser: impl Fn(&'a [u8]) -> nom::IResult<&'a [u8], T>,
    input: &'a [u8],
    offset: usize,
  ) -> Result<(&'a [u8], T)>
{
  parser(input).map_err(|_| Error::TruncatedStream { offset })
}
