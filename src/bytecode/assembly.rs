/*!
  The human readable textual form of bytecode is called assembly. The
  `Display` impls on [`Opcode`](super::Opcode) and
  [`Instruction`](super::Instruction) (via the `strum` derives) produce one
  line of assembly per instruction; this module renders whole sequences as a
  disassembly listing with byte offsets and raw encodings.
*/

use prettytable::{format as TableFormat, Table};

use super::binary::encode_instruction;
use super::instruction::Instruction;

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Builds a disassembly listing: one row per instruction with its byte
/// offset, raw encoding, and assembly text.
pub fn listing(instructions: &[Instruction]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Offset", ubl->"Bytes", ubl->"Instruction"]);

  let mut offset = 0usize;
  for instruction in instructions {
    let mut bytes = Vec::with_capacity(instruction.byte_len());
    encode_instruction(instruction, &mut bytes);
    let raw = bytes
      .iter()
      .map(|byte| format!("{:02X}", byte))
      .collect::<Vec<String>>()
      .join(" ");

    table.add_row(row![
      r->format!("IL_{:04X}", offset),
      raw,
      format!("{}", instruction)
    ]);
    offset += bytes.len();
  }

  table
}

/// The listing as a plain string, for logs and error reports.
pub fn disassemble(instructions: &[Instruction]) -> String {
  listing(instructions).to_string()
}
