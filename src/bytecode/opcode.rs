/*!
  The opcode table of the instruction set.

  Rust stores fieldless enum variants as their discriminant. We give every
  opcode a `u16` discriminant equal to its wire encoding: plain opcodes use
  their single byte value, while opcodes on the extended page use
  `0xFE00 | second_byte` (`0xFE` is the two-byte prefix sentinel on the
  wire). Consequently the enum below *is* the instruction table: the
  discriminants are the hand-verified encoding, `num_enum` converts between
  code and variant in both directions, and `strum` converts between variant
  and mnemonic text. The operand width of each opcode is fixed and is given
  by `Opcode::operand_kind`.

  Mnemonics whose operand is a metadata token (`call`, `ldstr`, `box`, …)
  have no entry here; their encodings are unresolved in this core and the
  decoder rejects their bytes rather than guessing.
*/

use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/// First byte of every opcode on the extended page.
pub const EXTENDED_PREFIX: u8 = 0xFE;

/// The shape of the operand that follows an opcode in the byte stream.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum OperandKind {
  None,
  Byte,
  SByte,
  UShort,
  Int,
  Long,
  Float,
  Double,
}

impl OperandKind {
  /// Width of the encoded operand in bytes.
  pub fn width(self) -> usize {
    match self {
      OperandKind::None => 0,
      OperandKind::Byte | OperandKind::SByte => 1,
      OperandKind::UShort => 2,
      OperandKind::Int | OperandKind::Float => 4,
      OperandKind::Long | OperandKind::Double => 8,
    }
  }
}

/// Opcodes of the instruction set, discriminant = wire encoding.
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[allow(non_camel_case_types)]
#[repr(u16)]
pub enum Opcode {
  // Stack and argument/local traffic //
  #[strum(serialize = "nop")]            Nop         = 0x00,
  #[strum(serialize = "break")]          Break       = 0x01,
  #[strum(serialize = "ldarg.0")]        Ldarg0      = 0x02,
  #[strum(serialize = "ldarg.1")]        Ldarg1      = 0x03,
  #[strum(serialize = "ldarg.2")]        Ldarg2      = 0x04,
  #[strum(serialize = "ldarg.3")]        Ldarg3      = 0x05,
  #[strum(serialize = "ldloc.0")]        Ldloc0      = 0x06,
  #[strum(serialize = "ldloc.1")]        Ldloc1      = 0x07,
  #[strum(serialize = "ldloc.2")]        Ldloc2      = 0x08,
  #[strum(serialize = "ldloc.3")]        Ldloc3      = 0x09,
  #[strum(serialize = "stloc.0")]        Stloc0      = 0x0A,
  #[strum(serialize = "stloc.1")]        Stloc1      = 0x0B,
  #[strum(serialize = "stloc.2")]        Stloc2      = 0x0C,
  #[strum(serialize = "stloc.3")]        Stloc3      = 0x0D,
  #[strum(serialize = "ldarg.s")]        LdargS      = 0x0E,
  #[strum(serialize = "ldarga.s")]       LdargaS     = 0x0F,
  #[strum(serialize = "starg.s")]        StargS      = 0x10,
  #[strum(serialize = "ldloc.s")]        LdlocS      = 0x11,
  #[strum(serialize = "ldloca.s")]       LdlocaS     = 0x12,
  #[strum(serialize = "stloc.s")]        StlocS      = 0x13,

  // Constants //
  #[strum(serialize = "ldnull")]         Ldnull      = 0x14,
  #[strum(serialize = "ldc.i4.m1")]      LdcI4M1     = 0x15,
  #[strum(serialize = "ldc.i4.0")]       LdcI4_0     = 0x16,
  #[strum(serialize = "ldc.i4.1")]       LdcI4_1     = 0x17,
  #[strum(serialize = "ldc.i4.2")]       LdcI4_2     = 0x18,
  #[strum(serialize = "ldc.i4.3")]       LdcI4_3     = 0x19,
  #[strum(serialize = "ldc.i4.4")]       LdcI4_4     = 0x1A,
  #[strum(serialize = "ldc.i4.5")]       LdcI4_5     = 0x1B,
  #[strum(serialize = "ldc.i4.6")]       LdcI4_6     = 0x1C,
  #[strum(serialize = "ldc.i4.7")]       LdcI4_7     = 0x1D,
  #[strum(serialize = "ldc.i4.8")]       LdcI4_8     = 0x1E,
  #[strum(serialize = "ldc.i4.s")]       LdcI4S      = 0x1F,
  #[strum(serialize = "ldc.i4")]         LdcI4       = 0x20,
  #[strum(serialize = "ldc.i8")]         LdcI8       = 0x21,
  #[strum(serialize = "ldc.r4")]         LdcR4       = 0x22,
  #[strum(serialize = "ldc.r8")]         LdcR8       = 0x23,

  #[strum(serialize = "dup")]            Dup         = 0x25,
  #[strum(serialize = "pop")]            Pop         = 0x26,
  #[strum(serialize = "ret")]            Ret         = 0x2A,

  // Branches, short forms //
  #[strum(serialize = "br.s")]           BrS         = 0x2B,
  #[strum(serialize = "brfalse.s")]      BrfalseS    = 0x2C,
  #[strum(serialize = "brtrue.s")]       BrtrueS     = 0x2D,
  #[strum(serialize = "beq.s")]          BeqS        = 0x2E,
  #[strum(serialize = "bge.s")]          BgeS        = 0x2F,
  #[strum(serialize = "bgt.s")]          BgtS        = 0x30,
  #[strum(serialize = "ble.s")]          BleS        = 0x31,
  #[strum(serialize = "blt.s")]          BltS        = 0x32,
  #[strum(serialize = "bne.un.s")]       BneUnS      = 0x33,
  #[strum(serialize = "bge.un.s")]       BgeUnS      = 0x34,
  #[strum(serialize = "bgt.un.s")]       BgtUnS      = 0x35,
  #[strum(serialize = "ble.un.s")]       BleUnS      = 0x36,
  #[strum(serialize = "blt.un.s")]       BltUnS      = 0x37,

  // Branches, long forms //
  #[strum(serialize = "br")]             Br          = 0x38,
  #[strum(serialize = "brfalse")]        Brfalse     = 0x39,
  #[strum(serialize = "brtrue")]         Brtrue      = 0x3A,
  #[strum(serialize = "beq")]            Beq         = 0x3B,
  #[strum(serialize = "bge")]            Bge         = 0x3C,
  #[strum(serialize = "bgt")]            Bgt         = 0x3D,
  #[strum(serialize = "ble")]            Ble         = 0x3E,
  #[strum(serialize = "blt")]            Blt         = 0x3F,
  #[strum(serialize = "bne.un")]         BneUn       = 0x40,
  #[strum(serialize = "bge.un")]         BgeUn       = 0x41,
  #[strum(serialize = "bgt.un")]         BgtUn       = 0x42,
  #[strum(serialize = "ble.un")]         BleUn       = 0x43,
  #[strum(serialize = "blt.un")]         BltUn       = 0x44,

  // Arithmetic and logic //
  #[strum(serialize = "add")]            Add         = 0x58,
  #[strum(serialize = "sub")]            Sub         = 0x59,
  #[strum(serialize = "mul")]            Mul         = 0x5A,
  #[strum(serialize = "div")]            Div         = 0x5B,
  #[strum(serialize = "div.un")]         DivUn       = 0x5C,
  #[strum(serialize = "rem")]            Rem         = 0x5D,
  #[strum(serialize = "rem.un")]         RemUn       = 0x5E,
  #[strum(serialize = "and")]            And         = 0x5F,
  #[strum(serialize = "or")]             Or          = 0x60,
  #[strum(serialize = "xor")]            Xor         = 0x61,
  #[strum(serialize = "shl")]            Shl         = 0x62,
  #[strum(serialize = "shr")]            Shr         = 0x63,
  #[strum(serialize = "shr.un")]         ShrUn       = 0x64,
  #[strum(serialize = "neg")]            Neg         = 0x65,
  #[strum(serialize = "not")]            Not         = 0x66,

  // Conversions //
  #[strum(serialize = "conv.i1")]        ConvI1      = 0x67,
  #[strum(serialize = "conv.i2")]        ConvI2      = 0x68,
  #[strum(serialize = "conv.i4")]        ConvI4      = 0x69,
  #[strum(serialize = "conv.i8")]        ConvI8      = 0x6A,
  #[strum(serialize = "conv.r4")]        ConvR4      = 0x6B,
  #[strum(serialize = "conv.r8")]        ConvR8      = 0x6C,
  #[strum(serialize = "conv.u4")]        ConvU4      = 0x6D,
  #[strum(serialize = "conv.u8")]        ConvU8      = 0x6E,
  #[strum(serialize = "conv.r.un")]      ConvRUn     = 0x76,

  #[strum(serialize = "throw")]          Throw       = 0x7A,

  #[strum(serialize = "conv.ovf.i1.un")] ConvOvfI1Un = 0x82,
  #[strum(serialize = "conv.ovf.i2.un")] ConvOvfI2Un = 0x83,
  #[strum(serialize = "conv.ovf.i4.un")] ConvOvfI4Un = 0x84,
  #[strum(serialize = "conv.ovf.i8.un")] ConvOvfI8Un = 0x85,
  #[strum(serialize = "conv.ovf.u1.un")] ConvOvfU1Un = 0x86,
  #[strum(serialize = "conv.ovf.u2.un")] ConvOvfU2Un = 0x87,
  #[strum(serialize = "conv.ovf.u4.un")] ConvOvfU4Un = 0x88,
  #[strum(serialize = "conv.ovf.u8.un")] ConvOvfU8Un = 0x89,
  #[strum(serialize = "conv.ovf.i.un")]  ConvOvfIUn  = 0x8A,
  #[strum(serialize = "conv.ovf.u.un")]  ConvOvfUUn  = 0x8B,

  #[strum(serialize = "ldlen")]          Ldlen       = 0x8E,

  #[strum(serialize = "conv.ovf.i1")]    ConvOvfI1   = 0xB3,
  #[strum(serialize = "conv.ovf.u1")]    ConvOvfU1   = 0xB4,
  #[strum(serialize = "conv.ovf.i2")]    ConvOvfI2   = 0xB5,
  #[strum(serialize = "conv.ovf.u2")]    ConvOvfU2   = 0xB6,
  #[strum(serialize = "conv.ovf.i4")]    ConvOvfI4   = 0xB7,
  #[strum(serialize = "conv.ovf.u4")]    ConvOvfU4   = 0xB8,
  #[strum(serialize = "conv.ovf.i8")]    ConvOvfI8   = 0xB9,
  #[strum(serialize = "conv.ovf.u8")]    ConvOvfU8   = 0xBA,

  #[strum(serialize = "ckfinite")]       Ckfinite    = 0xC3,

  #[strum(serialize = "conv.u2")]        ConvU2      = 0xD1,
  #[strum(serialize = "conv.u1")]        ConvU1      = 0xD2,
  #[strum(serialize = "conv.i")]         ConvI       = 0xD3,
  #[strum(serialize = "conv.ovf.i")]     ConvOvfI    = 0xD4,
  #[strum(serialize = "conv.ovf.u")]     ConvOvfU    = 0xD5,
  #[strum(serialize = "add.ovf")]        AddOvf      = 0xD6,
  #[strum(serialize = "add.ovf.un")]     AddOvfUn    = 0xD7,
  #[strum(serialize = "mul.ovf")]        MulOvf      = 0xD8,
  #[strum(serialize = "mul.ovf.un")]     MulOvfUn    = 0xD9,
  #[strum(serialize = "sub.ovf")]        SubOvf      = 0xDA,
  #[strum(serialize = "sub.ovf.un")]     SubOvfUn    = 0xDB,
  #[strum(serialize = "endfinally")]     Endfinally  = 0xDC,
  #[strum(serialize = "leave")]          Leave       = 0xDD,
  #[strum(serialize = "leave.s")]        LeaveS      = 0xDE,
  #[strum(serialize = "conv.u")]         ConvU       = 0xE0,

  // Extended page, selected by the 0xFE prefix //
  #[strum(serialize = "arglist")]        Arglist     = 0xFE00,
  #[strum(serialize = "ceq")]            Ceq         = 0xFE01,
  #[strum(serialize = "cgt")]            Cgt         = 0xFE02,
  #[strum(serialize = "cgt.un")]         CgtUn       = 0xFE03,
  #[strum(serialize = "clt")]            Clt         = 0xFE04,
  #[strum(serialize = "clt.un")]         CltUn       = 0xFE05,
  #[strum(serialize = "ldarg")]          Ldarg       = 0xFE09,
  #[strum(serialize = "ldarga")]         Ldarga      = 0xFE0A,
  #[strum(serialize = "starg")]          Starg       = 0xFE0B,
  #[strum(serialize = "ldloc")]          Ldloc       = 0xFE0C,
  #[strum(serialize = "ldloca")]         Ldloca      = 0xFE0D,
  #[strum(serialize = "stloc")]          Stloc       = 0xFE0E,
  #[strum(serialize = "localloc")]       Localloc    = 0xFE0F,
  #[strum(serialize = "endfilter")]      Endfilter   = 0xFE11,
  #[strum(serialize = "cpblk")]          Cpblk       = 0xFE17,
  #[strum(serialize = "initblk")]        Initblk     = 0xFE18,
  #[strum(serialize = "rethrow")]        Rethrow     = 0xFE1A,
  #[strum(serialize = "refanytype")]     Refanytype  = 0xFE1D,
}

impl Opcode {
  /// The wire encoding: single byte value, or `0xFE00 | second` for the
  /// extended page.
  pub fn code(self) -> u16 {
    Into::<u16>::into(self)
  }

  /// The instruction's mnemonic.
  pub fn mnemonic(self) -> &'static str {
    self.into()
  }

  pub fn is_extended(self) -> bool {
    self.code() >> 8 == EXTENDED_PREFIX as u16
  }

  /// Looks up a plain one-byte opcode.
  pub fn from_primary(byte: u8) -> Option<Opcode> {
    if byte == EXTENDED_PREFIX {
      return None;
    }
    Opcode::try_from(byte as u16).ok()
  }

  /// Looks up the second byte of an `0xFE`-prefixed opcode.
  pub fn from_extended(second: u8) -> Option<Opcode> {
    Opcode::try_from(0xFE00u16 | second as u16).ok()
  }

  /// The shape of the operand following this opcode in the byte stream.
  pub fn operand_kind(self) -> OperandKind {
    use Opcode::*;
    match self {
      LdargS | LdargaS | StargS | LdlocS | LdlocaS | StlocS => OperandKind::Byte,

      LdcI4S | BrS | BrfalseS | BrtrueS | BeqS | BgeS | BgtS | BleS | BltS
      | BneUnS | BgeUnS | BgtUnS | BleUnS | BltUnS | LeaveS => OperandKind::SByte,

      Ldarg | Ldarga | Starg | Ldloc | Ldloca | Stloc => OperandKind::UShort,

      LdcI4 | Br | Brfalse | Brtrue | Beq | Bge | Bgt | Ble | Blt
      | BneUn | BgeUn | BgtUn | BleUn | BltUn | Leave => OperandKind::Int,

      LdcI8 => OperandKind::Long,
      LdcR4 => OperandKind::Float,
      LdcR8 => OperandKind::Double,

      _ => OperandKind::None,
    }
  }

  /// Total encoded size of an instruction with this opcode: one or two
  /// opcode bytes plus the operand width.
  pub fn byte_len(self) -> usize {
    let opcode_bytes = if self.is_extended() { 2 } else { 1 };
    opcode_bytes + self.operand_kind().width()
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn representative_codes_match_the_wire_format() {
    assert_eq!(Opcode::Add.code(), 0x58);
    assert_eq!(Opcode::And.code(), 0x5F);
    assert_eq!(Opcode::Div.code(), 0x5B);
    assert_eq!(Opcode::Ldarg0.code(), 0x02);
    assert_eq!(Opcode::Ldarg3.code(), 0x05);
    assert_eq!(Opcode::LdargS.code(), 0x0E);
    assert_eq!(Opcode::LdcI4.code(), 0x20);
    assert_eq!(Opcode::LdcI4_0.code(), 0x16);
    assert_eq!(Opcode::LdcI4_8.code(), 0x1E);
    assert_eq!(Opcode::LdcI4S.code(), 0x1F);
    assert_eq!(Opcode::LdcI8.code(), 0x21);
    assert_eq!(Opcode::LdcR4.code(), 0x22);
    assert_eq!(Opcode::LdcR8.code(), 0x23);
    assert_eq!(Opcode::Br.code(), 0x38);
    assert_eq!(Opcode::BrS.code(), 0x2B);
    assert_eq!(Opcode::Brfalse.code(), 0x39);
    assert_eq!(Opcode::BrfalseS.code(), 0x2C);
    assert_eq!(Opcode::Ret.code(), 0x2A);
    assert_eq!(Opcode::Ceq.code(), 0xFE01);
    assert_eq!(Opcode::Ldarg.code(), 0xFE09);
  }

  #[test]
  fn mnemonic_text_round_trips() {
    for opcode in Opcode::iter() {
      let text = opcode.mnemonic();
      assert_eq!(Opcode::from_str(text), Ok(opcode), "mnemonic '{}'", text);
    }
  }

  #[test]
  fn operand_widths() {
    assert_eq!(Opcode::Ret.operand_kind().width(), 0);
    assert_eq!(Opcode::LdargS.operand_kind().width(), 1);
    assert_eq!(Opcode::LdcI4S.operand_kind().width(), 1);
    assert_eq!(Opcode::Ldarg.operand_kind().width(), 2);
    assert_eq!(Opcode::LdcI4.operand_kind().width(), 4);
    assert_eq!(Opcode::LdcI8.operand_kind().width(), 8);
    assert_eq!(Opcode::LdcR4.operand_kind().width(), 4);
    assert_eq!(Opcode::LdcR8.operand_kind().width(), 8);
  }

  #[test]
  fn byte_len_counts_the_prefix() {
    assert_eq!(Opcode::Ret.byte_len(), 1);
    assert_eq!(Opcode::Brfalse.byte_len(), 5);
    assert_eq!(Opcode::Ceq.byte_len(), 2);
    assert_eq!(Opcode::Stloc.byte_len(), 4);
  }

  #[test]
  fn the_prefix_byte_is_not_an_opcode() {
    assert_eq!(Opcode::from_primary(0xFE), None);
    assert_eq!(Opcode::from_primary(0x24), None);
    assert_eq!(Opcode::from_extended(0x1B), None);
  }
}
