//! Error values reported by compilation and decoding. Every failure is
//! surfaced synchronously at the offending operation; nothing is retried,
//! and a failed compile or decode yields no instruction sequence.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
  /// A read or assignment names a variable no enclosing scope binds.
  #[error("variable '{name}' is not defined in any enclosing scope")]
  UnboundVariable { name: String },

  /// A name was declared twice at the same scope level. Shadowing an outer
  /// binding is legal; rebinding within one level is not.
  #[error("duplicate definition of variable '{name}'")]
  DuplicateBinding { name: String },

  /// A local or argument slot index exceeds the 16 bits the instruction
  /// set can encode.
  #[error("slot index {index} does not fit in the 16-bit local index width")]
  IndexOutOfRange { index: usize },

  /// A branch targets a label that was never marked before the instruction
  /// sequence was finalized.
  #[error("branch to label {label} which was never marked")]
  UnboundLabel { label: usize },

  /// The decoder met a byte (or `0xFE`-prefixed byte pair) with no table
  /// entry. The offending bytes and stream offset are kept for diagnostics.
  #[error("unknown opcode 0x{byte:02X}{} at offset {offset}",
          .extended.map(|b| format!(" 0x{:02X}", b)).unwrap_or_default())]
  UnknownOpcode {
    byte: u8,
    extended: Option<u8>,
    offset: usize,
  },

  /// The stream ended in the middle of an instruction's operand.
  #[error("byte stream truncated inside the instruction at offset {offset}")]
  TruncatedStream { offset: usize },
}
