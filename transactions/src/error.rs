use entangle_types::{ErrorKind, ScriptError};
use thiserror::Error;

use crate::payload::PayloadKind;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload of {len} bytes is too short, need more than {min}")]
    TooShort { len: usize, min: usize },

    #[error("unknown asset tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("truncated while reading {0}")]
    Truncated(&'static str),

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("amount of {0} bytes does not fit")]
    AmountTooWide(usize),

    #[error("duplicate asset tag 0x{0:02x}")]
    DuplicateAsset(u8),

    #[error("expected {expected} record, found kind 0x{found:02x}")]
    WrongKind { expected: PayloadKind, found: u8 },

    #[error("expected field `{expected}`, found `{found}`")]
    FieldName { expected: &'static str, found: String },

    #[error("field `{field}` has the wrong type")]
    FieldType { field: &'static str },

    #[error("unknown field type 0x{0:02x}")]
    UnknownFieldType(u8),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("invalid value in `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("payload output {index} carries value {value}, must be zero")]
    NonZeroValue { index: usize, value: u64 },

    #[error("malformed {kind} transaction: {reason}")]
    BadShape { kind: PayloadKind, reason: String },

    #[error("script: {0}")]
    Script(#[from] ScriptError),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
