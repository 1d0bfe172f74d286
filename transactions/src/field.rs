//! Self-describing named-field encoding for structured records.
//!
//! ```text
//! record := kind(1) field*
//! field  := name_len(1) | name | type(1) | body
//! body   := U64:    u64 LE
//!         | BigInt: len(1) | magnitude BE
//!         | Bytes:  u32 LE len | bytes
//!         | Str:    u32 LE len | utf-8
//!         | Bool:   0 or 1
//!         | List:   u32 LE count | (type(1) | body)*
//! ```
//!
//! Each record writes its fields in one fixed order and the reader insists
//! on the same names and types in that order, so equal records always encode
//! to equal bytes.

use entangle_types::Amount;

use crate::cursor::{put_amount, Cursor};
use crate::error::CodecError;
use crate::payload::PayloadKind;

/// Lists may nest, but not without bound.
pub const MAX_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    U64 = 1,
    BigInt = 2,
    Bytes = 3,
    Str = 4,
    Bool = 5,
    List = 6,
}

impl FieldType {
    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        Ok(match byte {
            1 => FieldType::U64,
            2 => FieldType::BigInt,
            3 => FieldType::Bytes,
            4 => FieldType::Str,
            5 => FieldType::Bool,
            6 => FieldType::List,
            other => return Err(CodecError::UnknownFieldType(other)),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    U64(u64),
    BigInt(Amount),
    Bytes(Vec<u8>),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::U64(_) => FieldType::U64,
            Value::BigInt(_) => FieldType::BigInt,
            Value::Bytes(_) => FieldType::Bytes,
            Value::Str(_) => FieldType::Str,
            Value::Bool(_) => FieldType::Bool,
            Value::List(_) => FieldType::List,
        }
    }

    fn write_typed(&self, out: &mut Vec<u8>) {
        out.push(self.field_type() as u8);
        match self {
            Value::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::BigInt(v) => put_amount(out, *v),
            Value::Bytes(v) => put_len_prefixed(out, v),
            Value::Str(v) => put_len_prefixed(out, v.as_bytes()),
            Value::Bool(v) => out.push(u8::from(*v)),
            Value::List(items) => {
                out.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for item in items {
                    item.write_typed(out);
                }
            }
        }
    }

    fn read_typed(cur: &mut Cursor<'_>, field: &'static str, depth: usize) -> Result<Self, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let ty = FieldType::from_byte(cur.u8("field type")?)?;
        Ok(match ty {
            FieldType::U64 => Value::U64(cur.u64_le(field)?),
            FieldType::BigInt => Value::BigInt(cur.amount(field)?),
            FieldType::Bytes => Value::Bytes(read_len_prefixed(cur, field)?.to_vec()),
            FieldType::Str => {
                let raw = read_len_prefixed(cur, field)?;
                let text = std::str::from_utf8(raw).map_err(|e| CodecError::InvalidValue {
                    field,
                    reason: e.to_string(),
                })?;
                Value::Str(text.to_owned())
            }
            FieldType::Bool => match cur.u8(field)? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(CodecError::InvalidValue {
                        field,
                        reason: format!("bool byte {other}"),
                    })
                }
            },
            FieldType::List => {
                let count = cur.u32_le(field)? as usize;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(Value::read_typed(cur, field, depth + 1)?);
                }
                Value::List(items)
            }
        })
    }

    pub fn into_u64(self, field: &'static str) -> Result<u64, CodecError> {
        match self {
            Value::U64(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }

    pub fn into_amount(self, field: &'static str) -> Result<Amount, CodecError> {
        match self {
            Value::BigInt(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }

    pub fn into_bytes(self, field: &'static str) -> Result<Vec<u8>, CodecError> {
        match self {
            Value::Bytes(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }

    pub fn into_string(self, field: &'static str) -> Result<String, CodecError> {
        match self {
            Value::Str(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }

    pub fn into_bool(self, field: &'static str) -> Result<bool, CodecError> {
        match self {
            Value::Bool(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }

    pub fn into_list(self, field: &'static str) -> Result<Vec<Value>, CodecError> {
        match self {
            Value::List(v) => Ok(v),
            _ => Err(CodecError::FieldType { field }),
        }
    }
}

fn put_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn read_len_prefixed<'a>(cur: &mut Cursor<'a>, field: &'static str) -> Result<&'a [u8], CodecError> {
    let len = cur.u32_le(field)? as usize;
    cur.take(len, field)
}

pub struct FieldWriter {
    out: Vec<u8>,
}

impl FieldWriter {
    pub fn new(kind: PayloadKind) -> Self {
        Self {
            out: vec![kind.byte()],
        }
    }

    pub fn field(&mut self, name: &'static str, value: Value) -> &mut Self {
        debug_assert!(name.len() <= u8::MAX as usize);
        self.out.push(name.len() as u8);
        self.out.extend_from_slice(name.as_bytes());
        value.write_typed(&mut self.out);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

pub struct FieldReader<'a> {
    cur: Cursor<'a>,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], kind: PayloadKind) -> Result<Self, CodecError> {
        let mut cur = Cursor::new(data);
        let found = cur.u8("record kind")?;
        if found != kind.byte() {
            return Err(CodecError::WrongKind {
                expected: kind,
                found,
            });
        }
        Ok(Self { cur })
    }

    /// Next field, which must be called `name`.
    pub fn field(&mut self, name: &'static str) -> Result<Value, CodecError> {
        let len = self.cur.u8("field name")? as usize;
        let raw = self.cur.take(len, "field name")?;
        if raw != name.as_bytes() {
            return Err(CodecError::FieldName {
                expected: name,
                found: String::from_utf8_lossy(raw).into_owned(),
            });
        }
        Value::read_typed(&mut self.cur, name, 0)
    }

    pub fn u64(&mut self, name: &'static str) -> Result<u64, CodecError> {
        self.field(name)?.into_u64(name)
    }

    pub fn amount(&mut self, name: &'static str) -> Result<Amount, CodecError> {
        self.field(name)?.into_amount(name)
    }

    pub fn bytes(&mut self, name: &'static str) -> Result<Vec<u8>, CodecError> {
        self.field(name)?.into_bytes(name)
    }

    pub fn string(&mut self, name: &'static str) -> Result<String, CodecError> {
        self.field(name)?.into_string(name)
    }

    pub fn bool(&mut self, name: &'static str) -> Result<bool, CodecError> {
        self.field(name)?.into_bool(name)
    }

    pub fn list(&mut self, name: &'static str) -> Result<Vec<Value>, CodecError> {
        self.field(name)?.into_list(name)
    }

    pub fn finish(self) -> Result<(), CodecError> {
        self.cur.finish()
    }
}

/// A structured record with a fixed field schema.
pub trait Record: Sized {
    const KIND: PayloadKind;

    fn write_fields(&self, w: &mut FieldWriter);

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = FieldWriter::new(Self::KIND);
        self.write_fields(&mut w);
        w.finish()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = FieldReader::new(data, Self::KIND)?;
        let record = Self::read_fields(&mut r)?;
        r.finish()?;
        Ok(record)
    }
}
