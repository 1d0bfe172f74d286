//! Bounds-checked little reader over a payload slice.

use entangle_types::Amount;

use crate::error::CodecError;

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated(what))?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::Truncated(what))?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u32_le(&mut self, what: &'static str) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub(crate) fn u64_le(&mut self, what: &'static str) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// `len(1) | big-endian magnitude`.
    pub(crate) fn amount(&mut self, what: &'static str) -> Result<Amount, CodecError> {
        let len = self.u8(what)? as usize;
        let bytes = self.take(len, what)?;
        Amount::from_be_slice(bytes).ok_or(CodecError::AmountTooWide(len))
    }

    pub(crate) fn finish(&self) -> Result<(), CodecError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

pub(crate) fn put_amount(out: &mut Vec<u8>, amount: Amount) {
    let bytes = amount.to_be_trimmed();
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
}
