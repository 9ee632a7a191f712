//! Byte-level helpers shared by the codecs.

use crate::error::{DatasetError, Result};

/// Forward-only reader over a decoded (decompressed) buffer.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub(crate) fn corrupt(&self, reason: impl Into<String>) -> DatasetError {
        self.corrupt_at(self.pos, reason)
    }

    pub(crate) fn corrupt_at(&self, offset: usize, reason: impl Into<String>) -> DatasetError {
        DatasetError::CorruptSchemaData {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn peek(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.corrupt("unexpected end of data"))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| self.corrupt(format!("expected {} more bytes", N)))?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    /// Read a `0x00`-terminated UTF-8 string, consuming the terminator.
    pub(crate) fn read_cstr(&mut self, what: &str) -> Result<&'a str> {
        let start = self.pos;
        let len = self.buf[start.min(self.buf.len())..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.corrupt(format!("unterminated {what}")))?;
        let text = std::str::from_utf8(&self.buf[start..start + len])
            .map_err(|_| self.corrupt_at(start, format!("{what} is not valid UTF-8")))?;
        self.pos = start + len + 1;
        Ok(text)
    }
}

/// Check that `text` can be written with [`write_cstr`].
///
/// Text containing `0x00` is rejected; so is empty text unless
/// `allow_empty`, since an empty name would read back as a sentinel.
pub(crate) fn check_cstr(text: &str, what: &'static str, allow_empty: bool) -> Result<()> {
    if text.as_bytes().contains(&0) {
        return Err(DatasetError::UnencodableString {
            what,
            value: text.to_string(),
            reason: "contains a NUL byte",
        });
    }
    if text.is_empty() && !allow_empty {
        return Err(DatasetError::UnencodableString {
            what,
            value: String::new(),
            reason: "is empty",
        });
    }
    Ok(())
}

/// Append `text` followed by a `0x00` terminator.
pub(crate) fn write_cstr(
    out: &mut Vec<u8>,
    text: &str,
    what: &'static str,
    allow_empty: bool,
) -> Result<()> {
    check_cstr(text, what, allow_empty)?;
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    Ok(())
}
