//! Lucene's "modified UTF-8" string codec.
//!
//! Lucene's `DataOutput.writeString`/`DataInput.readString` do not use plain
//! UTF-8 for supplementary characters (code points >= U+10000): each such
//! character is split into a UTF-16 surrogate pair and the two surrogate
//! halves are independently re-encoded as 3-byte sequences, exactly as if
//! each surrogate were its own code point. A reader must therefore decode by
//! walking UTF-16-code-unit boundaries, not Unicode scalar values, for
//! strings to round-trip byte-for-byte against real Lucene output.

use crate::error::{LuceneError, LuceneResult};

pub fn write_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for code_unit in s.encode_utf16() {
        push_code_unit(&mut out, code_unit);
    }
    out
}

fn push_code_unit(out: &mut Vec<u8>, code_unit: u16) {
    let c = code_unit as u32;
    if c == 0 {
        // Lucene encodes embedded NULs as the 2-byte overlong form so the
        // string stays scannable without accidental early termination.
        out.push(0xC0);
        out.push(0x80);
    } else if c <= 0x7f {
        out.push(c as u8);
    } else if c <= 0x7ff {
        out.push(0xC0 | ((c >> 6) as u8));
        out.push(0x80 | ((c & 0x3f) as u8));
    } else {
        out.push(0xE0 | ((c >> 12) as u8));
        out.push(0x80 | (((c >> 6) & 0x3f) as u8));
        out.push(0x80 | ((c & 0x3f) as u8));
    }
}

pub fn read_modified_utf8(bytes: &[u8]) -> LuceneResult<String> {
    let mut code_units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            code_units.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes
                .get(i + 1)
                .ok_or_else(|| LuceneError::invalid_format("truncated modified-UTF-8 string"))?;
            let cu = (((b0 & 0x1f) as u16) << 6) | ((b1 & 0x3f) as u16);
            code_units.push(cu);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes
                .get(i + 1)
                .ok_or_else(|| LuceneError::invalid_format("truncated modified-UTF-8 string"))?;
            let b2 = *bytes
                .get(i + 2)
                .ok_or_else(|| LuceneError::invalid_format("truncated modified-UTF-8 string"))?;
            let cu = (((b0 & 0x0f) as u16) << 12) | (((b1 & 0x3f) as u16) << 6) | ((b2 & 0x3f) as u16);
            code_units.push(cu);
            i += 3;
        } else {
            return Err(LuceneError::invalid_format(format!(
                "invalid modified-UTF-8 lead byte 0x{b0:02x}"
            )));
        }
    }
    String::from_utf16(&code_units)
        .map_err(|_| LuceneError::invalid_format("modified-UTF-8 string contains unpaired surrogate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_and_supplementary() {
        let s = "hello \u{1F600} world \u{0041}";
        let encoded = write_modified_utf8(s);
        let decoded = read_modified_utf8(&encoded).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn round_trips_embedded_nul() {
        let s = "a\u{0}b";
        let encoded = write_modified_utf8(s);
        assert_eq!(encoded, vec![b'a', 0xC0, 0x80, b'b']);
        let decoded = read_modified_utf8(&encoded).unwrap();
        assert_eq!(decoded, s);
    }
}
