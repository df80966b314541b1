use std::io;
use std::io::Read;
use std::str::Chars;

/// An ordered, forward-only source of Unicode code points. A source is consumed exactly
/// once; opening and closing the underlying resource is the caller's responsibility.
pub trait CodePoints {
    /// Read the next code point. `Ok(None)` means end of input; an `Err` is a read
    /// failure and is terminal.
    fn next_code_point(&mut self) -> io::Result<Option<char>>;
}

/// Code points of an in-memory string.
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(src: &'a str) -> Self {
        StrSource { chars: src.chars() }
    }
}

impl CodePoints for StrSource<'_> {
    fn next_code_point(&mut self) -> io::Result<Option<char>> {
        Ok(self.chars.next())
    }
}

/// Incremental UTF-8 decoder over any byte reader. Decodes one code point per call;
/// malformed sequences surface as `InvalidData` read failures.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        ReaderSource { inner }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> CodePoints for ReaderSource<R> {
    fn next_code_point(&mut self) -> io::Result<Option<char>> {
        let lead = match self.next_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let len = match lead {
            0x00..=0x7f => return Ok(Some(lead as char)),
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(malformed_utf8()),
        };
        let mut seq = [lead, 0, 0, 0];
        for slot in seq.iter_mut().take(len).skip(1) {
            match self.next_byte()? {
                // Continuation bytes are 0b10xx_xxxx.
                Some(b) if b & 0xc0 == 0x80 => *slot = b,
                _ => return Err(malformed_utf8()),
            }
        }
        // from_utf8 also rejects overlong encodings and surrogate code points.
        match std::str::from_utf8(&seq[..len]).ok().and_then(|s| s.chars().next()) {
            Some(c) => Ok(Some(c)),
            None => Err(malformed_utf8()),
        }
    }
}

fn malformed_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "malformed UTF-8 in input")
}
