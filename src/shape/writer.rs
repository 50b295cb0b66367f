//! Low-level writer for MSTS structured text (STF) files.
//!
//! STF text is UTF-16 little-endian with a byte order mark and CRLF line
//! endings. [`StfWriter`] takes care of the encoding so the serializer can
//! deal in plain Rust strings.

use std::fmt;
use std::io;

const BOM: [u8; 2] = [0xFF, 0xFE];

pub struct StfWriter<W> {
    inner: W,
    scratch: String,
}

impl<W: io::Write> StfWriter<W> {
    /// Wrap `inner`, emitting the byte order mark immediately.
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(&BOM)?;
        Ok(Self {
            inner,
            scratch: String::new(),
        })
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        self.inner.write_all(&bytes)
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        if let Some(text) = args.as_str() {
            return self.write_str(text);
        }
        self.scratch.clear();
        fmt::write(&mut self.scratch, args).map_err(io::Error::other)?;
        let text = std::mem::take(&mut self.scratch);
        let result = self.write_str(&text);
        self.scratch = text;
        result
    }

    pub fn end_line(&mut self) -> io::Result<()> {
        self.write_str("\r\n")
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Write formatted text without a line ending.
macro_rules! stf {
    ($w:expr, $($arg:tt)*) => {
        $w.write_fmt(format_args!($($arg)*))
    };
}

/// Write formatted text followed by CRLF.
macro_rules! stfln {
    ($w:expr) => {
        $w.end_line()
    };
    ($w:expr, $($arg:tt)*) => {
        $w.write_fmt(format_args!($($arg)*)).and_then(|_| $w.end_line())
    };
}

pub(crate) use {stf, stfln};

/// A float printed in its shortest form, never with an exponent or a
/// negative zero.
#[derive(Debug, Clone, Copy)]
pub struct Num(pub f32);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}

/// A float rounded to a fixed number of decimal places.
#[derive(Debug, Clone, Copy)]
pub struct Rounded(f64);

impl Rounded {
    pub fn new(value: f32, places: i32) -> Self {
        let scale = 10f64.powi(places);
        Rounded((value as f64 * scale).round() / scale)
    }
}

impl fmt::Display for Rounded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}
