//! Line terminator classification.
//!
//! The buffer always recognizes LF, CR and CRLF. In [`LineEndTypes::Unicode`] mode the
//! UTF-8 encodings of LINE SEPARATOR (U+2028), PARAGRAPH SEPARATOR (U+2029) and NEXT LINE
//! (U+0085) end lines too.

/// Which terminators end a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEndTypes {
    /// LF, CR and CRLF.
    #[default]
    Default,
    /// Additionally U+2028, U+2029 and NEL.
    Unicode,
}

impl LineEndTypes {
    /// Returns `true` if the multi-byte Unicode terminators are recognized.
    pub fn allows_unicode(self) -> bool {
        self == Self::Unicode
    }
}

/// One terminator found in a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEnd {
    /// Offset of the terminator's first byte.
    pub position: usize,
    /// Length of the terminator in bytes (1 to 3).
    pub len: usize,
}

impl LineEnd {
    /// Offset of the first byte of the next line.
    pub fn next_line_start(&self) -> usize {
        self.position + self.len
    }
}

/// `E2 80 A8` or `E2 80 A9`.
#[inline]
pub fn is_separator(bytes: [u8; 3]) -> bool {
    bytes[0] == 0xE2 && bytes[1] == 0x80 && (bytes[2] == 0xA8 || bytes[2] == 0xA9)
}

/// `C2 85`.
#[inline]
pub fn is_nel(bytes: [u8; 2]) -> bool {
    bytes[0] == 0xC2 && bytes[1] == 0x85
}

/// UTF-8 continuation byte.
#[inline]
pub fn is_trail_byte(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Iterator over the terminators in a byte slice.
#[derive(Debug, Clone)]
pub struct LineEnds<'a> {
    text: &'a [u8],
    offset: usize,
    types: LineEndTypes,
}

impl Iterator for LineEnds<'_> {
    type Item = LineEnd;

    fn next(&mut self) -> Option<LineEnd> {
        while self.offset < self.text.len() {
            let position = self.offset;
            let at = |i: usize| self.text.get(i).copied().unwrap_or(0);
            let len = match at(position) {
                b'\r' if at(position + 1) == b'\n' => 2,
                b'\r' | b'\n' => 1,
                0xE2 if self.types.allows_unicode()
                    && is_separator([at(position), at(position + 1), at(position + 2)]) =>
                {
                    3
                }
                0xC2 if self.types.allows_unicode() && is_nel([at(position), at(position + 1)]) => {
                    2
                }
                _ => 0,
            };
            if len > 0 {
                self.offset = position + len;
                return Some(LineEnd { position, len });
            }
            self.offset += 1;
        }
        None
    }
}

/// Terminators in `text`, in order. A CRLF pair is reported as one terminator.
pub fn line_ends(text: &[u8], types: LineEndTypes) -> LineEnds<'_> {
    LineEnds {
        text,
        offset: 0,
        types,
    }
}

/// Returns `true` if `text` contains any terminator recognized under `types`.
pub fn contains_line_end(text: &[u8], types: LineEndTypes) -> bool {
    line_ends(text, types).next().is_some()
}
