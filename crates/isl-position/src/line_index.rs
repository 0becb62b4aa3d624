//! Byte-offset to line/column conversion, built once per source text.

/// Caches the byte offset of the start of every line in a source text so that
/// converting a byte offset to a 1-based `(line, column)` pair does not require
/// rescanning the text from the beginning each time.
///
/// Columns are counted in codepoints, not UTF-16 code units — the ISL front
/// end has no LSP wire format to satisfy, so there is no reason to pay for
/// UTF-16 column arithmetic.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Builds a line index from source text. Recognises `\n`, `\r\n`, and
    /// bare `\r` as line terminators, matching the lexer's own notion of a
    /// line break.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(i + 1),
                b'\r' => {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        line_starts.push(i + 2);
                        i += 1;
                    } else {
                        line_starts.push(i + 1);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-based `(line, column)` pair.
    pub fn offset_to_position(&self, text: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(text.len());
        let line = self.line_starts.binary_search(&offset).unwrap_or_else(|i| i.saturating_sub(1));
        let line_start = self.line_starts[line];
        let column = text[line_start..offset].chars().count() as u32 + 1;
        (line as u32 + 1, column)
    }

    /// Converts a 1-based `(line, column)` pair back to a byte offset.
    /// Returns `None` if the line is out of range.
    pub fn position_to_offset(&self, text: &str, line: u32, column: u32) -> Option<usize> {
        let line = line.checked_sub(1)? as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self.line_starts.get(line + 1).copied().unwrap_or(text.len());
        let line_text = &text[line_start..line_end];
        let target = column.saturating_sub(1) as usize;
        let mut byte_offset = line_text.len();
        for (count, (idx, _)) in line_text.char_indices().enumerate() {
            if count == target {
                byte_offset = idx;
                break;
            }
        }
        Some(line_start + byte_offset)
    }

    /// Number of lines recorded (including a trailing empty line if the text
    /// ends with a terminator).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello world");
        assert_eq!(idx.offset_to_position("hello world", 0), (1, 1));
        assert_eq!(idx.offset_to_position("hello world", 6), (1, 7));
    }

    #[test]
    fn multi_line_lf() {
        let text = "abc\ndef\nghi";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_position(text, 0), (1, 1));
        assert_eq!(idx.offset_to_position(text, 4), (2, 1));
        assert_eq!(idx.offset_to_position(text, 8), (3, 1));
    }

    #[test]
    fn crlf_counts_as_one_terminator() {
        let text = "abc\r\ndef";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_position(text, 5), (2, 1));
    }

    #[test]
    fn codepoints_not_utf16() {
        let text = "é€x";
        let idx = LineIndex::new(text);
        // 'é' and '€' are each one codepoint but multiple UTF-8 bytes.
        let x_byte = text.char_indices().nth(2).unwrap().0;
        assert_eq!(idx.offset_to_position(text, x_byte), (1, 3));
    }

    #[test]
    fn round_trip_position_to_offset() {
        let text = "abc\ndef\nghi";
        let idx = LineIndex::new(text);
        for offset in [0, 2, 4, 6, 8, 10] {
            let (line, col) = idx.offset_to_position(text, offset);
            assert_eq!(idx.position_to_offset(text, line, col), Some(offset));
        }
    }
}
