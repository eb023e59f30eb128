//! Indentation-tracking text buffer for source emission.

use std::fmt::Write;

/// Line-oriented buffer that prefixes each appended line with the current
/// indent. Labels are emitted by temporarily dropping one indent level.
pub struct CodeWriter {
    buffer: String,
    indent_level: usize,
    spaces_per_indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        CodeWriter {
            buffer: String::new(),
            indent_level: 0,
            spaces_per_indent: 4,
        }
    }

    pub fn append_line(&mut self, line: &str) {
        for _ in 0..self.indent_level * self.spaces_per_indent {
            self.buffer.push(' ');
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    pub fn append_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        let mut line = String::new();
        // Writing into a String cannot fail
        let _ = line.write_fmt(args);
        self.append_line(&line);
    }

    /// Append a bare newline with no indent.
    pub fn append_blank(&mut self) {
        self.buffer.push('\n');
    }

    pub fn begin_indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn end_indent(&mut self) {
        debug_assert!(self.indent_level > 0, "indent level is 0");
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        CodeWriter::new()
    }
}
