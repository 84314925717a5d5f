//! Code formatting utilities for generated C.

/// A simple code formatter for generated code.
///
/// Tracks indentation level and whether the cursor sits at the start of a
/// line, so emitters can interleave `write` and `writeln` freely.
#[derive(Debug)]
pub struct CodeFormatter {
    output: String,
    indent_level: usize,
    indent_str: String,
    at_line_start: bool,
}

impl CodeFormatter {
    /// Create a new formatter with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Create a formatter with default settings (4 spaces).
    pub fn default_indent() -> Self {
        Self::new("    ")
    }

    /// Increase indentation level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indentation level.
    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Write text without a trailing newline.
    pub fn write(&mut self, text: &str) {
        if self.at_line_start && !text.is_empty() {
            for _ in 0..self.indent_level {
                self.output.push_str(&self.indent_str);
            }
            self.at_line_start = false;
        }
        self.output.push_str(text);
    }

    /// Write a full line (indented, newline-terminated).
    pub fn writeln(&mut self, line: &str) {
        self.write(line);
        self.output.push('\n');
        self.at_line_start = true;
    }

    /// Write an empty line.
    pub fn blank(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
    }

    /// Consume the formatter and return the accumulated output.
    pub fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let mut f = CodeFormatter::new("  ");
        f.writeln("fn main() {");
        f.indent();
        f.writeln("body();");
        f.dedent();
        f.writeln("}");
        assert_eq!(f.finish(), "fn main() {\n  body();\n}\n");
    }

    #[test]
    fn test_partial_writes() {
        let mut f = CodeFormatter::new("    ");
        f.indent();
        f.write("for (");
        f.write("int i = 0");
        f.writeln(") {");
        let out = f.finish();
        assert_eq!(out, "    for (int i = 0) {\n");
    }
}
