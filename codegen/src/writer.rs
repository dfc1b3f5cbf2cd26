//! Indentation-tracking text sink for generated C sources.
//!
//! Lines are collected in order and indented with one tab per level.
//! [`CodeWriter::block`] is the scoped form: the level it pushes is popped on
//! every exit from the closure, including an early `return` of an error.

/// Accumulates one generated document.
#[derive(Debug, Default, Clone)]
pub struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current indentation depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Emit one line at the current depth.
    ///
    /// Empty input produces an empty line without trailing whitespace.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{text}", "\t".repeat(self.depth)));
        }
        self
    }

    /// Emit a multi-line chunk, indenting each of its lines at the current depth.
    pub fn lines(&mut self, text: impl AsRef<str>) -> &mut Self {
        for line in text.as_ref().lines() {
            self.line(line);
        }
        self
    }

    /// Emit one line one level deeper than the current depth.
    pub fn indent_line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.push_indent();
        self.line(text);
        self.pop_indent();
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_indent(&mut self) {
        self.depth += 1;
    }

    pub fn pop_indent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `body` one indentation level deeper.
    pub fn block<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let depth = self.depth;
        self.push_indent();
        let result = body(self);
        self.depth = depth;
        result
    }

    /// Finish the document. The result always ends with a newline.
    pub fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
