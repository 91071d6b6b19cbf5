//! Indented C++ line buffer with a strict block stack.

use crate::error::{CodegenError, CodegenResult};

const INDENT: &str = "  ";

/// Handle to a line whose text is decided later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserved(usize);

#[derive(Debug, Clone)]
struct Line {
    depth: usize,
    text: Option<String>,
}

/// Lines at their nesting depth.
///
/// Blocks opened with [`LineBuffer::open_block`] stay open until closed
/// explicitly, so a loop opened while evaluating one expression keeps
/// enclosing the code that follows it.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: Vec<Line>,
    depth: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn add_line(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            depth: self.depth,
            text: Some(text.into()),
        });
    }

    /// Keep a slot at the current depth, filled by [`LineBuffer::fill`]
    pub fn reserve(&mut self) -> Reserved {
        self.lines.push(Line {
            depth: self.depth,
            text: None,
        });
        Reserved(self.lines.len() - 1)
    }

    pub fn fill(&mut self, slot: Reserved, text: impl Into<String>) {
        if let Some(line) = self.lines.get_mut(slot.0) {
            line.text = Some(text.into());
        }
    }

    pub fn open_block(&mut self) {
        self.add_line("{");
        self.depth += 1;
    }

    pub fn close_block(&mut self) -> CodegenResult<()> {
        if self.depth == 0 {
            return Err(CodegenError::emission(
                "attempt to close a block that was never opened",
            ));
        }
        self.depth -= 1;
        self.add_line("}");
        Ok(())
    }

    /// Close blocks until the depth is back to `depth`
    pub fn close_to(&mut self, depth: usize) -> CodegenResult<()> {
        while self.depth > depth {
            self.close_block()?;
        }
        Ok(())
    }

    /// Indented text. Reserved lines never filled are dropped.
    pub fn render(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| {
                line.text
                    .as_ref()
                    .map(|text| format!("{}{}", INDENT.repeat(line.depth), text))
            })
            .collect()
    }
}
