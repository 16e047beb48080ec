//! Incremental terminal rendering of cumulative snapshots.
//!
//! Snapshots carry the whole reply so far. The renderer remembers what it
//! has already written and emits only the new suffix. When a snapshot does
//! not extend the previous one (an error replacing partial output), the
//! block is rewritten below a separator.

use std::io::{self, Write};

use tc_protocol::ChatSnapshot;

use crate::style::Style;

const SEPARATOR: &str = "----";

pub struct Renderer<W: Write> {
    writer: W,
    style: Style,
    show_thinking: bool,
    shown: ChatSnapshot,
    written: bool,
}

impl<W: Write> Renderer<W> {
    /// `show_thinking` is false for models without a thinking channel; their
    /// thinking field is never printed.
    pub fn new(writer: W, style: Style, show_thinking: bool) -> Self {
        Self {
            writer,
            style,
            show_thinking,
            shown: ChatSnapshot::default(),
            written: false,
        }
    }

    fn visible(&self, snapshot: &ChatSnapshot) -> ChatSnapshot {
        ChatSnapshot {
            thinking: if self.show_thinking {
                snapshot.thinking.clone()
            } else {
                String::new()
            },
            response: snapshot.response.clone(),
        }
    }

    /// Render the next snapshot of the stream.
    pub fn update(&mut self, snapshot: &ChatSnapshot) -> io::Result<()> {
        let next = self.visible(snapshot);
        if next == self.shown {
            return Ok(());
        }

        // Thinking that grows after the answer started cannot be appended in place.
        let extends = self.shown.is_extended_by(&next)
            && (self.shown.response.is_empty() || next.thinking == self.shown.thinking);
        if !extends {
            if self.written {
                writeln!(self.writer)?;
                writeln!(
                    self.writer,
                    "{}",
                    self.style.paint(self.style.error_start(), SEPARATOR)
                )?;
            }
            self.shown = ChatSnapshot::default();
        }

        let thinking = &next.thinking[self.shown.thinking.len()..];
        if !thinking.is_empty() {
            write!(
                self.writer,
                "{}",
                self.style.paint(self.style.thinking_start(), thinking)
            )?;
            self.written = true;
        }

        let response = &next.response[self.shown.response.len()..];
        if !response.is_empty() {
            if self.shown.response.is_empty() && !next.thinking.is_empty() {
                write!(self.writer, "\n\n")?;
            }
            write!(self.writer, "{response}")?;
            self.written = true;
        }

        self.writer.flush()?;
        self.shown = next;
        Ok(())
    }

    /// End the block with a newline if anything was written.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.written {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }
}
