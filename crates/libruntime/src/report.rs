use std::io::{self, Write};
use crate::stats::Snapshot;

pub const CLEAR_AND_HOME: &str = "\x1b[2J\x1b[H";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

/// Redraws one block per interval in place.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let (on, off) = match self.color {
            true => (YELLOW, RESET),
            false => ("", ""),
        };
        write!(
            self.out,
            "{CLEAR_AND_HOME}{on}Concurrency: {}
Finished: {}
Processing: {}
Average Roundtrip: {:.3}ms
Max Roundtrip: {}ms
Min Roundtrip: {}ms
{off}",
            snapshot.concurrency,
            snapshot.finished,
            snapshot.processing,
            snapshot.average_ms,
            snapshot.max_ms,
            snapshot.min_ms,
        )?;
        self.out.flush()
    }
}

/// One JSON object per interval, newline separated.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        (**self).render(snapshot)
    }
}
