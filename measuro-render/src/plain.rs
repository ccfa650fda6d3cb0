use std::io::Write;

use measuro::{Metric, RenderError, Renderer};

/// Renders metrics as `<name> = <value>[ <unit>]` lines.
///
/// A render pass ends with an empty line and a flush.
#[derive(Debug)]
pub struct PlainRenderer<W: Write> {
    out: W,
    suppressed: bool,
}

impl<W: Write> PlainRenderer<W> {
    /// Creates a new [`PlainRenderer`] writing to `out`.
    pub fn new(out: W) -> Self {
        PlainRenderer { out, suppressed: false }
    }

    /// Gets a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consumes the renderer, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
        write!(self.out, "{} = {}", metric.name(), metric)?;
        if !metric.unit().is_empty() {
            write!(self.out, " {}", metric.unit())?;
        }
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn after(&mut self) -> Result<(), RenderError> {
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn suppressed_error(&self) -> bool {
        self.suppressed
    }

    fn set_suppressed_error(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }
}
