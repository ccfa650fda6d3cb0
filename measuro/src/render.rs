use tracing::warn;

use crate::{MeasuroError, Metric, RenderError, Result};

/// Consumes metrics during a render pass.
///
/// A render pass calls [`before`](Renderer::before) once, [`render`](Renderer::render) once per
/// metric in the registry's order, then [`after`](Renderer::after) once.  Errors from `before` or
/// `render` abort the pass and are returned to the caller; `after` still runs if `before`
/// succeeded.  Errors from `after` are never returned: the renderer's suppressed error flag is
/// raised instead, and cleared again at the start of the next pass.
pub trait Renderer {
    /// Called before the first metric of a pass.
    fn before(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Renders a single metric.
    fn render(&mut self, metric: &Metric) -> Result<(), RenderError>;

    /// Called after the last metric of a pass.
    fn after(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Whether the last call to `after` failed and the failure was suppressed.
    fn suppressed_error(&self) -> bool;

    /// Records whether the last call to `after` failed.
    fn set_suppressed_error(&mut self, suppressed: bool);
}

/// Brackets a render pass, running `after` when dropped.
pub(crate) struct RenderScope<'a> {
    renderer: &'a mut dyn Renderer,
}

impl<'a> RenderScope<'a> {
    pub fn begin(renderer: &'a mut dyn Renderer) -> Result<RenderScope<'a>> {
        renderer.set_suppressed_error(false);
        renderer.before().map_err(MeasuroError::Render)?;
        Ok(RenderScope { renderer })
    }

    pub fn render(&mut self, metric: &Metric) -> Result<()> {
        self.renderer.render(metric).map_err(MeasuroError::Render)
    }
}

impl Drop for RenderScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.renderer.after() {
            warn!(error = %e, "suppressed error from renderer cleanup");
            self.renderer.set_suppressed_error(true);
        }
    }
}
