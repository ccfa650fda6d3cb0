use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, error};

use crate::registry::Shared;
use crate::{Renderer, Result};

type BoxedRenderer = Box<dyn Renderer + Send>;

/// A background thread rendering a registry at a fixed interval.
///
/// The thread waits on a stop channel with a timeout of one interval: a timeout triggers a render,
/// a message or a disconnect ends the thread.  Stopping joins the thread, so no render can start
/// once [`stop`](RenderSchedule::stop) or `drop` has returned.
pub(crate) struct RenderSchedule {
    stop: Sender<()>,
    handle: Option<JoinHandle<BoxedRenderer>>,
}

impl RenderSchedule {
    pub fn start(
        shared: Arc<Shared>,
        mut renderer: BoxedRenderer,
        interval: Duration,
    ) -> Result<RenderSchedule> {
        let (stop, stopped) = bounded::<()>(1);

        let handle = thread::Builder::new().name("measuro-render".to_owned()).spawn(move || {
            debug!(?interval, "render schedule started");
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = shared.render(renderer.as_mut(), "") {
                            error!(error = %e, "scheduled render failed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("render schedule stopped");
            renderer
        })?;

        Ok(RenderSchedule { stop, handle: Some(handle) })
    }

    /// Stops the thread and hands back its renderer.
    ///
    /// Returns `None` if the thread panicked.
    pub fn stop(mut self) -> Option<BoxedRenderer> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<BoxedRenderer> {
        let handle = self.handle.take()?;
        let _ = self.stop.send(());
        handle.join().ok()
    }
}

impl Drop for RenderSchedule {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
