//! Renderers for [`measuro`] registries.
//!
//! Three formats are provided, each writing to any [`std::io::Write`]:
//!
//! - [`PlainRenderer`]: one `name = value unit` line per metric
//! - [`JsonRenderer`]: a single JSON object keyed by metric name
//! - [`PrometheusRenderer`]: the Prometheus text exposition format
//!
//! ```rust
//! use measuro::{Descriptor, Registry};
//! use measuro_render::PlainRenderer;
//!
//! let registry = Registry::new();
//! let sent = registry.create_unsigned(Descriptor::new("bytes_sent").unit("bytes"), 0).unwrap();
//! sent.add(1500);
//!
//! let mut renderer = PlainRenderer::new(Vec::new());
//! registry.render(&mut renderer, "").unwrap();
//!
//! assert_eq!(renderer.into_inner(), b"bytes_sent = 1500 bytes\n\n");
//! ```
#![deny(missing_docs)]

mod json;
pub use self::json::JsonRenderer;

mod plain;
pub use self::plain::PlainRenderer;

mod prometheus;
pub use self::prometheus::PrometheusRenderer;
