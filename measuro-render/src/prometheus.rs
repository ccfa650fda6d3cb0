use std::fmt;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use measuro::{Metric, RenderError, Renderer};

type TimestampFn = Box<dyn Fn() -> u64 + Send>;

/// Renders metrics in the Prometheus [text exposition format].
///
/// Each metric is written as a `# HELP` line followed by a sample line carrying the timestamp
/// returned by the renderer's timestamp function.  Metric names are prefixed with the renderer's
/// namespace and suffixed with the metric's unit, if it has one.
///
/// Names are reduced to the characters Prometheus allows, and a metric whose name does not start
/// with a valid character is skipped.  String metrics have no numeric value and are skipped too;
/// boolean metrics are written as `1` or `0`.
///
/// [text exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub struct PrometheusRenderer<W: Write> {
    out: W,
    timestamp: TimestampFn,
    namespace: String,
    count: usize,
    suppressed: bool,
}

impl<W: Write> PrometheusRenderer<W> {
    /// Creates a new [`PrometheusRenderer`] writing to `out`, timestamping samples with the current
    /// system time in milliseconds since the Unix epoch.
    pub fn new<S: Into<String>>(out: W, namespace: S) -> Self {
        Self::with_timestamp(out, namespace, system_time_millis)
    }

    /// Creates a new [`PrometheusRenderer`] writing to `out`, timestamping samples with the
    /// value returned by `timestamp`.
    pub fn with_timestamp<S, F>(out: W, namespace: S, timestamp: F) -> Self
    where
        S: Into<String>,
        F: Fn() -> u64 + Send + 'static,
    {
        PrometheusRenderer {
            out,
            timestamp: Box::new(timestamp),
            namespace: namespace.into(),
            count: 0,
            suppressed: false,
        }
    }

    /// Gets the namespace prefixed to every metric name.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Gets a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consumes the renderer, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn exposition_name(&self, metric: &Metric) -> Option<String> {
        let name = sanitize_metric_name(metric.name());
        if !name.starts_with(valid_metric_name_start_character) {
            return None;
        }

        let unit = sanitize_unit(metric.unit());
        let mut buffer = String::with_capacity(self.namespace.len() + name.len() + unit.len() + 3);
        if !self.namespace.is_empty() {
            buffer.push_str(&self.namespace);
            buffer.push_str("::");
        }
        buffer.push_str(&name);
        if !unit.is_empty() {
            buffer.push('_');
            buffer.push_str(&unit);
        }
        Some(buffer)
    }
}

impl<W: Write> Renderer for PrometheusRenderer<W> {
    fn before(&mut self) -> Result<(), RenderError> {
        self.count = 0;
        Ok(())
    }

    fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
        let value = match metric {
            Metric::String(_) => return Ok(()),
            Metric::Bool(m) => u8::from(m.get()).to_string(),
            m => m.to_string(),
        };
        let Some(name) = self.exposition_name(metric) else {
            return Ok(());
        };

        if self.count > 0 {
            self.out.write_all(b"\n")?;
        }
        write!(
            self.out,
            "# HELP {} {}\n{} {} {}",
            name,
            sanitize_description(metric.description()),
            name,
            value,
            (self.timestamp)(),
        )?;
        self.count += 1;
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

impl<W: Write + fmt::Debug> fmt::Debug for PrometheusRenderer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusRenderer")
            .field("out", &self.out)
            .field("namespace", &self.namespace)
            .field("count", &self.count)
            .field("suppressed", &self.suppressed)
            .finish_non_exhaustive()
    }
}

fn system_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Drops every character not allowed in a Prometheus metric name.
///
/// The result may still start with a character that is only valid after the first position.
fn sanitize_metric_name(name: &str) -> String {
    name.chars().filter(|c| valid_metric_name_character(*c)).collect()
}

/// Lowercases a unit and drops everything but ASCII letters and digits.
fn sanitize_unit(unit: &str) -> String {
    unit.chars().filter(char::is_ascii_alphanumeric).map(|c| c.to_ascii_lowercase()).collect()
}

/// Escapes line feeds and backslashes in a help line.
fn sanitize_description(description: &str) -> String {
    let mut sanitized = String::with_capacity(description.len());
    for c in description.chars() {
        match c {
            '\n' => sanitized.push_str("\\n"),
            '\\' => sanitized.push_str("\\\\"),
            c => sanitized.push(c),
        }
    }
    sanitized
}

#[inline]
fn valid_metric_name_start_character(c: char) -> bool {
    // [a-zA-Z_:]
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

#[inline]
fn valid_metric_name_character(c: char) -> bool {
    // [a-zA-Z0-9_:]
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}
