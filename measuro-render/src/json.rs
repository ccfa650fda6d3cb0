use std::io::{self, Write};

use measuro::{Metric, RenderError, Renderer, Value};
use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter, Serializer};
use serde_json::value::RawValue;

/// Renders metrics as a single JSON object keyed by metric name.
///
/// Each metric maps to an object with `value`, `unit`, `kind` and `description` fields.  Numeric
/// values are written as JSON numbers, strings and booleans as JSON strings holding the metric's
/// text.  Output is compact: no whitespace is written between tokens.
///
/// ```json
/// {"bytes_sent":{"value":1500,"unit":"bytes","kind":"UINT","description":"Bytes sent"}}
/// ```
#[derive(Debug)]
pub struct JsonRenderer<W: Write> {
    out: W,
    count: usize,
    suppressed: bool,
}

impl<W: Write> JsonRenderer<W> {
    /// Creates a new [`JsonRenderer`] writing to `out`.
    pub fn new(out: W) -> Self {
        JsonRenderer { out, count: 0, suppressed: false }
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

impl<W: Write> Renderer for JsonRenderer<W> {
    fn before(&mut self) -> Result<(), RenderError> {
        self.count = 0;
        self.out.write_all(b"{")?;
        Ok(())
    }

    fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
        let entry = Entry::new(metric)?;

        let mut buffer = Vec::with_capacity(128);
        if self.count > 0 {
            buffer.push(b',');
        }
        to_writer(&mut buffer, metric.name())?;
        buffer.push(b':');
        to_writer(&mut buffer, &entry)?;

        self.out.write_all(&buffer)?;
        self.count += 1;
        Ok(())
    }

    fn after(&mut self) -> Result<(), RenderError> {
        self.out.write_all(b"}")?;
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

#[derive(Serialize)]
struct Entry<'a> {
    value: EntryValue,
    unit: &'a str,
    kind: &'static str,
    description: &'a str,
}

impl<'a> Entry<'a> {
    fn new(metric: &'a Metric) -> serde_json::Result<Self> {
        let value = match metric.value() {
            Value::Float(v) if !v.is_finite() => EntryValue::Null,
            Value::String(_) | Value::Bool(_) => EntryValue::Text(metric.to_string()),
            // Keep the metric's own formatting, e.g. the two decimals of a rate.
            _ => EntryValue::Number(RawValue::from_string(metric.to_string())?),
        };

        Ok(Entry {
            value,
            unit: metric.unit(),
            kind: metric.kind_name(),
            description: metric.description(),
        })
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryValue {
    Number(Box<RawValue>),
    Text(String),
    Null,
}

fn to_writer<W, T>(writer: W, value: &T) -> serde_json::Result<()>
where
    W: Write,
    T: ?Sized + Serialize,
{
    value.serialize(&mut Serializer::with_formatter(writer, EscapingFormatter))
}

/// Compact formatting that also escapes `/`, and writes control characters without a short
/// escape as uppercase `\u00XX`.
#[derive(Clone, Copy, Debug, Default)]
struct EscapingFormatter;

impl Formatter for EscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut parts = fragment.split('/');
        if let Some(first) = parts.next() {
            writer.write_all(first.as_bytes())?;
        }
        for part in parts {
            writer.write_all(b"\\/")?;
            writer.write_all(part.as_bytes())?;
        }
        Ok(())
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        match char_escape {
            CharEscape::AsciiControl(byte) => write!(writer, "\\u{:04X}", byte),
            escape => CompactFormatter.write_char_escape(writer, escape),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use measuro::{Descriptor, Registry};
    use proptest::prelude::*;
    use quanta::Clock;

    fn rendered(registry: &Registry) -> String {
        let mut renderer = JsonRenderer::new(Vec::new());
        registry.render(&mut renderer, "").unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn literal(value: &str) -> String {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, value).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn string_literal_known_cases() {
        let cases = &[
            ("", "\"\""),
            ("plain", "\"plain\""),
            ("a\"b", "\"a\\\"b\""),
            ("back\\slash", "\"back\\\\slash\""),
            ("a/b", "\"a\\/b\""),
            ("\u{8}\t\n\u{c}\r", "\"\\b\\t\\n\\f\\r\""),
            ("\u{0}\u{1b}\u{1f}", "\"\\u0000\\u001B\\u001F\""),
            ("caf\u{e9}", "\"caf\u{e9}\""),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, &literal(input));
        }
    }

    #[test]
    fn render_string() {
        let registry = Registry::new();
        registry.create_string(Descriptor::new("test_name").description("test desc"), "init").unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":"init","unit":"","kind":"STR","description":"test desc"}}"#
        );
    }

    #[test]
    fn render_bool() {
        let registry = Registry::new();
        registry
            .create_bool_with_representations(
                Descriptor::new("test_name").description("test desc"),
                true,
                "yes",
                "no",
            )
            .unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":"yes","unit":"","kind":"BOOL","description":"test desc"}}"#
        );
    }

    #[test]
    fn render_numbers() {
        let descriptor = || Descriptor::new("test_name").unit("bps").description("test desc");

        let registry = Registry::new();
        registry.create_unsigned(descriptor(), 1024).unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":1024,"unit":"bps","kind":"UINT","description":"test desc"}}"#
        );

        let registry = Registry::new();
        registry.create_signed(descriptor(), -1024).unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":-1024,"unit":"bps","kind":"INT","description":"test desc"}}"#
        );

        let registry = Registry::new();
        registry.create_float(descriptor(), 100.75).unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":100.75,"unit":"bps","kind":"FLOAT","description":"test desc"}}"#
        );
    }

    #[test]
    fn render_non_finite_as_null() {
        let registry = Registry::new();
        registry.create_float("nan", f64::NAN).unwrap();
        registry.create_float("neg_inf", f64::NEG_INFINITY).unwrap();
        assert_eq!(
            rendered(&registry),
            concat!(
                r#"{"nan":{"value":null,"unit":"","kind":"FLOAT","description":""},"#,
                r#""neg_inf":{"value":null,"unit":"","kind":"FLOAT","description":""}}"#,
            )
        );
    }

    #[test]
    fn render_escapes_text_fields() {
        let registry = Registry::new();
        registry
            .create_string(Descriptor::new("path").unit("a/b").description("say \"hi\"\n"), "C:\\tmp/x")
            .unwrap();
        assert_eq!(
            rendered(&registry),
            r#"{"path":{"value":"C:\\tmp\/x","unit":"a\/b","kind":"STR","description":"say \"hi\"\n"}}"#
        );
    }

    #[test]
    fn render_rate() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::configure().clock(clock).build();
        let target = registry.create_unsigned("test_target", 0).unwrap();
        registry
            .create_rate_with_proxy(
                Descriptor::new("test_rate").unit("test_unit").description("test desc"),
                Arc::clone(&target),
                |v| v * 2.0,
            )
            .unwrap();

        target.set(1000);
        mock.increment(Duration::from_millis(5000));

        let mut renderer = JsonRenderer::new(Vec::new());
        registry.render(&mut renderer, "test_rate").unwrap();
        assert_eq!(
            String::from_utf8(renderer.into_inner()).unwrap(),
            r#"{"test_rate":{"value":400.00,"unit":"test_unit","kind":"RATE","description":"test desc"}}"#
        );
    }

    #[test]
    fn render_sum() {
        let registry = Registry::new();
        let sum = registry
            .create_sum(
                Descriptor::new("test_name").unit("bps").description("test desc"),
                Vec::<Arc<measuro::FloatMetric>>::new(),
            )
            .unwrap();
        for v in [10.25, 35.25, 100.25] {
            sum.add_target(Arc::new(measuro::FloatMetric::new("test_tgt", v)));
        }

        assert_eq!(
            rendered(&registry),
            r#"{"test_name":{"value":145.75,"unit":"bps","kind":"SUM","description":"test desc"}}"#
        );
    }

    #[test]
    fn render_multi() {
        let registry = Registry::new();
        registry.create_string(Descriptor::new("test_name2").description("test desc 2"), "val2").unwrap();
        registry.create_string(Descriptor::new("test_name1").description("test desc 1"), "val1").unwrap();
        assert_eq!(
            rendered(&registry),
            concat!(
                r#"{"test_name1":{"value":"val1","unit":"","kind":"STR","description":"test desc 1"},"#,
                r#""test_name2":{"value":"val2","unit":"","kind":"STR","description":"test desc 2"}}"#,
            )
        );
    }

    #[test]
    fn repeated_passes_are_independent() {
        let registry = Registry::new();
        registry.create_unsigned("a", 1).unwrap();
        registry.create_unsigned("b", 2).unwrap();

        let mut renderer = JsonRenderer::new(Vec::new());
        registry.render(&mut renderer, "").unwrap();
        registry.render(&mut renderer, "").unwrap();

        let single = r#"{"a":{"value":1,"unit":"","kind":"UINT","description":""},"b":{"value":2,"unit":"","kind":"UINT","description":""}}"#;
        assert_eq!(String::from_utf8(renderer.into_inner()).unwrap(), format!("{single}{single}"));
    }

    #[test]
    fn empty_registry() {
        assert_eq!(rendered(&Registry::new()), "{}");
    }

    proptest! {
        #[test]
        fn literal_has_no_raw_specials(input in ".*") {
            let result = literal(&input);
            let inner = &result[1..result.len() - 1];

            prop_assert!(result.starts_with('"') && result.ends_with('"'));
            prop_assert!(!inner.chars().any(|c| u32::from(c) < 0x20));

            // Every quote, slash and backslash in the body is part of an escape sequence.
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => prop_assert!(chars.next().is_some()),
                    '"' | '/' => prop_assert!(false, "unescaped {:?} in {:?}", c, result),
                    _ => {}
                }
            }
        }
    }
}
