//! Prometheus text exposition for metric samples
//!
//! Samples are written one per line as `name{label="value",...} value`.
//! The brace block is omitted when a sample carries no labels.

use crate::metrics::MetricSample;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Writes metric samples to an output stream in exposition format
pub struct MetricEmitter<W: Write> {
    writer: W,
    prefix: String,
    emitted: usize,
}

impl<W: Write> MetricEmitter<W> {
    /// Create an emitter that namespaces every metric with `prefix`
    ///
    /// An empty prefix writes metric names unchanged.
    pub fn new(writer: W, prefix: impl Into<String>) -> Self {
        Self {
            writer,
            prefix: prefix.into(),
            emitted: 0,
        }
    }

    /// Write a single sample line
    pub fn emit(&mut self, sample: &MetricSample) -> io::Result<()> {
        let line = render_sample(&self.prefix, sample);
        self.writer.write_all(line.as_bytes())?;
        self.emitted += 1;
        Ok(())
    }

    /// Write every sample in order, stopping at the first write failure
    pub fn emit_all<'a, I>(&mut self, samples: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a MetricSample>,
    {
        for sample in samples {
            self.emit(sample)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Number of lines written so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render one sample, including the trailing newline
pub fn render_sample(prefix: &str, sample: &MetricSample) -> String {
    let mut line = String::with_capacity(64);

    if !prefix.is_empty() {
        line.push_str(prefix);
        line.push('_');
    }
    line.push_str(sample.name());

    if !sample.labels().is_empty() {
        line.push('{');
        for (i, (key, value)) in sample.labels().iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}=\"{}\"", key, escape_label_value(value));
        }
        line.push('}');
    }

    line.push(' ');
    line.push_str(&format_value(sample.value()));
    line.push('\n');
    line
}

/// Escape a label value for use inside double quotes
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Format a sample value the way the exposition format spells numbers
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // Display prints integral floats without a fractional part
        value.to_string()
    }
}
