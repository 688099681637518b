//! Line-protocol file sink and the shared line encoder.
//!
//! One line per record: `measurement[,tag=val...] field=val[,...] unixNanos`.
//! The encoder is also used by the time-series driver to render write points.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;

use crate::telemetry::{FieldValue, Stamped, Telemetry};

use super::ExportError;

/// Escape a tag value: `,`, ` ` and `=` are backslash-escaped.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a measurement name: `,` and ` ` are backslash-escaped.
fn escape_measurement(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render one field value: integers `i`-suffixed, floats bare, booleans
/// `true`/`false`, strings double-quoted with `\` and `"` escaped.
fn render_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(v) => format!("{}i", v),
        FieldValue::Float(v) => format!("{}", v),
        FieldValue::Boolean(v) => format!("{}", v),
        FieldValue::Text(v) => {
            let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{}\"", escaped)
        }
    }
}

/// Encode one line-protocol line.
///
/// Numeric fields are emitted before string fields. Tags with empty values
/// are dropped. Returns `None` when there are no fields at all, such a
/// record produces no line.
pub(crate) fn encode_line(
    measurement: &str,
    tags: &[(String, String)],
    fields: &[(String, FieldValue)],
    timestamp_nanos: i64,
) -> Option<String> {
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(measurement);
    for (key, value) in tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_tag(key));
        line.push('=');
        line.push_str(&escape_tag(value));
    }

    let (numeric, text): (Vec<_>, Vec<_>) =
        fields.iter().partition(|(_, value)| value.is_numeric());

    line.push(' ');
    let rendered: Vec<String> = numeric
        .iter()
        .chain(text.iter())
        .map(|(key, value)| format!("{}={}", key, render_field(value)))
        .collect();
    line.push_str(&rendered.join(","));

    line.push(' ');
    line.push_str(&timestamp_nanos.to_string());
    Some(line)
}

/// Line-protocol file sink.
///
/// Appends to `<kind>.lp` in the configured directory, creating the file on
/// first use. The file handle lives only for the duration of one export call.
#[derive(Debug)]
pub struct LineProtocolSink {
    dir: PathBuf,
}

impl LineProtocolSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append one line per record to the kind's `.lp` file.
    pub fn export<T: Telemetry>(&self, records: &[Stamped<T>]) -> Result<(), ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyBatch);
        }

        let mut lines = String::new();
        for record in records {
            match encode_record(record) {
                Some(line) => {
                    lines.push_str(&line);
                    lines.push('\n');
                }
                None => {
                    tracing::debug!(kind = %T::KIND, name = %record.name, "record has no fields, skipped");
                }
            }
        }

        if lines.is_empty() {
            tracing::warn!(kind = %T::KIND, "batch produced no lines, nothing written");
            return Ok(());
        }

        let path = self.dir.join(format!("{}.lp", T::KIND));
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(lines.as_bytes())
            .map_err(|source| ExportError::Io { path, source })
    }
}

/// Encode one stamped record as a line.
fn encode_record<T: Telemetry>(record: &Stamped<T>) -> Option<String> {
    let tags = vec![
        ("site".to_string(), record.site.to_string()),
        ("source".to_string(), record.source.to_string()),
        ("name".to_string(), record.name.clone()),
    ];

    let fields: Vec<(String, FieldValue)> = T::columns()
        .iter()
        .map(|column| column.to_string())
        .zip(record.record().values())
        .collect();

    // Stamped records always carry a collection time; the fallback covers
    // records stamped with an exactly-zero timestamp.
    let mut nanos = record.timestamp.timestamp_nanos_opt().unwrap_or_default();
    if nanos == 0 {
        nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    }

    encode_line(T::KIND.as_ref(), &tags, &fields, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Battery, Status};
    use chrono::DateTime;
    use std::sync::Arc;

    fn stamped_status(state: &str) -> Stamped<Status> {
        Stamped::new(
            Arc::new(Status {
                state: state.to_string(),
                code: 7,
                fault: false,
            }),
            2,
            3,
            "inverter-1",
        )
    }

    #[test]
    fn test_numeric_fields_before_strings() {
        let record = stamped_status("running");
        let line = encode_record(&record).unwrap();

        let fields = line.split(' ').nth(1).unwrap();
        assert_eq!(fields, "code=7i,fault=false,state=\"running\"");
    }

    #[test]
    fn test_string_field_escaping() {
        let record = stamped_status(r#"say "hi" c:\tmp"#);
        let line = encode_record(&record).unwrap();

        assert!(line.contains(r#"state="say \"hi\" c:\\tmp""#));
    }

    #[test]
    fn test_tag_escaping() {
        let record = Stamped::new(Arc::new(Battery::default()), 1, 1, "rack 1,a=b");
        let line = encode_record(&record).unwrap();

        assert!(line.starts_with("battery,site=1,source=1,name=rack\\ 1\\,a\\=b "));
    }

    #[test]
    fn test_zero_timestamp_falls_back_to_now() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        let record = stamped_status("idle").with_timestamp(epoch);
        let line = encode_record(&record).unwrap();

        let nanos: i64 = line.rsplit(' ').next().unwrap().parse().unwrap();
        assert!(nanos > 0);
    }

    #[test]
    fn test_stamped_timestamp_is_used() {
        let ts = DateTime::from_timestamp(1_700_000_000, 500).unwrap();
        let record = stamped_status("idle").with_timestamp(ts);
        let line = encode_record(&record).unwrap();

        assert!(line.ends_with(" 1700000000000000500"));
    }

    #[test]
    fn test_no_fields_yields_no_line() {
        assert_eq!(encode_line("m", &[], &[], 1), None);
    }

    #[test]
    fn test_export_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LineProtocolSink::new(dir.path());

        let records = vec![stamped_status("a"), stamped_status("b")];
        sink.export(&records).unwrap();
        sink.export(&records[..1]).unwrap();

        let content = std::fs::read_to_string(dir.path().join("status.lp")).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().all(|l| l.starts_with("status,")));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LineProtocolSink::new(dir.path());

        let err = sink.export::<Status>(&[]).unwrap_err();
        assert!(matches!(err, ExportError::EmptyBatch));
        assert!(!dir.path().join("status.lp").exists());
    }
}
