//! Structured JSONL trace of host invocations.
//!
//! A trace is a stream of [`TraceRecord`]s: one header, one `invoke` entry per
//! host call (constructors, methods, static calls), and a footer written by
//! [`TraceEmitter::finalize`]. A trace without a footer was cut short.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// Current trace schema version.
pub const TRACE_SCHEMA_VERSION: &str = "1";

/// Values above this many bytes are recorded by hash only.
const INLINE_VALUE_LIMIT: usize = 1024;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("write {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Tagged trace value. Functions, classes and host objects are recorded by
/// their display form under `Ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum TraceValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    List(Vec<TraceValue>),
    Ref(String),
}

impl TraceValue {
    pub fn from_value(val: &Value) -> Self {
        match val {
            Value::Null => TraceValue::Null,
            Value::Bool(b) => TraceValue::Bool(*b),
            Value::Int(n) => TraceValue::Int(i64::from(*n)),
            Value::Long(n) => TraceValue::Int(*n),
            Value::Float(f) => TraceValue::Float(*f),
            Value::Char(c) => TraceValue::Char(*c),
            Value::Str(s) => TraceValue::Str(s.clone()),
            Value::List(items) => TraceValue::List(items.iter().map(Self::from_value).collect()),
            other => TraceValue::Ref(other.to_string()),
        }
    }

    fn to_hash_string(&self) -> String {
        match self {
            TraceValue::Null => "null".to_string(),
            TraceValue::Bool(b) => b.to_string(),
            TraceValue::Int(n) => n.to_string(),
            TraceValue::Float(f) => f.to_string(),
            TraceValue::Char(c) => c.to_string(),
            TraceValue::Str(s) | TraceValue::Ref(s) => s.clone(),
            TraceValue::List(items) => {
                let parts: Vec<String> = items.iter().map(Self::to_hash_string).collect();
                format!("[{}]", parts.join(","))
            }
        }
    }
}

/// One host invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceEntry {
    pub seq: u64,
    pub timestamp: String,
    /// Fully-qualified class name.
    pub target: String,
    /// Member name, or `new` for construction.
    pub member: String,
    pub inputs: Vec<TraceValue>,
    pub output: TraceOutput,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceOutput {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TraceValue>,
    pub value_hash: String,
    pub value_size: usize,
}

impl TraceOutput {
    pub fn ok(val: &Value) -> Self {
        let tv = TraceValue::from_value(val);
        let s = tv.to_hash_string();
        let value = (s.len() <= INLINE_VALUE_LIMIT).then_some(tv);
        TraceOutput {
            status: "ok".to_string(),
            value,
            value_hash: sha256_hex(&s),
            value_size: s.len(),
        }
    }

    pub fn error(msg: &str) -> Self {
        TraceOutput {
            status: "error".to_string(),
            value: Some(TraceValue::Str(msg.to_string())),
            value_hash: sha256_hex(msg),
            value_size: msg.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record")]
pub enum TraceRecord {
    #[serde(rename = "header")]
    Header(TraceHeader),
    #[serde(rename = "invoke")]
    Invoke(TraceEntry),
    #[serde(rename = "footer")]
    Footer(TraceFooter),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceHeader {
    pub schema_version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceFooter {
    pub timestamp: String,
    pub invoke_count: u64,
    /// "success", "error", or "unfinished" when the shell was dropped first.
    pub program_status: String,
}

/// Writes [`TraceRecord`]s as JSON lines. A disabled emitter accepts every
/// call and writes nothing.
pub struct TraceEmitter {
    seq: u64,
    writer: Option<Box<dyn Write>>,
    finalized: bool,
}

impl std::fmt::Debug for TraceEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceEmitter")
            .field("seq", &self.seq)
            .field("enabled", &self.writer.is_some())
            .finish()
    }
}

impl Default for TraceEmitter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TraceEmitter {
    /// Start a trace on `writer`, emitting the header immediately.
    pub fn new(mut writer: Box<dyn Write>) -> Result<Self, TraceError> {
        let header = TraceRecord::Header(TraceHeader {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            timestamp: now_iso8601(),
        });
        write_record(&mut writer, &header, "header")?;
        Ok(Self {
            seq: 0,
            writer: Some(writer),
            finalized: false,
        })
    }

    pub fn disabled() -> Self {
        Self {
            seq: 0,
            writer: None,
            finalized: false,
        }
    }

    /// Return the next sequence number and advance the counter.
    pub fn next_seq(&mut self) -> u64 {
        let s = self.seq;
        self.seq += 1;
        s
    }

    /// Record one host invocation.
    pub fn emit(
        &mut self,
        target: &str,
        member: &str,
        inputs: &[Value],
        output: TraceOutput,
        duration: std::time::Duration,
    ) -> Result<(), TraceError> {
        if self.writer.is_none() {
            return Ok(());
        }
        let seq = self.next_seq();
        let entry = TraceEntry {
            seq,
            timestamp: now_iso8601(),
            target: target.to_string(),
            member: member.to_string(),
            inputs: inputs.iter().map(TraceValue::from_value).collect(),
            output,
            duration_ms: duration.as_millis() as u64,
        };
        match self.writer.as_mut() {
            Some(w) => write_record(w, &TraceRecord::Invoke(entry), "invoke"),
            None => Ok(()),
        }
    }

    /// Write the footer and flush. Later calls are no-ops.
    pub fn finalize(&mut self, program_status: &str) -> Result<(), TraceError> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        let invoke_count = self.seq;
        if let Some(w) = self.writer.as_mut() {
            let footer = TraceRecord::Footer(TraceFooter {
                timestamp: now_iso8601(),
                invoke_count,
                program_status: program_status.to_string(),
            });
            write_record(w, &footer, "footer")?;
            w.flush().map_err(|source| TraceError::Write {
                what: "flush",
                source,
            })?;
        }
        Ok(())
    }
}

fn write_record(
    w: &mut Box<dyn Write>,
    record: &TraceRecord,
    what: &'static str,
) -> Result<(), TraceError> {
    let json =
        serde_json::to_string(record).map_err(|source| TraceError::Serialize { what, source })?;
    writeln!(w, "{json}").map_err(|source| TraceError::Write { what, source })
}

/// SHA-256 hex digest, prefixed with "sha256:".
pub fn sha256_hex(data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// ISO 8601 UTC timestamp with millisecond precision.
fn now_iso8601() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();

    // civil-from-days (Howard Hinnant)
    let days = (secs / 86_400) as i64;
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i64 + era * 400 + i64::from(month <= 2);

    let rem = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        now.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn header_entries_footer() {
        let sink = Sink::default();
        let mut t = TraceEmitter::new(Box::new(sink.clone())).unwrap();
        t.emit(
            "std.Math",
            "abs",
            &[Value::Int(-3)],
            TraceOutput::ok(&Value::Int(3)),
            std::time::Duration::ZERO,
        )
        .unwrap();
        t.finalize("success").unwrap();
        t.finalize("success").unwrap();

        let text = String::from_utf8(sink.0.borrow().clone()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["record"], "header");
        assert_eq!(lines[1]["record"], "invoke");
        assert_eq!(lines[1]["member"], "abs");
        assert_eq!(lines[1]["inputs"][0]["t"], "Int");
        assert_eq!(lines[1]["output"]["value_hash"], sha256_hex("3"));
        assert_eq!(lines[2]["record"], "footer");
        assert_eq!(lines[2]["invoke_count"], 1);
    }

    #[test]
    fn large_outputs_are_hashed_only() {
        let big = Value::from("x".repeat(INLINE_VALUE_LIMIT + 1));
        let out = TraceOutput::ok(&big);
        assert!(out.value.is_none());
        assert_eq!(out.value_size, INLINE_VALUE_LIMIT + 1);
    }

    #[test]
    fn timestamp_shape() {
        let ts = now_iso8601();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }
}
