//! Evaluation diagnostics.
//!
//! Evaluation itself is external: the transport layer wires an
//! [`Evaluator`] (typically the `jsonnet` binary) and this module turns a
//! runtime failure into diagnostics. Each stack frame inside the active
//! file becomes one diagnostic; the most specific frame is an Error to
//! draw attention to the closest known root cause, the rest are Warnings.

use std::fmt;

use jsonnet_ast::{Location, LocationRange};
use jsonnet_linter::{range_to_diag, DiagCode, Diagnostic, Severity};
use url::Url;

/// One frame of a runtime stack trace.
#[derive(Clone, Debug, PartialEq)]
pub struct StackFrame {
    pub range: LocationRange,
    pub name: String,
}

/// A runtime evaluation failure with its trace.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    pub message: String,
    pub stack: Vec<StackFrame>,
}

#[derive(Clone, Debug)]
pub enum EvalError {
    /// The program evaluated and failed with a trace.
    Runtime(RuntimeError),
    /// The evaluator itself could not run.
    Unavailable(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Runtime(err) => write!(f, "runtime error: {}", err.message),
            EvalError::Unavailable(msg) => write!(f, "evaluator unavailable: {msg}"),
        }
    }
}

/// An external Jsonnet evaluator.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, uri: &Url, contents: &str) -> Result<String, EvalError>;
}

/// Map a runtime error to diagnostics for `filename`. Frames in other
/// files are skipped; the importing file is never failed for them.
pub fn runtime_error_diags(err: &RuntimeError, filename: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut seen_root_cause = false;
    for frame in &err.stack {
        if &*frame.range.filename != filename {
            continue;
        }
        let severity = if seen_root_cause {
            Severity::Warning
        } else {
            Severity::Error
        };
        seen_root_cause = true;
        diags.push(Diagnostic {
            range: range_to_diag(&frame.range),
            severity,
            code: Some(DiagCode::RuntimeError),
            message: err.message.clone(),
            source: Some("jsonnet".to_string()),
        });
    }
    diags
}

/// Parse the trace format the `jsonnet` CLI prints on stderr:
///
/// ```text
/// RUNTIME ERROR: division by zero.
///         file.jsonnet:3:12-17        thunk <a>
///         file.jsonnet:(1:1)-(4:2)    object <anonymous>
///         During manifestation
/// ```
pub fn parse_runtime_trace(stderr: &str) -> Option<RuntimeError> {
    let mut lines = stderr.lines();
    let message = loop {
        let line = lines.next()?;
        if let Some(msg) = line.strip_prefix("RUNTIME ERROR:") {
            break msg.trim().to_string();
        }
    };

    let mut stack = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (loc_part, name) = match line.split_once(char::is_whitespace) {
            Some((loc, name)) => (loc, name.trim().to_string()),
            None => (line, String::new()),
        };
        if let Some(range) = parse_trace_location(loc_part) {
            stack.push(StackFrame { range, name });
        }
    }
    Some(RuntimeError { message, stack })
}

/// `file:3:12`, `file:3:12-17`, or `file:(1:1)-(4:2)`.
fn parse_trace_location(loc: &str) -> Option<LocationRange> {
    // split the filename off at the first colon that starts a location
    if let Some(rest) = loc.find(":(").map(|i| (&loc[..i], &loc[i + 1..])) {
        let (filename, spans) = rest;
        let (begin, end) = spans.split_once("-")?;
        let begin = parse_paren_pos(begin)?;
        let end = parse_paren_pos(end)?;
        return Some(LocationRange {
            filename: filename.into(),
            begin,
            end,
        });
    }

    let mut parts = loc.rsplitn(3, ':');
    let cols = parts.next()?;
    let line: u32 = parts.next()?.parse().ok()?;
    let filename = parts.next()?;
    let (col_begin, col_end) = match cols.split_once('-') {
        Some((a, b)) => (a.parse().ok()?, b.parse().ok()?),
        None => {
            let col: u32 = cols.parse().ok()?;
            (col, col)
        }
    };
    Some(LocationRange {
        filename: filename.into(),
        begin: Location::new(line, col_begin),
        end: Location::new(line, col_end),
    })
}

fn parse_paren_pos(s: &str) -> Option<Location> {
    let s = s.strip_prefix('(')?.strip_suffix(')')?;
    let (line, col) = s.split_once(':')?;
    Some(Location::new(line.parse().ok()?, col.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line_frames() {
        let trace = "RUNTIME ERROR: division by zero.\n\
                     \tmain.jsonnet:3:12-17\tthunk <a>\n\
                     \tmain.jsonnet:1:1\t$\n";
        let err = parse_runtime_trace(trace).unwrap();
        assert_eq!(err.message, "division by zero.");
        assert_eq!(err.stack.len(), 2);
        assert_eq!(&*err.stack[0].range.filename, "main.jsonnet");
        assert_eq!(err.stack[0].range.begin, Location::new(3, 12));
        assert_eq!(err.stack[0].range.end, Location::new(3, 17));
        assert_eq!(err.stack[0].name, "thunk <a>");
    }

    #[test]
    fn parses_multi_line_frames() {
        let trace = "RUNTIME ERROR: boom\n\
                     \tlib.jsonnet:(1:1)-(4:2)\tobject <anonymous>\n";
        let err = parse_runtime_trace(trace).unwrap();
        assert_eq!(err.stack[0].range.begin, Location::new(1, 1));
        assert_eq!(err.stack[0].range.end, Location::new(4, 2));
    }

    #[test]
    fn non_location_lines_are_skipped() {
        let trace = "RUNTIME ERROR: boom\n\tDuring manifestation\t\n";
        let err = parse_runtime_trace(trace).unwrap();
        assert!(err.stack.is_empty());
    }

    #[test]
    fn most_specific_frame_is_the_error() {
        let err = RuntimeError {
            message: "boom".to_string(),
            stack: vec![
                StackFrame {
                    range: LocationRange {
                        filename: "other.jsonnet".into(),
                        begin: Location::new(1, 1),
                        end: Location::new(1, 2),
                    },
                    name: String::new(),
                },
                StackFrame {
                    range: LocationRange {
                        filename: "main.jsonnet".into(),
                        begin: Location::new(3, 1),
                        end: Location::new(3, 5),
                    },
                    name: String::new(),
                },
                StackFrame {
                    range: LocationRange {
                        filename: "main.jsonnet".into(),
                        begin: Location::new(9, 1),
                        end: Location::new(9, 2),
                    },
                    name: String::new(),
                },
            ],
        };
        let diags = runtime_error_diags(&err, "main.jsonnet");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[1].severity, Severity::Warning);
        assert!(diags.iter().all(|d| d.message == "boom"));
    }
}
