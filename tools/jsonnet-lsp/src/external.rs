//! External collaborators: the `jsonnetfmt` formatter and the `jsonnet`
//! evaluator, both invoked as child processes. The server degrades
//! gracefully when either binary is missing.

use std::io::Write;
use std::process::{Command, Stdio};

use jsonnet_session::{
    parse_runtime_trace, EvalError, Evaluator, FmtConfiguration, FormatError, Formatter,
};
use tower_lsp::lsp_types::Url;
use tracing::debug;

/// Formatter backed by the `jsonnetfmt` binary.
pub struct JsonnetfmtFormatter;

// jsonnetfmt takes d(ouble), s(ingle), or l(eave) for strings and h(ash),
// s(lash), or l(eave) for comments
fn string_style_flag(style: &str) -> &'static str {
    match style {
        "\"" => "d",
        "'" => "s",
        _ => "l",
    }
}

fn comment_style_flag(style: &str) -> &'static str {
    match style {
        "#" => "h",
        "//" => "s",
        _ => "l",
    }
}

fn toggle(flag: bool, name: &str) -> String {
    if flag {
        format!("--{name}")
    } else {
        format!("--no-{name}")
    }
}

impl Formatter for JsonnetfmtFormatter {
    fn format(
        &self,
        filename: &str,
        contents: &str,
        options: &FmtConfiguration,
    ) -> Result<String, FormatError> {
        let mut child = Command::new("jsonnetfmt")
            .arg("--indent")
            .arg(options.indent.to_string())
            .arg("--max-blank-lines")
            .arg(options.max_blank_lines.to_string())
            .arg("--string-style")
            .arg(string_style_flag(&options.string_style))
            .arg("--comment-style")
            .arg(comment_style_flag(&options.comment_style))
            .arg(toggle(options.pretty_field_names, "pretty-field-names"))
            .arg(toggle(options.pad_arrays, "pad-arrays"))
            .arg(toggle(options.pad_objects, "pad-objects"))
            .arg(toggle(options.sort_imports, "sort-imports"))
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FormatError {
                message: format!("failed to run jsonnetfmt: {e}"),
            })?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(contents.as_bytes()).map_err(|e| FormatError {
                message: format!("failed to write to jsonnetfmt: {e}"),
            })?;
        }
        let output = child.wait_with_output().map_err(|e| FormatError {
            message: format!("jsonnetfmt did not finish: {e}"),
        })?;
        if !output.status.success() {
            debug!(filename, "jsonnetfmt rejected the document");
            return Err(FormatError {
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| FormatError {
            message: "jsonnetfmt produced invalid utf-8".to_string(),
        })
    }
}

/// Evaluator backed by the `jsonnet` binary, reading the file from disk
/// with the configured library paths.
pub struct JsonnetCliEvaluator {
    pub jpaths: Vec<String>,
}

impl Evaluator for JsonnetCliEvaluator {
    fn evaluate(&self, uri: &Url, _contents: &str) -> Result<String, EvalError> {
        let path = uri
            .to_file_path()
            .map_err(|_| EvalError::Unavailable(format!("not a file uri: {uri}")))?;

        let mut cmd = Command::new("jsonnet");
        for jp in &self.jpaths {
            cmd.arg("-J").arg(jp);
        }
        let output = cmd
            .arg(&path)
            .output()
            .map_err(|e| EvalError::Unavailable(format!("failed to run jsonnet: {e}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_runtime_trace(&stderr) {
            Some(err) => Err(EvalError::Runtime(err)),
            None => Err(EvalError::Unavailable(stderr.into_owned())),
        }
    }
}
