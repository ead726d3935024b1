//! The document-update pipeline.
//!
//! Runs inside the overlay's update callback (under the per-file update
//! lock), so diagnostics are produced exactly once per drained batch and
//! published in version order. A parse failure yields the parse diagnostic
//! alone — lints over a stale tree would mislead. Evaluation only runs when
//! enabled and when the linter found no errors, to avoid burning CPU on
//! obviously broken files while the user types.

use jsonnet_linter::{has_errors, range_to_diag, Diagnostic, Severity};
use jsonnet_overlay::UpdateResult;
use tracing::trace;
use url::Url;

use crate::config::Configuration;
use crate::eval::{runtime_error_diags, EvalError, Evaluator};
use crate::parse::ParseResult;
use crate::resolver::SessionResolver;
use crate::session::Session;

/// Diagnostics for one overlay update; `None` when there is nothing to
/// publish (the file was closed).
pub fn process_update(
    uri: &Url,
    result: &UpdateResult<ParseResult>,
    session: &Session,
    config: &Configuration,
    evaluator: Option<&dyn Evaluator>,
) -> Option<(i64, Vec<Diagnostic>)> {
    let current = result.current.as_ref()?;
    let mut diags: Vec<Diagnostic> = Vec::new();

    if let Some(err) = current.data.static_err() {
        // the tree failed to parse; report that and nothing else
        diags.push(Diagnostic {
            severity: Severity::Error,
            range: range_to_diag(&err.range),
            message: err.message.clone(),
            code: None,
            source: Some("jsonnet".to_string()),
        });
    } else if let Some(parsed) = &result.parsed {
        if config.diag.linter && current.version == parsed.version {
            if let Some(root) = &parsed.data.root {
                let resolver = SessionResolver::new(uri.clone(), root.clone(), session);
                let root_ref = jsonnet_ast::NodeRef::root(root);
                diags.extend(jsonnet_linter::lint_ast(&root_ref, &resolver));

                if config.diag.evaluate && !has_errors(&diags) {
                    if let Some(evaluator) = evaluator {
                        diags.extend(evaluate(uri, &current.contents, root, evaluator));
                    }
                }
            }
        }
    }

    trace!(%uri, version = current.version, count = diags.len(), "update diagnostics ready");
    Some((current.version, diags))
}

fn evaluate(
    uri: &Url,
    contents: &str,
    root: &std::sync::Arc<jsonnet_ast::Ast>,
    evaluator: &dyn Evaluator,
) -> Vec<Diagnostic> {
    match evaluator.evaluate(uri, contents) {
        Ok(_) => Vec::new(),
        Err(EvalError::Runtime(err)) => runtime_error_diags(&err, root.filename()),
        Err(EvalError::Unavailable(msg)) => {
            trace!(%uri, msg, "evaluator unavailable");
            Vec::new()
        }
    }
}
