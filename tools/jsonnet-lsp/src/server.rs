//! The language server: protocol handlers wired to the overlay, the
//! session, the linter, and the query features.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jsonnet_ast::{Ast, NodeRef};
use jsonnet_overlay::{Overlay, TextEdit as OverlayEdit, UpdateResult};
use jsonnet_session::features::{self, CompletionContext};
use jsonnet_session::{
    parse_with_recovery, process_update, Configuration, Evaluator, Formatter, FsImporter,
    ParseResult, Session, SessionResolver,
};
use parking_lot::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::convert;
use crate::external::{JsonnetCliEvaluator, JsonnetfmtFormatter};

/// Workspace-scoped state created at `initialize`.
struct WorkspaceState {
    importer: Arc<FsImporter>,
    session: Session,
}

pub struct JsonnetLanguageServer {
    client: Client,
    overlay: Arc<Overlay<ParseResult>>,
    workspace: RwLock<Option<Arc<WorkspaceState>>>,
    config: RwLock<Arc<Configuration>>,
    formatter: JsonnetfmtFormatter,
    /// Set when the last edit ended in `.`; changes completion behavior
    /// for clients that don't report the trigger character.
    last_char_is_dot: AtomicBool,
}

impl JsonnetLanguageServer {
    pub fn new(client: Client) -> Self {
        JsonnetLanguageServer {
            client,
            overlay: Arc::new(Overlay::new()),
            workspace: RwLock::new(None),
            config: RwLock::new(Arc::new(Configuration::default())),
            formatter: JsonnetfmtFormatter,
            last_char_is_dot: AtomicBool::new(false),
        }
    }

    fn workspace(&self) -> Option<Arc<WorkspaceState>> {
        self.workspace.read().clone()
    }

    fn config(&self) -> Arc<Configuration> {
        self.config.read().clone()
    }

    fn filename_of(uri: &Url) -> String {
        uri.to_file_path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| uri.path().to_string())
    }

    /// Latest parsed root for a document.
    fn current_ast(&self, uri: &Url) -> Option<Arc<Ast>> {
        self.overlay.parsed(uri)?.data.root.clone()
    }

    fn resolver<'a>(&self, uri: &Url, session: &'a Session) -> Option<SessionResolver<'a>> {
        let root = self.current_ast(uri)?;
        Some(SessionResolver::new(uri.clone(), root, session))
    }

    /// Run an overlay update and publish the resulting diagnostics.
    async fn apply_update(&self, uri: Url, version: i64, change: DocumentChange) {
        let Some(workspace) = self.workspace() else {
            warn!("document update before initialize");
            return;
        };
        let config = self.config();
        let filename = Self::filename_of(&uri);

        let evaluator: Option<Box<dyn Evaluator>> = if config.diag.evaluate {
            Some(Box::new(JsonnetCliEvaluator {
                jpaths: config.jpaths.clone(),
            }))
        } else {
            None
        };

        let mut published: Option<(i64, Vec<jsonnet_linter::Diagnostic>)> = None;
        {
            let session = &workspace.session;
            let parse = move |text: &str, last: Option<&OverlayEdit>| -> (ParseResult, bool) {
                let res = parse_with_recovery(&filename, text, last);
                let ok = res.root.is_some();
                (res, ok)
            };
            let done = |result: UpdateResult<ParseResult>| {
                published = process_update(
                    &uri,
                    &result,
                    session,
                    config.as_ref(),
                    evaluator.as_deref(),
                );
            };
            match change {
                DocumentChange::Replace(text) => {
                    self.overlay.replace(&uri, version, text, parse, done)
                }
                DocumentChange::Edits(edits) => {
                    self.overlay.update(&uri, version, edits, parse, done)
                }
            }
        }

        if let Some((version, diags)) = published {
            let diags: Vec<Diagnostic> = diags.iter().map(convert::diag_to_proto).collect();
            self.client
                .publish_diagnostics(uri, diags, Some(version as i32))
                .await;
        }
    }
}

enum DocumentChange {
    Replace(String),
    Edits(Vec<OverlayEdit>),
}

fn root_directory(params: &InitializeParams) -> PathBuf {
    if let Some(folders) = &params.workspace_folders {
        if let Some(folder) = folders.first() {
            if let Ok(path) = folder.uri.to_file_path() {
                return path;
            }
        }
    }
    #[allow(deprecated)]
    if let Some(root_uri) = &params.root_uri {
        if let Ok(path) = root_uri.to_file_path() {
            return path;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Incremental changes become edits; a rangeless change is a full replace.
fn change_events_to_change(mut changes: Vec<TextDocumentContentChangeEvent>) -> DocumentChange {
    if changes.iter().any(|c| c.range.is_none()) {
        let text = changes.pop().map(|c| c.text).unwrap_or_default();
        return DocumentChange::Replace(text);
    }
    let edits = changes
        .into_iter()
        .filter_map(|change| {
            Some(OverlayEdit {
                range: convert::proto_to_range(change.range?),
                new_text: change.text,
            })
        })
        .collect();
    DocumentChange::Edits(edits)
}

#[tower_lsp::async_trait]
impl LanguageServer for JsonnetLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = root_directory(&params);
        info!(root = %root.display(), "initializing");

        // well-known generated-output directories become search paths
        let mut search_paths = Vec::new();
        if root.join("bazel-bin").is_dir() {
            search_paths.push("bazel-bin".to_string());
        }

        let importer = Arc::new(FsImporter::new(
            root,
            search_paths,
            self.overlay.clone(),
        ));
        let session = Session::new(importer.clone());
        *self.workspace.write() = Some(Arc::new(WorkspaceState { importer, session }));

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..Default::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string(), "/".to_string()]),
                    ..Default::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string()]),
                    retrigger_characters: Some(vec![",".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "jsonnet-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::LOG, "Jsonnet language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let config: Configuration = match serde_json::from_value(params.settings) {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "ignoring malformed configuration payload");
                return;
            }
        };
        if let Some(workspace) = self.workspace() {
            workspace.importer.set_jpaths(config.jpaths.clone());
        }
        *self.config.write() = Arc::new(config);
        debug!("configuration updated");
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        debug!(uri = %params.text_document.uri, version = params.text_document.version, "did-open");
        self.apply_update(
            params.text_document.uri,
            i64::from(params.text_document.version),
            DocumentChange::Replace(params.text_document.text),
        )
        .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = i64::from(params.text_document.version);

        let ends_with_dot = params
            .content_changes
            .last()
            .map(|c| c.text.ends_with('.'))
            .unwrap_or(false);
        self.last_char_is_dot.store(ends_with_dot, Ordering::Relaxed);

        let change = change_events_to_change(params.content_changes);
        self.apply_update(uri, version, change).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!(uri = %params.text_document.uri, "did-close");
        self.overlay.close(&params.text_document.uri);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let Some(workspace) = self.workspace() else {
            return Ok(None);
        };
        let Some(resolver) = self.resolver(&uri, &workspace.session) else {
            return Ok(None);
        };

        let trigger = params
            .context
            .as_ref()
            .and_then(|c| c.trigger_character.as_deref());
        let ctx = CompletionContext {
            dot: trigger == Some(".") || self.last_char_is_dot.load(Ordering::Relaxed),
            slash: trigger == Some("/"),
        };

        let pos = convert::proto_to_pos(params.text_document_position.position);
        let items = features::completion(&resolver, pos, ctx, &*workspace.importer);
        Ok(Some(CompletionResponse::Array(
            items.into_iter().map(convert::completion_to_proto).collect(),
        )))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some(workspace) = self.workspace() else {
            return Ok(None);
        };
        let Some(resolver) = self.resolver(&uri, &workspace.session) else {
            return Ok(None);
        };

        let pos = convert::proto_to_pos(params.text_document_position_params.position);
        let Some(result) = features::hover(&resolver, pos) else {
            return Ok(None);
        };
        Ok(Some(Hover {
            range: result.range.as_ref().map(convert::range_to_proto),
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::PlainText,
                value: result.contents,
            }),
        }))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some(workspace) = self.workspace() else {
            return Ok(None);
        };
        let Some(resolver) = self.resolver(&uri, &workspace.session) else {
            return Ok(None);
        };

        let pos = convert::proto_to_pos(params.text_document_position_params.position);
        let Some(help) = features::signature_help(&resolver, pos) else {
            return Ok(None);
        };
        Ok(Some(SignatureHelp {
            signatures: vec![SignatureInformation {
                label: help.label,
                documentation: Some(Documentation::String(help.documentation)),
                parameters: Some(
                    help.params
                        .into_iter()
                        .map(|p| ParameterInformation {
                            label: ParameterLabel::Simple(p.label),
                            documentation: Some(Documentation::String(p.documentation)),
                        })
                        .collect(),
                ),
                active_parameter: Some(help.active_param as u32),
            }],
            active_signature: Some(0),
            active_parameter: Some(help.active_param as u32),
        }))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some(workspace) = self.workspace() else {
            return Ok(None);
        };
        let Some(resolver) = self.resolver(&uri, &workspace.session) else {
            return Ok(None);
        };

        let pos = convert::proto_to_pos(params.text_document_position_params.position);
        let locations: Vec<Location> = features::definition(&resolver, pos)
            .into_iter()
            .filter_map(|range| {
                let uri = Url::from_file_path(&*range.filename).ok()?;
                Some(Location {
                    uri,
                    range: convert::range_to_proto(&range),
                })
            })
            .collect();
        if locations.is_empty() {
            return Ok(None);
        }
        Ok(Some(GotoDefinitionResponse::Array(locations)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(root) = self.current_ast(&params.text_document.uri) else {
            return Ok(None);
        };

        #[allow(deprecated)]
        let symbols: Vec<SymbolInformation> = features::document_symbols(&NodeRef::root(&root))
            .into_iter()
            .map(|symbol| SymbolInformation {
                name: symbol.name,
                kind: SymbolKind::VARIABLE,
                tags: None,
                deprecated: None,
                location: Location {
                    uri: params.text_document.uri.clone(),
                    range: convert::range_to_proto(&symbol.range),
                },
                container_name: Some(symbol.detail),
            })
            .collect();
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(current) = self.overlay.current(&uri) else {
            return Ok(None);
        };

        let mut options = self.config().fmt.clone();
        if options.indent == 0 {
            options.indent = params.options.tab_size;
        }

        let filename = Self::filename_of(&uri);
        match self.formatter.format(&filename, &current.contents, &options) {
            Ok(formatted) => {
                let lines = current.contents.matches('\n').count() as u32 + 1;
                Ok(Some(vec![TextEdit {
                    range: Range {
                        start: Position::new(0, 0),
                        end: Position::new(lines, 0),
                    },
                    new_text: formatted,
                }]))
            }
            Err(err) => {
                debug!(%uri, %err, "formatting failed");
                Ok(None)
            }
        }
    }
}
