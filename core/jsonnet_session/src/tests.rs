use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use jsonnet_ast::{Location, NodeRef};
use jsonnet_analysis::{node_to_value, ValueType};
use jsonnet_overlay::{Overlay, TextEdit};
use url::Url;

use crate::features::{
    completion, document_symbols, hover, signature_help, CompletionContext,
};
use crate::importer::{FsImporter, Importer};
use crate::parse::{parse_with_recovery, ParseResult};
use crate::resolver::SessionResolver;
use crate::session::Session;
use crate::update::process_update;
use crate::Configuration;

struct Workspace {
    _dir: tempfile::TempDir,
    overlay: Arc<Overlay<ParseResult>>,
    importer: Arc<FsImporter>,
    session: Session,
}

impl Workspace {
    fn new() -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let overlay: Arc<Overlay<ParseResult>> = Arc::new(Overlay::new());
        let importer = Arc::new(FsImporter::new(
            dir.path().to_path_buf(),
            vec![],
            overlay.clone(),
        ));
        let session = Session::new(importer.clone() as Arc<dyn Importer>);
        Workspace {
            _dir: dir,
            overlay,
            importer,
            session,
        }
    }

    fn root(&self) -> &Path {
        self.importer.root()
    }

    fn write_file(&self, name: &str, contents: &str) {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn main_uri(&self) -> Url {
        Url::from_file_path(self.root().join("main.jsonnet")).unwrap()
    }

    fn main_filename(&self) -> String {
        self.root().join("main.jsonnet").to_string_lossy().into_owned()
    }

    fn replace(&self, version: i64, text: &str) {
        let filename = self.main_filename();
        self.overlay.replace(
            &self.main_uri(),
            version,
            text.to_string(),
            move |text, last| {
                let res = parse_with_recovery(&filename, text, last);
                let ok = res.root.is_some();
                (res, ok)
            },
            |_| {},
        );
    }

    fn update(&self, version: i64, edits: Vec<TextEdit>) {
        let filename = self.main_filename();
        self.overlay.update(
            &self.main_uri(),
            version,
            edits,
            move |text, last| {
                let res = parse_with_recovery(&filename, text, last);
                let ok = res.root.is_some();
                (res, ok)
            },
            |_| {},
        );
    }

    /// Resolver over the latest parsed snapshot.
    fn resolver(&self) -> SessionResolver<'_> {
        let parsed = self.overlay.parsed(&self.main_uri()).expect("no parsed entry");
        let root = parsed.data.root.clone().expect("parsed entry must carry a root");
        SessionResolver::new(self.main_uri(), root, &self.session)
    }

    fn resolver_for(&self, source: &str) -> SessionResolver<'_> {
        self.replace(1, source);
        self.resolver()
    }
}

fn loc(line: u32, column: u32) -> Location {
    Location::new(line, column)
}

// --- the editing flow: recovery plus completion over the last good tree ---

#[test]
fn recovery_keeps_the_editor_fluid_while_typing() {
    let ws = Workspace::new();

    // an incomplete document: no parse, no recovery on the replace path
    ws.replace(1, "local x = st\n{r: x}");
    assert!(ws.overlay.parsed(&ws.main_uri()).is_none());

    // typing the final "d" of std: still no parse, but recovery adds ';'
    ws.update(2, vec![TextEdit::insert(loc(1, 13), "d")]);
    let parsed = ws.overlay.parsed(&ws.main_uri()).unwrap();
    assert_eq!(parsed.version, 2);
    assert!(parsed.data.root.is_some());
    assert!(parsed.data.err.is_some(), "the original error is recorded");

    // typing "." after std: unrecoverable, the previous tree stays live
    ws.update(3, vec![TextEdit::insert(loc(1, 14), ".")]);
    let current = ws.overlay.current(&ws.main_uri()).unwrap();
    let parsed = ws.overlay.parsed(&ws.main_uri()).unwrap();
    assert_eq!(current.version, 3);
    assert_eq!(parsed.version, 2);

    // diagnostics for v3 still show the syntax error
    let config = Configuration::default();
    let result = jsonnet_overlay::UpdateResult {
        current: Some(current),
        parsed: Some(parsed),
    };
    let (version, diags) =
        process_update(&ws.main_uri(), &result, &ws.session, &config, None).unwrap();
    assert_eq!(version, 3);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].source.as_deref(), Some("jsonnet"));

    // while dot-completion over the recovered tree reaches the stdlib
    let resolver = ws.resolver();
    let items = completion(
        &resolver,
        loc(1, 15),
        CompletionContext {
            dot: true,
            slash: false,
        },
        &*ws.importer,
    );
    assert!(
        items.iter().any(|i| i.label == "endsWith"),
        "expected stdlib completions, got {} items",
        items.len()
    );
}

// --- completion policies ---

#[test]
fn variable_completion_is_scoped_and_ranked() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local aaa = 1; local bbb = 'x'; aaa + bbb");
    let items = completion(
        &resolver,
        loc(1, 34),
        CompletionContext::default(),
        &*ws.importer,
    );
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"aaa"));
    assert!(labels.contains(&"bbb"));
    assert!(labels.contains(&"std"));

    let aaa = items.iter().find(|i| i.label == "aaa").unwrap();
    assert_eq!(aaa.detail.as_deref(), Some("number"));
    // ranked text sorts innermost scopes first
    let std_item = items.iter().find(|i| i.label == "std").unwrap();
    assert!(aaa.sort_text < std_item.sort_text);
}

#[test]
fn dot_completion_lists_object_fields() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local o = {a: 1, b:: 2}; o");
    let items = completion(
        &resolver,
        loc(1, 27),
        CompletionContext {
            dot: true,
            slash: false,
        },
        &*ws.importer,
    );
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b"]);
}

#[test]
fn template_completion_offers_unassigned_visible_fields() {
    let ws = Workspace::new();
    let source = "local tpl = {a: 1, b: 2, h:: 3}; tpl + {a: 9, }";
    let resolver = ws.resolver_for(source);
    // cursor inside the object literal, after the comma
    let items = completion(
        &resolver,
        loc(1, 46),
        CompletionContext::default(),
        &*ws.importer,
    );
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["b"], "assigned and hidden fields are excluded");
    let b = &items[0];
    assert!(b.snippet);
    assert_eq!(b.insert_text.as_deref(), Some("b: $1,$0"));
}

#[test]
fn import_completion_lists_directories() {
    let ws = Workspace::new();
    ws.write_file("lib/util.libsonnet", "{}");
    ws.write_file("lib/more/deep.libsonnet", "{}");
    ws.write_file("lib/.hidden.libsonnet", "{}");

    let resolver = ws.resolver_for("import 'lib/'");
    let items = completion(
        &resolver,
        loc(1, 12),
        CompletionContext {
            dot: false,
            slash: true,
        },
        &*ws.importer,
    );
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"util.libsonnet"));
    assert!(labels.contains(&"more"));
    assert!(!labels.iter().any(|l| l.starts_with('.')));
}

// --- hover / signature / definition / symbols ---

#[test]
fn hover_shows_the_deduced_signature() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local f(x/*:number*/) = /*:boolean*/ x > 0; f");
    let result = hover(&resolver, loc(1, 45)).unwrap();
    assert!(
        result.contents.contains("function(x: number) -> boolean"),
        "{}",
        result.contents
    );
}

#[test]
fn signature_help_for_a_call() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local add(a, b) = a + b; add()");
    let help = signature_help(&resolver, loc(1, 30)).unwrap();
    assert_eq!(help.label, "add(a, b)");
    assert_eq!(help.params.len(), 2);
    assert_eq!(help.active_param, 0);
}

#[test]
fn signature_help_tracks_named_arguments() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local add(a, b, c) = a; add(1, c=3)");
    // node at the closing paren is the call itself
    let help = signature_help(&resolver, loc(1, 35)).unwrap();
    assert_eq!(help.active_param, 1, "a taken positionally, c named, so b");
}

#[test]
fn definition_points_at_the_value_origin() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local target = {a: 1}; target");
    let locations = definition_at(&resolver, loc(1, 25));
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].begin, loc(1, 16));
}

fn definition_at(
    resolver: &SessionResolver<'_>,
    pos: Location,
) -> Vec<jsonnet_ast::LocationRange> {
    crate::features::definition(resolver, pos)
}

#[test]
fn document_symbols_lists_top_level_bindings() {
    let ws = Workspace::new();
    let resolver = ws.resolver_for("local a = 1;\nlocal b = 'x';\n{r: a, s: b}");
    let symbols = document_symbols(&NodeRef::root(resolver.root()));
    let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(symbols[0].detail, "number");
    assert_eq!(symbols[1].detail, "string");
}

// --- imports through the session ---

#[test]
fn imports_resolve_through_the_session() {
    let ws = Workspace::new();
    ws.write_file("dep.libsonnet", "{answer: 42}");

    let resolver = ws.resolver_for("local d = import 'dep.libsonnet'; d.answer");
    let root = NodeRef::root(resolver.root());
    let (_, trailing) = jsonnet_analysis::unwind_locals(&root);
    let value = node_to_value(&trailing, &resolver);
    assert_eq!(value.value_type(), ValueType::Number);
    assert_eq!(value.comment, vec!["42".to_string()]);
}

#[test]
fn overlay_documents_win_for_imports() {
    let ws = Workspace::new();
    ws.write_file("dep.libsonnet", "{answer: 'stale'}");

    // the dependency is open in the editor with fresher content
    let dep_uri = Url::from_file_path(ws.root().join("dep.libsonnet")).unwrap();
    let dep_name = ws.root().join("dep.libsonnet").to_string_lossy().into_owned();
    ws.overlay.replace(
        &dep_uri,
        1,
        "{answer: true}".to_string(),
        move |text, last| {
            let res = parse_with_recovery(&dep_name, text, last);
            let ok = res.root.is_some();
            (res, ok)
        },
        |_| {},
    );

    let resolver = ws.resolver_for("local d = import 'dep.libsonnet'; d.answer");
    let root = NodeRef::root(resolver.root());
    let (_, trailing) = jsonnet_analysis::unwind_locals(&root);
    let value = node_to_value(&trailing, &resolver);
    assert_eq!(value.value_type(), ValueType::Boolean);
}
