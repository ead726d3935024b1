use super::*;
use jsonnet_ast::{Ast, Location};
use jsonnet_analysis::{stack_at_loc, stack_at_node, stack_vars, VarMap};
use std::sync::Arc;

struct TestResolver {
    root: Arc<Ast>,
}

impl TestResolver {
    fn parse(source: &str) -> (TestResolver, NodeRef) {
        let root = jsonnet_parse::parse("lint.jsonnet", source).expect("test source must parse");
        let node = NodeRef::root(&root);
        (TestResolver { root }, node)
    }

    fn refs(&self, stack: Vec<ExprId>) -> Vec<NodeRef> {
        stack
            .into_iter()
            .map(|id| NodeRef::new(self.root.clone(), id))
            .collect()
    }
}

impl Resolver for TestResolver {
    fn vars(&self, from: &NodeRef) -> VarMap {
        let stack = self.refs(stack_at_node(&self.root, from.id));
        stack_vars(&stack)
    }

    fn node_at(&self, loc: Location) -> Option<(NodeRef, Vec<NodeRef>)> {
        let stack = self.refs(stack_at_loc(&self.root, loc));
        let node = stack.last()?.clone();
        Some((node, stack))
    }

    fn import(&self, _from: &str, _path: &str) -> Option<NodeRef> {
        None
    }
}

fn lint(source: &str) -> Vec<String> {
    let (resolver, root) = TestResolver::parse(source);
    lint_ast(&root, &resolver).iter().map(fmt_diag).collect()
}

#[test]
fn function_arity_and_type_checks() {
    let source = "\
local tooFew = std.endsWith('');
local tooMany = std.endsWith('', '', '');
local wrong  = std.all(5);
local notFn  = \"asdf\";
local callNF = notFn(2);
local fn(a=null,b=null) = null;
local dupNamed = fn(a=2, a=3);
local typed(a/*:string*/, b/*:number*/, c=null) = null;
local mis = typed(2, false);
{used:[tooFew,tooMany,wrong,callNF,dupNamed,mis]}";

    let expect = vec![
        "[Error|ArgumentCardinality|1:16-1:32] too few arguments in function call (1 arguments for 2 required parameters)",
        "[Error|ArgumentCardinality|2:17-2:41] too many arguments in function call (3 arguments for 2 parameters)",
        "[Warning|TypeMismatch|3:16-3:26] mismatched argument type for 'arr' expected 'array' got 'number'",
        "[Error|TypeMismatch|5:16-5:24] calling non-function type 'string'",
        "[Warning|ArgumentCardinality|7:18-7:30] duplicate named argument 'a'",
        "[Warning|TypeMismatch|9:13-9:28] mismatched argument type for 'a' expected 'string' got 'number'",
        "[Warning|TypeMismatch|9:13-9:28] mismatched argument type for 'b' expected 'number' got 'boolean'",
    ];

    let got = lint(source);
    assert_eq!(got, expect, "got:\n{}", got.join("\n"));
}

#[test]
fn unused_local() {
    let source = "\
local a = 1;
local unused = a;
a + 2";
    let got = lint(source);
    assert_eq!(
        got,
        vec!["[Warning|UnusedVar|2:7-2:13] unused local variable 'unused'"]
    );
}

#[test]
fn used_locals_are_silent() {
    assert!(lint("local x = 1; x + 2").is_empty());
}

#[test]
fn object_local_usage() {
    let got = lint("{ local tmp = 1, a: 2 }");
    assert_eq!(got.len(), 1);
    assert!(got[0].contains("unused local variable 'tmp'"), "{}", got[0]);

    assert!(lint("{ local tmp = 1, a: tmp }").is_empty());
}

#[test]
fn parameters_are_not_reported_unused() {
    assert!(lint("local f(a, b) = a; f(1, 2)").is_empty());
}

#[test]
fn import_not_found() {
    let got = lint("local lib = import 'missing.libsonnet'; lib");
    assert_eq!(got.len(), 1);
    assert!(
        got[0].starts_with("[Warning|ImportNotFound|"),
        "{}",
        got[0]
    );
    assert!(got[0].contains("import not found: 'missing.libsonnet'"));
}

#[test]
fn unknown_field_on_closed_object() {
    let got = lint("local o = {a: 1}; o.missing");
    assert_eq!(got.len(), 1);
    assert!(got[0].contains("object has no field 'missing'"), "{}", got[0]);
}

#[test]
fn fields_from_supers_are_known() {
    assert!(lint("local base = {a: 1}; local o = base + {b: 2}; o.a").is_empty());
}

#[test]
fn open_objects_are_not_flagged() {
    assert!(lint("local k = 'a'; local o = {[k]: 1}; o.whatever").is_empty());
}

#[test]
fn unknown_named_argument() {
    let got = lint("local f(a) = a; f(nope=1)");
    assert!(got
        .iter()
        .any(|d| d.contains("unknown named argument 'nope'")));
}

#[test]
fn index_type_mismatches() {
    let got = lint("local arr = [1, 2]; local key = 'x'; arr[key]");
    assert!(got
        .iter()
        .any(|d| d.contains("cannot index array with type 'string'")));

    let got = lint("local o = {a: 1}; local i = 2; o[i]");
    assert!(got
        .iter()
        .any(|d| d.contains("cannot index object with type 'number'")));
}

#[test]
fn binary_operand_mismatches() {
    let got = lint("1 + 'a'");
    assert_eq!(
        got,
        vec!["[Warning|TypeMismatch|1:1-1:8] + operator cannot add different types 'number' and 'string'"]
    );

    let got = lint("local used = 1 == 'x'; used");
    assert!(got
        .iter()
        .any(|d| d.contains("equal comparison is never true for different types 'number' and 'string'")));

    let got = lint("'a' * 2");
    assert!(got
        .iter()
        .any(|d| d.contains("expected number for lhs of operator '*' but got type 'string'")));
}

#[test]
fn unary_operand_mismatch() {
    let got = lint("!'nope'");
    assert!(got
        .iter()
        .any(|d| d.contains("expected boolean for operand of unary operator '!' but got type 'string'")));
}

#[test]
fn null_named_argument_allowed_for_null_param() {
    assert!(lint("local f(a/*:null*/) = a; f(a=null)").is_empty());
}

#[test]
fn any_skips_type_checks() {
    // unannotated parameter flows through as any
    assert!(lint("local f(a) = a; local g(b/*:number*/) = b; g(f(1))").is_empty());
}

#[test]
fn determinism_across_runs() {
    let source = "local x = 1; local y = 2; 3 + 'a'";
    let first = lint(source);
    for _ in 0..5 {
        assert_eq!(lint(source), first);
    }
}
