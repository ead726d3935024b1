use crate::testutil::MockResolver;
use crate::value::{node_to_value, simple_value_type, ValueType};

fn deduce(source: &str) -> crate::value::Value {
    let (resolver, out) = MockResolver::parse(source);
    node_to_value(&out, &resolver)
}

// --- basic type classification ---

#[test]
fn basic_types() {
    let cases = [
        ("false", ValueType::Boolean, false),
        ("null", ValueType::Null, true),
        ("1234", ValueType::Number, false),
        ("\"asdf\"", ValueType::String, false),
        ("[1,2,3]", ValueType::Array, false),
        ("[f for f in [1,2,3]]", ValueType::Array, true),
        ("{[f]: f for f in [1,2,3]}", ValueType::Object, true),
    ];
    for (source, expect_ty, expect_terminal) in cases {
        let root = jsonnet_parse::parse("anon.jsonnet", source).unwrap();
        let (ty, terminal) = simple_value_type(&jsonnet_ast::NodeRef::root(&root));
        assert_eq!(ty, expect_ty, "{source}");
        assert_eq!(terminal, expect_terminal, "{source}");
    }
}

// --- value deduction ---

#[test]
fn nested_local_resolution() {
    let value = deduce("local x =\n  local y = 2;\n  y;\nx");
    assert_eq!(value.value_type(), ValueType::Number);
    assert!(value.comment.contains(&"2".to_string()));
    let range = value.range.unwrap();
    assert_eq!(range.begin.line, 2);
}

#[test]
fn object_field_resolution() {
    let value = deduce("local obj = {a: {b: 1234}}; obj.a.b");
    assert_eq!(value.value_type(), ValueType::Number);
    assert_eq!(value.comment, vec!["1234".to_string()]);
}

#[test]
fn literal_array_numeric_index() {
    let value = deduce("local arr = ['a', 2]; arr[1]");
    assert_eq!(value.value_type(), ValueType::Number);

    let value = deduce("local arr = ['a', 2]; arr[9]");
    assert_eq!(value.value_type(), ValueType::Any);
}

#[test]
fn function_application_returns_body_value() {
    let value = deduce("local f = function() false; f()");
    assert_eq!(value.value_type(), ValueType::Boolean);
    assert_eq!(value.comment, vec!["false".to_string()]);
}

#[test]
fn calling_the_stdlib_is_typed() {
    let value = deduce("std.endsWith('a', 'b')");
    // return hint from the catalogue signature
    assert_eq!(
        value.type_hint.as_ref().unwrap().value_type(),
        ValueType::Boolean
    );
}

#[test]
fn std_resolves_to_the_catalogue() {
    let value = deduce("std");
    assert!(value.is_stdlib());

    let value = deduce("std.startsWith");
    assert_eq!(value.value_type(), ValueType::Function);
}

#[test]
fn object_plus_template_carries_supers() {
    let value = deduce("local base = {a: 1, b: 'x'}; base + {b: 2}");
    let object = value.object().expect("rhs must stay an object");
    assert_eq!(object.supers.len(), 1);
    // right side wins, super fallback finds the rest
    assert!(object.has_own_field("b"));
    let field_a = object.get_field("a").expect("field from the left template");
    assert_eq!(field_a.ty.value_type(), ValueType::Number);
}

#[test]
fn template_sugar_behaves_like_plus() {
    let value = deduce("local base = {a: 1}; base {b: 2}");
    let object = value.object().unwrap();
    assert_eq!(object.supers.len(), 1);
    assert!(object.get_field("a").is_some());
}

#[test]
fn self_recursive_local_terminates() {
    let value = deduce("local x = x; x");
    assert_eq!(value.value_type(), ValueType::Any);
}

#[test]
fn recursive_function_terminates() {
    let value = deduce("local f(n) = f(n); f(1)");
    let _ = value; // reaching here is the assertion: the cap fired, no overflow
}

#[test]
fn hidden_fields_are_marked() {
    let value = deduce("{shown: 1, concealed:: 2}");
    let object = value.object().unwrap();
    assert!(!object.get_field("shown").unwrap().hidden);
    assert!(object.get_field("concealed").unwrap().hidden);
    assert!(object.all_fields_known);
}

#[test]
fn computed_field_names_open_the_shape() {
    let value = deduce("local k = 'a'; {[k]: 1, b: 2}");
    let object = value.object().unwrap();
    assert!(!object.all_fields_known);
    assert!(object.get_field("b").is_some());
}

// --- type hints ---

fn type_str(source: &str) -> String {
    deduce(source).ty.to_string()
}

fn return_hint_str(source: &str) -> String {
    let value = deduce(source);
    let func = value.function().expect("expected a function value");
    func.return_hint
        .as_ref()
        .expect("expected a return hint")
        .to_string()
}

#[test]
fn primitive_type_strings() {
    assert_eq!(type_str("null"), "null");
    assert_eq!(type_str("\"asdf\""), "string");
    assert_eq!(type_str("1234"), "number");
    assert_eq!(type_str("false"), "boolean");
    assert_eq!(type_str("[]"), "array");
    assert_eq!(type_str("{}"), "object");
}

#[test]
fn function_without_hints() {
    assert_eq!(type_str("function(a, b, c=null) 123"), "function(a, b, c)");
}

#[test]
fn function_with_basic_hints() {
    assert_eq!(
        type_str("function(a/*:string*/, b/*:null*/, c/*:boolean*/) /*:number*/ 123"),
        "function(a: string, b: null, c: boolean) -> number"
    );
}

#[test]
fn function_hints_with_defaults() {
    assert_eq!(
        type_str("function(a/*:string*/=null, b/*:null*/=123) null"),
        "function(a: string, b: null)"
    );
}

#[test]
fn function_with_type_parameters() {
    assert_eq!(
        type_str("function(fn/*:function(elem: A) -> B*/, arr/*:array[A]*/) /*:array[B]*/ null"),
        "function(fn: function(elem: A) -> B, arr: array[A]) -> array[B]"
    );
}

#[test]
fn return_hint_structures() {
    assert_eq!(
        return_hint_str("function() /*:array[string]*/ null"),
        "array[string]"
    );
    assert_eq!(
        return_hint_str("function() /*:array[array[string]]*/ null"),
        "array[array[string]]"
    );
    assert_eq!(
        return_hint_str("function() /*:string | null*/ null"),
        "string | null"
    );
    assert_eq!(
        return_hint_str("function() /*:array[string | null]*/ null"),
        "array[string | null]"
    );
    assert_eq!(
        return_hint_str("function() /*:function(a: number) -> boolean*/ null"),
        "function(a: number) -> boolean"
    );
}

#[test]
fn generic_inference_solves_the_return_hint() {
    let value = deduce(
        "local map(fn/*:function(elem: A) -> B*/, arr/*:array[A]*/) = /*:array[B]*/ [];\n\
         map(function(x/*:number*/) /*:boolean*/ false, [1, 2, 3])",
    );
    assert_eq!(value.value_type(), ValueType::Array);
    assert_eq!(value.type_hint.as_ref().unwrap().to_string(), "array[boolean]");
}

#[test]
fn conflicting_inference_becomes_a_hint_error() {
    let value = deduce(
        "local pick(a/*:A*/, b/*:A*/) = /*:A*/ a;\n\
         pick(1, 'two')",
    );
    let hint = value.type_hint.as_ref().unwrap();
    let err = hint.hint_error().expect("expected a hint error");
    assert!(err.contains("conflicting inferred types"), "{err}");
}

#[test]
fn unresolved_parameter_becomes_a_hint_error() {
    let value = deduce(
        "local make(n/*:number*/) = /*:array[B]*/ [];\n\
         make(1)",
    );
    let hint = value.type_hint.as_ref().unwrap();
    let err = hint.hint_error().expect("expected a hint error");
    assert!(err.contains("unable to resolve type parameter 'B'"), "{err}");
}

#[test]
fn broken_annotation_is_a_hint_error_not_a_failure() {
    let value = deduce("function(a/*:array[*/) null");
    let func = value.function().unwrap();
    let hint = func.params[0].type_hint.as_ref().unwrap();
    assert!(hint.hint_error().is_some());
}

#[test]
fn variable_annotations_resolve_to_object_shapes() {
    let value = deduce(
        "local Template = {host: '', port: 0};\n\
         local f = function(cfg/*:Template*/) /*:Template*/ cfg;\n\
         f",
    );
    let func = value.function().unwrap();
    let hint = func.params[0].type_hint.as_ref().unwrap();
    let object = hint.object().expect("hint should carry the object shape");
    assert!(object.get_field("host").is_some());
    assert!(object.get_field("port").is_some());
}

#[test]
fn non_object_variable_annotation_is_an_error() {
    let value = deduce(
        "local notObj = 42;\n\
         local f = function(cfg/*:notObj*/) cfg;\n\
         f",
    );
    let func = value.function().unwrap();
    let hint = func.params[0].type_hint.as_ref().unwrap();
    assert!(hint
        .hint_error()
        .unwrap()
        .contains("cannot use non-object variable"));
}

#[test]
fn parameter_references_use_their_annotation() {
    // deducing the body of the identity function lands on the parameter
    // reference, whose type comes from the annotation
    let (resolver, out) = MockResolver::parse("local f = function(s/*:string*/) s; f");
    let value = node_to_value(&out, &resolver);
    let func = value.function().unwrap();
    let ret = func.ret.as_ref().unwrap();
    let body_value = node_to_value(ret, &resolver);
    assert_eq!(
        body_value.type_hint.as_ref().unwrap().to_string(),
        "string"
    );
}

#[test]
fn import_str_is_a_string() {
    let value = deduce("importstr 'data.txt'");
    assert_eq!(value.value_type(), ValueType::String);
}

#[test]
fn unresolved_import_is_any_with_no_origin() {
    // MockResolver never resolves imports
    let value = deduce("import 'lib.libsonnet'");
    assert_eq!(value.value_type(), ValueType::Any);
    assert!(value.node.is_none());
}
