use super::*;
use jsonnet_ast::{BinaryOp, ExprKind, FieldHide};

fn parse_ok(src: &str) -> Arc<Ast> {
    parse("test.jsonnet", src).unwrap()
}

#[test]
fn literals() {
    let ast = parse_ok("null");
    assert!(matches!(ast.kind(ast.root()), ExprKind::LiteralNull));

    let ast = parse_ok("1234");
    match ast.kind(ast.root()) {
        ExprKind::LiteralNumber { value, original } => {
            assert_eq!(*value, 1234.0);
            assert_eq!(original, "1234");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn local_with_binds() {
    let ast = parse_ok("local x = 1, y = 2; x + y");
    match ast.kind(ast.root()) {
        ExprKind::Local { binds, body } => {
            assert_eq!(binds.len(), 2);
            assert_eq!(binds[0].var, "x");
            assert_eq!(binds[1].var, "y");
            assert!(matches!(ast.kind(*body), ExprKind::Binary { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn local_function_sugar() {
    let ast = parse_ok("local f(a, b=2) = a + b; f(1)");
    match ast.kind(ast.root()) {
        ExprKind::Local { binds, .. } => match ast.kind(binds[0].body) {
            ExprKind::Function { params, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].name, "a");
                assert!(params[0].default.is_none());
                assert!(params[1].default.is_some());
            }
            other => panic!("expected function body, got {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn dotted_access_lowers_to_string_index() {
    let ast = parse_ok("a.b.c");
    match ast.kind(ast.root()) {
        ExprKind::Index { target, index } => {
            assert!(
                matches!(ast.kind(*index), ExprKind::LiteralString { value } if value == "c")
            );
            assert!(matches!(ast.kind(*target), ExprKind::Index { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn object_fields_and_hides() {
    let ast = parse_ok("{ a: 1, b:: 2, 'c': 3, [\"d\" + \"e\"]: 4 }");
    match ast.kind(ast.root()) {
        ExprKind::Object { fields, .. } => {
            assert_eq!(fields.len(), 4);
            assert_eq!(fields[0].hide, FieldHide::Visible);
            assert_eq!(fields[1].hide, FieldHide::Hidden);
            assert!(matches!(
                ast.kind(fields[2].name),
                ExprKind::LiteralString { value } if value == "c"
            ));
            // computed name stays an expression
            assert!(matches!(ast.kind(fields[3].name), ExprKind::Binary { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn object_locals_and_asserts() {
    let ast = parse_ok("{ local tmp = 2, assert tmp > 1 : 'nope', x: tmp }");
    match ast.kind(ast.root()) {
        ExprKind::Object {
            locals,
            fields,
            asserts,
        } => {
            assert_eq!(locals.len(), 1);
            assert_eq!(locals[0].var, "tmp");
            assert_eq!(fields.len(), 1);
            assert_eq!(asserts.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn template_application_lowers_to_plus() {
    let ast = parse_ok("base { a: 1 }");
    match ast.kind(ast.root()) {
        ExprKind::Binary { op, left, right } => {
            assert_eq!(*op, BinaryOp::Plus);
            assert!(matches!(ast.kind(*left), ExprKind::Var { name } if name == "base"));
            assert!(matches!(ast.kind(*right), ExprKind::Object { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn array_comprehension_lowers_to_flat_map() {
    let ast = parse_ok("[x * 2 for x in [1, 2, 3] if x > 1]");
    match ast.kind(ast.root()) {
        ExprKind::Apply { target, .. } => match ast.kind(*target) {
            ExprKind::Index { target, index } => {
                assert!(
                    matches!(ast.kind(*target), ExprKind::Var { name } if name == "$std")
                );
                assert!(matches!(
                    ast.kind(*index),
                    ExprKind::LiteralString { value } if value == "flatMap"
                ));
            }
            other => panic!("expected $std.flatMap target, got {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn object_comprehension_lowers_to_flat_merge() {
    let ast = parse_ok("{[k]: k for k in ['a', 'b']}");
    match ast.kind(ast.root()) {
        ExprKind::Apply { target, .. } => match ast.kind(*target) {
            ExprKind::Index { index, .. } => {
                assert!(matches!(
                    ast.kind(*index),
                    ExprKind::LiteralString { value } if value == "$objectFlatMerge"
                ));
            }
            other => panic!("expected intrinsic index, got {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn assert_expression_lowers_to_conditional_error() {
    let ast = parse_ok("assert 1 < 2 : 'bad'; 42");
    match ast.kind(ast.root()) {
        ExprKind::Conditional {
            branch_true,
            branch_false,
            ..
        } => {
            assert!(matches!(
                ast.kind(*branch_true),
                ExprKind::LiteralNumber { .. }
            ));
            assert!(matches!(ast.kind(*branch_false), ExprKind::Error { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn slice_lowers_to_std_slice() {
    let ast = parse_ok("arr[1:3]");
    match ast.kind(ast.root()) {
        ExprKind::Apply {
            target, positional, ..
        } => {
            assert_eq!(positional.len(), 4);
            match ast.kind(*target) {
                ExprKind::Index { index, .. } => assert!(matches!(
                    ast.kind(*index),
                    ExprKind::LiteralString { value } if value == "slice"
                )),
                other => panic!("expected index, got {other:?}"),
            }
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn import_path_is_folded() {
    let ast = parse_ok("import 'a/' + 'b.libsonnet'");
    match ast.kind(ast.root()) {
        ExprKind::Import { path, .. } => assert_eq!(path, "a/b.libsonnet"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn super_and_in_super() {
    let ast = parse_ok("{ a: super.b, c: 'x' in super }");
    match ast.kind(ast.root()) {
        ExprKind::Object { fields, .. } => {
            assert!(matches!(ast.kind(fields[0].body), ExprKind::SuperIndex { .. }));
            assert!(matches!(ast.kind(fields[1].body), ExprKind::InSuper { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn named_call_arguments() {
    let ast = parse_ok("f(1, b=2, c=3)");
    match ast.kind(ast.root()) {
        ExprKind::Apply {
            positional, named, ..
        } => {
            assert_eq!(positional.len(), 1);
            assert_eq!(named.len(), 2);
            assert_eq!(named[0].name, "b");
            assert_eq!(named[1].name, "c");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn param_annotation_comments_land_on_hint_slot() {
    let ast = parse_ok("function(a/*:string*/, b/*:number*/=null) /*:boolean*/ false");
    match ast.kind(ast.root()) {
        ExprKind::Function { params, body } => {
            assert_eq!(params[0].hint_comments, vec!["/*:string*/".to_string()]);
            assert_eq!(params[1].hint_comments, vec!["/*:number*/".to_string()]);
            assert_eq!(ast.comments(*body), &["/*:boolean*/".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn last_param_annotation_rides_the_paren() {
    let ast = parse_ok("function(a, b/*:number*/) null");
    match ast.kind(ast.root()) {
        ExprKind::Function { params, .. } => {
            assert!(params[0].hint_comments.is_empty());
            assert_eq!(params[1].hint_comments, vec!["/*:number*/".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn conditional_without_else_gets_null_branch() {
    let ast = parse_ok("if true then 1");
    match ast.kind(ast.root()) {
        ExprKind::Conditional { branch_false, .. } => {
            assert!(matches!(ast.kind(*branch_false), ExprKind::LiteralNull));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parse_errors_carry_ranges() {
    let err = parse("bad.jsonnet", "local x = ").unwrap_err();
    assert_eq!(&*err.range.filename, "bad.jsonnet");
    assert!(err.range.begin.line >= 1);

    let err = parse("bad.jsonnet", "{ a: }").unwrap_err();
    assert!(err.message.contains("unexpected"));
}

#[test]
fn precedence() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let ast = parse_ok("1 + 2 * 3");
    match ast.kind(ast.root()) {
        ExprKind::Binary { op, right, .. } => {
            assert_eq!(*op, BinaryOp::Plus);
            assert!(matches!(
                ast.kind(*right),
                ExprKind::Binary {
                    op: BinaryOp::Mult,
                    ..
                }
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn node_ranges_are_one_based_inclusive_exclusive() {
    let ast = parse_ok("local x =\n  2;\nx");
    match ast.kind(ast.root()) {
        ExprKind::Local { binds, .. } => {
            let r = ast.range(binds[0].body);
            assert_eq!(r.begin, jsonnet_ast::Location::new(2, 3));
            assert_eq!(r.end, jsonnet_ast::Location::new(2, 4));
        }
        other => panic!("unexpected {other:?}"),
    }
}
