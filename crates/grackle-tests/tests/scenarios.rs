//! End-to-end drives of the generator plus the in-memory parse driver.

use grackle::{ConflictKind, Generator, GrammarSpec};
use grackle_runtime::{ParseError, Parser, Value};
use grackle_tests::{grammars, lexer::VecLexer};

fn run(spec: &GrammarSpec, tokens: &[(&str, &str)]) -> Result<Value, ParseError> {
    let generator = Generator::new(spec).expect("grammar compiles");
    let tables = generator.tables();
    let mut lexer = VecLexer::new(tokens.iter().copied());
    let result = Parser::new(&tables).parse(&mut lexer);
    result
}

fn s(text: &str) -> Value {
    Value::Str(text.to_owned())
}

fn list<const N: usize>(items: [Value; N]) -> Value {
    Value::List(items.into())
}

#[test]
fn arithmetic_precedence() {
    let result = run(
        &grammars::arithmetic(),
        &[
            ("NUMBER", "2"),
            ("+", "+"),
            ("NUMBER", "3"),
            ("*", "*"),
            ("NUMBER", "4"),
        ],
    )
    .unwrap();
    assert_eq!(
        result,
        list([s("+"), s("2"), list([s("*"), s("3"), s("4")])])
    );
}

#[test]
fn parentheses_override_precedence() {
    let result = run(
        &grammars::arithmetic(),
        &[
            ("(", "("),
            ("NUMBER", "2"),
            ("+", "+"),
            ("NUMBER", "3"),
            (")", ")"),
            ("*", "*"),
            ("NUMBER", "4"),
        ],
    )
    .unwrap();
    assert_eq!(
        result,
        list([s("*"), list([s("+"), s("2"), s("3")]), s("4")])
    );
}

#[test]
fn right_associativity() {
    let result = run(
        &grammars::exponentiation(),
        &[
            ("NUMBER", "2"),
            ("^", "^"),
            ("NUMBER", "3"),
            ("^", "^"),
            ("NUMBER", "4"),
        ],
    )
    .unwrap();
    assert_eq!(
        result,
        list([s("^"), s("2"), list([s("^"), s("3"), s("4")])])
    );
}

#[test]
fn empty_production_seeds_accumulation() {
    let result = run(
        &grammars::item_list(),
        &[("ITEM", "a"), ("ITEM", "b"), ("ITEM", "c")],
    )
    .unwrap();
    assert_eq!(result, list([s("a"), s("b"), s("c")]));
}

#[test]
fn nonassoc_rejects_chained_comparison() {
    let err = run(
        &grammars::comparison(),
        &[
            ("NUMBER", "1"),
            ("==", "=="),
            ("NUMBER", "2"),
            ("==", "=="),
            ("NUMBER", "3"),
        ],
    )
    .unwrap_err();
    match err {
        ParseError::Syntax(err) => {
            assert_eq!(err.token, "==");
            assert!(!err.expected.is_empty());
            assert!(!err.recoverable);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn single_comparison_still_parses() {
    let result = run(
        &grammars::comparison(),
        &[("NUMBER", "1"), ("==", "=="), ("NUMBER", "2")],
    )
    .unwrap();
    assert_eq!(result, list([s("=="), s("1"), s("2")]));
}

#[test]
fn reduce_reduce_conflict_is_counted_and_resolved() {
    let generator = Generator::new(&grammars::ambiguous_reduce()).unwrap();
    assert!(generator.statistics().conflicts >= 1);

    let conflict = generator
        .table()
        .counted_conflicts()
        .next()
        .expect("a counted conflict");
    assert_eq!(conflict.kind, ConflictKind::ReduceReduce);

    // The earlier rule (A → x) wins, so the input still parses.
    let tables = generator.tables();
    let mut lexer = VecLexer::new([("x", "x")]);
    let result = Parser::new(&tables).parse(&mut lexer).unwrap();
    assert_eq!(result, s("x"));
}

#[test]
fn jison_aliases_rewrite_and_strip() {
    let generator = Generator::new(&grammars::assignment_bnf()).unwrap();
    let grammar = generator.grammar();

    // The alias suffix never reaches the symbol table...
    assert!(grammar.symbols.get("Var[name]").is_none());
    assert!(grammar.symbols.get("Var").is_some());

    // ...and the compiled body resolves the named references.
    let rewritten = grammar
        .actions
        .bodies()
        .iter()
        .map(ToString::to_string)
        .any(|body| body == "return assign($[$0-2], $[$0])");
    assert!(rewritten, "alias references were not rewritten");
}

#[test]
fn unexpected_token_reports_expected_set() {
    let err = run(&grammars::arithmetic(), &[("+", "+")]).unwrap_err();
    match err {
        ParseError::Syntax(err) => {
            assert_eq!(err.line, 1);
            assert!(err.expected.iter().any(|name| name == "NUMBER"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn empty_input_reduces_only_the_empty_production() {
    let result = run(&grammars::item_list(), &[]).unwrap();
    assert_eq!(result, Value::Null);
}
