//! Shape checks over the emitted parser module.

use grackle::Generator;
use grackle_tests::grammars;

#[test]
fn emitted_module_exposes_the_parser_surface() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let emitted = generator.codegen().to_string();

    assert!(emitted.contains("use grackle_runtime::_private as rt;"));
    assert!(emitted.contains("pub const TOKENS: &[(&str, u16)]"));
    assert!(emitted.contains("pub fn tables() -> &'static rt::ParserTables"));
    assert!(emitted.contains("pub fn parser() -> rt::Parser<'static>"));
    assert!(emitted.contains("pub fn parse<L: rt::Lexer>"));
}

#[test]
fn emitted_tables_carry_the_grammar_data() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let emitted = generator.codegen().to_string();

    for token in ["NUMBER", "+", "*", "(", ")"] {
        assert!(
            emitted.contains(&format!("({:?}, ", token)),
            "missing token {}",
            token
        );
    }
    assert!(emitted.contains("rt::RuleInfo { lhs: 0, len: 2 }"));
    assert!(emitted.contains("rt::ActionProgram::List"));
    assert!(emitted.contains("rt::ParseAction::Shift"));
}

#[test]
fn shared_action_bodies_emit_one_dispatch_entry() {
    // All four user rules of this grammar are position-1 pass-throughs
    // over a single-symbol handle, so they share one compiled body.
    let generator = Generator::new(&grammars::ambiguous_reduce()).unwrap();
    let emitted = generator.codegen().to_string();

    assert!(
        emitted.contains("// rules 1 2 3 4"),
        "pass-through rules were not deduplicated:\n{}",
        emitted
    );
}

#[test]
fn nonassoc_poison_entries_are_emitted() {
    let generator = Generator::new(&grammars::comparison()).unwrap();
    let emitted = generator.codegen().to_string();
    assert!(emitted.contains("rt::ParseAction::Fail"));
}
