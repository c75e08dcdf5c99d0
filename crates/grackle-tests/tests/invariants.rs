//! Structural invariants of the generated tables.

use grackle::{Generator, SymbolID};
use grackle_runtime::tables::ParseAction;
use grackle_tests::grammars;

#[test]
fn rule_and_state_ids_are_dense() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let grammar = generator.grammar();

    for (idx, rule) in grammar.rules.iter().enumerate() {
        assert_eq!(rule.id.raw() as usize, idx);
    }
    assert_eq!(
        generator.table().rows.len(),
        generator.automaton().states.len()
    );
}

#[test]
fn reserved_symbol_ids_are_stable() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let symbols = &generator.grammar().symbols;
    assert_eq!(symbols.get("$accept"), Some(SymbolID::ACCEPT));
    assert_eq!(symbols.get("$end"), Some(SymbolID::EOI));
    assert_eq!(symbols.get("error"), Some(SymbolID::ERROR));
    // User symbols start right after the reserved block, LHS first.
    assert_eq!(symbols.get("Expression").map(SymbolID::raw), Some(3));
}

#[test]
fn shift_entries_mirror_transitions() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let grammar = generator.grammar();
    let automaton = generator.automaton();

    for (state, row) in automaton.iter().zip(&generator.table().rows) {
        let (_, node) = state;
        for (sym, action) in &row.actions {
            if let grackle::table::Action::Shift(target) = action {
                assert_eq!(node.transitions.get(sym), Some(target));
                assert!(node
                    .items
                    .iter()
                    .any(|item| item.next_symbol(grammar) == Some(*sym)));
            }
        }
    }
}

#[test]
fn eoi_is_never_shifted() {
    for spec in [
        grammars::arithmetic(),
        grammars::exponentiation(),
        grammars::item_list(),
        grammars::ambiguous_reduce(),
    ] {
        let generator = Generator::new(&spec).unwrap();
        let tables = generator.tables();
        for row in &tables.rows {
            assert!(!matches!(
                row.action(grackle_runtime::tables::EOI),
                Some(ParseAction::Shift(_))
            ));
        }
    }
}

#[test]
fn default_actions_only_cover_uniform_reduce_rows() {
    let generator = Generator::new(&grammars::item_list()).unwrap();
    let tables = generator.tables();
    for row in &tables.rows {
        if let Some(rule) = row.default_reduce {
            assert!(!row.entries.is_empty());
            for (_, action) in &row.entries {
                assert_eq!(*action, ParseAction::Reduce(rule));
            }
        }
    }
}

#[test]
fn independent_runs_agree() {
    let spec = grammars::arithmetic();
    let a = Generator::new(&spec).unwrap();
    let b = Generator::new(&spec).unwrap();
    assert_eq!(a.statistics(), b.statistics());

    let (ta, tb) = (a.tables(), b.tables());
    assert_eq!(ta.rows.len(), tb.rows.len());
    for (ra, rb) in ta.rows.iter().zip(&tb.rows) {
        assert_eq!(ra.entries, rb.entries);
        assert_eq!(ra.default_reduce, rb.default_reduce);
    }
}

#[test]
fn arithmetic_statistics() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let stats = generator.statistics();
    assert_eq!(stats.tokens, 5); // NUMBER + * ( )
    assert_eq!(stats.types, 1);
    assert_eq!(stats.rules, 4);
    assert_eq!(stats.conflicts, 0);
    assert!(stats.states > 0);
}

#[test]
fn sexpr_dump_lists_operators_and_rules() {
    let generator = Generator::new(&grammars::arithmetic()).unwrap();
    let dump = generator.grammar().sexp().to_string();
    assert!(dump.starts_with("(grammar"));
    assert!(dump.contains("(start Expression)"));
    assert!(dump.contains("(left +)"));
    assert!(dump.contains("(Expression + Expression)"));
}

#[test]
fn grammar_structural_errors() {
    use grackle::{GrammarError, GrammarSpec};

    let empty: GrammarSpec = serde_json::from_value(serde_json::json!({ "grammar": {} })).unwrap();
    assert!(matches!(
        Generator::new(&empty),
        Err(GrammarError::NoRules)
    ));

    let no_map: GrammarSpec = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(matches!(
        Generator::new(&no_map),
        Err(GrammarError::UnknownFormat)
    ));

    let bad_start: GrammarSpec = serde_json::from_value(serde_json::json!({
        "grammar": { "E": [["x"]] },
        "start": "Missing"
    }))
    .unwrap();
    assert!(matches!(
        Generator::new(&bad_start),
        Err(GrammarError::UndefinedStart(name)) if name == "Missing"
    ));

    let reserved: GrammarSpec = serde_json::from_value(serde_json::json!({
        "grammar": { "error": [["x"]] }
    }))
    .unwrap();
    assert!(matches!(
        Generator::new(&reserved),
        Err(GrammarError::ReservedName(name)) if name == "error"
    ));
}
