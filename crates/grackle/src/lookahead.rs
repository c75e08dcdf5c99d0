//! NULLABLE/FIRST/FOLLOW fixed points and SLR(1) lookahead assignment.

use crate::automaton::{Automaton, StateID};
use crate::rules::{Grammar, RuleID};
use crate::symbol::{SymbolID, SymbolKind, SymbolSet};
use crate::types::Map;

/// The grammar's analysis sets. All three are computed by repeating a
/// monotone pass over the rule list until nothing grows.
#[derive(Debug)]
pub struct GrammarSets {
    /// Nullable nonterminals.
    pub nullable: SymbolSet,
    /// Per-rule nullability, indexed by rule id.
    pub rule_nullable: Vec<bool>,
    /// FIRST per symbol; `FIRST(t) = {t}` for terminals.
    pub first: Map<SymbolID, SymbolSet>,
    /// FIRST of each rule's handle, indexed by rule id.
    pub rule_first: Vec<SymbolSet>,
    /// FOLLOW per nonterminal.
    pub follow: Map<SymbolID, SymbolSet>,
}

impl GrammarSets {
    fn symbol_nullable(&self, sym: SymbolID, g: &Grammar) -> bool {
        g.symbols.classify(sym) == SymbolKind::Nonterminal && self.nullable.contains(sym)
    }
}

pub fn compute(g: &Grammar) -> GrammarSets {
    let mut sets = GrammarSets {
        nullable: SymbolSet::default(),
        rule_nullable: vec![false; g.rules.len()],
        first: Map::default(),
        rule_first: vec![SymbolSet::default(); g.rules.len()],
        follow: Map::default(),
    };

    compute_nullable(g, &mut sets);
    compute_first(g, &mut sets);
    compute_follow(g, &mut sets);
    sets
}

/// A rule is nullable iff every handle symbol is nullable (vacuously true
/// for ε); a nonterminal is nullable iff any of its rules is.
fn compute_nullable(g: &Grammar, sets: &mut GrammarSets) {
    loop {
        let mut changed = false;
        for rule in &g.rules {
            if sets.rule_nullable[rule.id.raw() as usize] {
                continue;
            }
            let nullable = rule
                .rhs
                .iter()
                .all(|&sym| sets.symbol_nullable(sym, g));
            if nullable {
                sets.rule_nullable[rule.id.raw() as usize] = true;
                sets.nullable.insert(rule.lhs);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn compute_first(g: &Grammar, sets: &mut GrammarSets) {
    for (id, data) in g.symbols.iter() {
        let mut first = SymbolSet::default();
        if data.kind == SymbolKind::Terminal {
            first.insert(id);
        }
        sets.first.insert(id, first);
    }

    loop {
        let mut changed = false;
        for rule in &g.rules {
            // FIRST of the handle: accumulate until the first
            // non-nullable symbol.
            let mut rule_first = SymbolSet::default();
            for &sym in &rule.rhs {
                rule_first.union_with(&sets.first[&sym]);
                if !sets.symbol_nullable(sym, g) {
                    break;
                }
            }
            changed |= sets.rule_first[rule.id.raw() as usize].union_with(&rule_first);
            changed |= sets
                .first
                .get_mut(&rule.lhs)
                .expect("every symbol has a FIRST set")
                .union_with(&rule_first);
        }
        if !changed {
            break;
        }
    }
}

/// FOLLOW, seeded with `FOLLOW(start) ⊇ {$end}`. For each occurrence
/// `A → α X β`: FIRST(β) feeds FOLLOW(X), and FOLLOW(A) feeds FOLLOW(X)
/// when β is nullable.
fn compute_follow(g: &Grammar, sets: &mut GrammarSets) {
    for (id, _) in g.symbols.nonterminals() {
        sets.follow.insert(id, SymbolSet::default());
    }
    sets.follow
        .get_mut(&g.start)
        .expect("start is a nonterminal")
        .insert(SymbolID::EOI);

    loop {
        let mut changed = false;
        for rule in &g.rules {
            for (i, &sym) in rule.rhs.iter().enumerate() {
                if g.symbols.classify(sym) != SymbolKind::Nonterminal {
                    continue;
                }
                let mut beta_nullable = true;
                let mut beta_first = SymbolSet::default();
                for &after in &rule.rhs[i + 1..] {
                    beta_first.union_with(&sets.first[&after]);
                    if !sets.symbol_nullable(after, g) {
                        beta_nullable = false;
                        break;
                    }
                }
                if beta_nullable {
                    beta_first.union_with(&sets.follow[&rule.lhs]);
                }
                changed |= sets
                    .follow
                    .get_mut(&sym)
                    .expect("nonterminal follow seeded")
                    .union_with(&beta_first);
            }
        }
        if !changed {
            break;
        }
    }
}

/// Keys a reduction of `rule` performed in `state`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reduce {
    pub state: StateID,
    pub rule: RuleID,
}

/// Per-state reduction lookaheads: under the SLR(1) discipline, every
/// reduction item takes FOLLOW of its left-hand side.
#[derive(Debug)]
pub struct Lookaheads {
    pub lookaheads: Map<Reduce, SymbolSet>,
}

pub fn assign(g: &Grammar, automaton: &Automaton, sets: &GrammarSets) -> Lookaheads {
    let mut lookaheads = Map::default();
    for (state, node) in automaton.iter() {
        for item in &node.reductions {
            let lhs = g.rule(item.rule).lhs;
            lookaheads.insert(
                Reduce {
                    state,
                    rule: item.rule,
                },
                sets.follow[&lhs].clone(),
            );
        }
    }
    Lookaheads { lookaheads }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSpec;
    use crate::rules;

    fn nullable_grammar() -> Grammar {
        // Z → d | X Y Z ; Y → ε | c ; X → Y | a
        let spec: GrammarSpec = serde_json::from_value(serde_json::json!({
            "grammar": {
                "Z": [["d"], ["X Y Z"]],
                "Y": [[""], ["c"]],
                "X": [["Y"], ["a"]]
            }
        }))
        .unwrap();
        rules::build(&spec).unwrap()
    }

    fn names(g: &Grammar, set: &SymbolSet) -> Vec<String> {
        set.iter().map(|id| g.symbols.name(id).to_owned()).collect()
    }

    #[test]
    fn nullable_propagates_through_chains() {
        let g = nullable_grammar();
        let sets = compute(&g);
        let x = g.symbols.get("X").unwrap();
        let y = g.symbols.get("Y").unwrap();
        let z = g.symbols.get("Z").unwrap();
        assert!(sets.nullable.contains(x));
        assert!(sets.nullable.contains(y));
        assert!(!sets.nullable.contains(z));
    }

    #[test]
    fn first_accumulates_past_nullable_prefixes() {
        let g = nullable_grammar();
        let sets = compute(&g);
        let z = g.symbols.get("Z").unwrap();
        let mut first = names(&g, &sets.first[&z]);
        first.sort();
        assert_eq!(first, ["a", "c", "d"]);
    }

    #[test]
    fn follow_seeds_start_with_eoi() {
        let g = nullable_grammar();
        let sets = compute(&g);
        assert!(sets.follow[&g.start].contains(SymbolID::EOI));
    }

    #[test]
    fn follow_flows_through_nullable_suffixes() {
        let g = nullable_grammar();
        let sets = compute(&g);
        let x = g.symbols.get("X").unwrap();
        // In Z → X Y Z, Y is nullable, so FIRST(Z) ⊆ FOLLOW(X).
        let follow_x = names(&g, &sets.follow[&x]);
        for t in ["a", "c", "d"] {
            assert!(follow_x.iter().any(|n| n == t), "missing {}", t);
        }
    }

    #[test]
    fn fixed_point_is_order_independent() {
        let g = nullable_grammar();
        let a = compute(&g);
        let b = compute(&g);
        assert_eq!(a.nullable, b.nullable);
        for (id, _) in g.symbols.iter() {
            assert_eq!(a.first[&id], b.first[&id]);
        }
        for (id, _) in g.symbols.nonterminals() {
            assert_eq!(a.follow[&id], b.follow[&id]);
        }
    }
}
