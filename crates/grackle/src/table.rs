//! SLR(1) parse-table construction with precedence-driven conflict
//! resolution.

use crate::automaton::{Automaton, StateID};
use crate::grammar::Assoc;
use crate::lookahead::{Lookaheads, Reduce};
use crate::rules::{Grammar, Rule, RuleID};
use crate::symbol::{SymbolID, SymbolKind};
use crate::types::Map;
use crate::util::display_fn;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    Goto(StateID),
    Reduce(RuleID),
    Accept,
    /// Poison entry for nonassoc operators at equal precedence: the
    /// terminal is a parse error in this state.
    Fail,
}

/// One state's row: entries keyed by symbol id, plus the compacted
/// default reduction when every action entry reduces the same rule.
#[derive(Debug)]
pub struct TableRow {
    pub actions: Map<SymbolID, Action>,
    pub default_reduce: Option<RuleID>,
}

/// How a forced (`bydefault`) resolution is categorized. Only
/// `ReduceReduce` and `Ambiguous` count as real conflicts; the other
/// three are silently normalized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    EmptyOptional,
    Passthrough,
    Precedence,
    ReduceReduce,
    Ambiguous,
}

impl ConflictKind {
    pub fn is_counted(self) -> bool {
        matches!(self, Self::ReduceReduce | Self::Ambiguous)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyOptional => "empty-optional",
            Self::Passthrough => "passthrough",
            Self::Precedence => "precedence",
            Self::ReduceReduce => "reduce-reduce",
            Self::Ambiguous => "ambiguous",
        }
    }
}

/// A recorded conflict resolution. Diagnostic only; the table already
/// carries the chosen action.
#[derive(Debug, Copy, Clone)]
pub struct Conflict {
    pub state: StateID,
    /// The offending lookahead terminal.
    pub symbol: SymbolID,
    /// The reduce candidate that lost or won by default.
    pub rule: RuleID,
    pub shift: Option<StateID>,
    pub chosen: Action,
    pub kind: ConflictKind,
}

impl Conflict {
    pub fn display<'g>(&self, g: &'g Grammar) -> impl fmt::Display + 'g {
        let c = *self;
        display_fn(move |f| {
            write!(
                f,
                "{:?}: {} conflict on {} for rule [{}], resolved as ",
                c.state,
                c.kind.as_str(),
                g.symbols.name(c.symbol),
                g.rule(c.rule).display(g),
            )?;
            match c.chosen {
                Action::Shift(next) => write!(f, "shift({:?})", next),
                Action::Reduce(rule) => write!(f, "reduce({})", g.rule(rule).display(g)),
                Action::Accept => f.write_str("accept"),
                Action::Fail => f.write_str("fail"),
                Action::Goto(next) => write!(f, "goto({:?})", next),
            }
        })
    }
}

#[derive(Debug)]
pub struct ParseTable {
    pub rows: Vec<TableRow>,
    /// Every bydefault resolution, in discovery order.
    pub conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// Number of real (reduce-reduce or ambiguous) conflicts.
    pub fn conflict_count(&self) -> usize {
        self.conflicts.iter().filter(|c| c.kind.is_counted()).count()
    }

    pub fn counted_conflicts(&self) -> impl Iterator<Item = &Conflict> + '_ {
        self.conflicts.iter().filter(|c| c.kind.is_counted())
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### S#{:03}", i)?;
                for (sym, action) in &row.actions {
                    let name = g.symbols.name(*sym);
                    match action {
                        Action::Shift(next) => writeln!(f, "- {} => shift({:?})", name, next)?,
                        Action::Goto(next) => writeln!(f, "- {} => goto({:?})", name, next)?,
                        Action::Reduce(rule) => {
                            writeln!(f, "- {} => reduce({})", name, g.rule(*rule).display(g))?
                        }
                        Action::Accept => writeln!(f, "- {} => accept", name)?,
                        Action::Fail => writeln!(f, "- {} => fail", name)?,
                    }
                }
                if let Some(rule) = row.default_reduce {
                    writeln!(f, "- <default> => reduce({})", g.rule(rule).display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// The outcome of weighing a reduce candidate against an existing entry.
struct Resolution {
    chosen: Action,
    /// True when the decision was forced rather than settled by
    /// precedence.
    bydefault: bool,
}

pub fn build(g: &Grammar, automaton: &Automaton, lookaheads: &Lookaheads) -> ParseTable {
    let mut rows = Vec::with_capacity(automaton.states.len());
    let mut conflicts = Vec::new();

    for (state, node) in automaton.iter() {
        let mut actions: Map<SymbolID, Action> = Map::default();

        for (&sym, &target) in &node.transitions {
            let action = match g.symbols.classify(sym) {
                SymbolKind::Nonterminal => Action::Goto(target),
                SymbolKind::Terminal => Action::Shift(target),
            };
            actions.insert(sym, action);
        }

        if node
            .items
            .iter()
            .any(|item| item.next_symbol(g) == Some(SymbolID::EOI))
        {
            actions.insert(SymbolID::EOI, Action::Accept);
        }

        for item in &node.reductions {
            let rule = g.rule(item.rule);
            let key = Reduce {
                state,
                rule: item.rule,
            };
            for terminal in lookaheads.lookaheads[&key].iter() {
                match actions.get(&terminal) {
                    None => {
                        actions.insert(terminal, Action::Reduce(rule.id));
                    }
                    Some(&existing) => {
                        let resolution = resolve(g, existing, rule, terminal);
                        if resolution.bydefault {
                            let kind = categorize(g, rule, existing);
                            let conflict = Conflict {
                                state,
                                symbol: terminal,
                                rule: rule.id,
                                shift: match existing {
                                    Action::Shift(next) => Some(next),
                                    _ => None,
                                },
                                chosen: resolution.chosen,
                                kind,
                            };
                            if kind.is_counted() {
                                tracing::debug!(
                                    state = state.raw(),
                                    terminal = g.symbols.name(terminal),
                                    kind = kind.as_str(),
                                    "parse-table conflict"
                                );
                            }
                            conflicts.push(conflict);
                        }
                        actions.insert(terminal, resolution.chosen);
                    }
                }
            }
        }

        let default_reduce = default_action(&actions);
        rows.push(TableRow {
            actions,
            default_reduce,
        });
    }

    ParseTable { rows, conflicts }
}

/// Reduce/reduce picks the lower rule id and is always bydefault;
/// shift/reduce is settled by operator precedence and associativity when
/// both sides carry one, and falls back to shifting otherwise.
fn resolve(g: &Grammar, existing: Action, rule: &Rule, terminal: SymbolID) -> Resolution {
    match existing {
        Action::Reduce(other) => {
            let chosen = if rule.id.raw() < other.raw() {
                Action::Reduce(rule.id)
            } else {
                Action::Reduce(other)
            };
            Resolution {
                chosen,
                bydefault: other != rule.id,
            }
        }

        Action::Shift(next) => {
            let op = g.operators.get(&terminal);
            let (op_level, op_assoc) = match op {
                Some(op) if rule.precedence > 0 => (op.level, op.assoc),
                _ => {
                    return Resolution {
                        chosen: Action::Shift(next),
                        bydefault: true,
                    }
                }
            };
            let chosen = match rule.precedence.cmp(&op_level) {
                std::cmp::Ordering::Less => Action::Shift(next),
                std::cmp::Ordering::Greater => Action::Reduce(rule.id),
                std::cmp::Ordering::Equal => match op_assoc {
                    Assoc::Right => Action::Shift(next),
                    Assoc::Left => Action::Reduce(rule.id),
                    Assoc::Nonassoc => Action::Fail,
                },
            };
            Resolution {
                chosen,
                bydefault: false,
            }
        }

        // Accept and poison entries stand; goto keys never collide with
        // terminal lookaheads.
        other => Resolution {
            chosen: other,
            bydefault: true,
        },
    }
}

/// Categorize a bydefault resolution for diagnostics.
fn categorize(g: &Grammar, rule: &Rule, existing: Action) -> ConflictKind {
    if rule.rhs.is_empty() {
        ConflictKind::EmptyOptional
    } else if rule.rhs.len() == 1 && g.symbols.classify(rule.rhs[0]) == SymbolKind::Nonterminal {
        ConflictKind::Passthrough
    } else if rule.precedence > 0 {
        ConflictKind::Precedence
    } else if matches!(existing, Action::Reduce(_)) {
        ConflictKind::ReduceReduce
    } else {
        ConflictKind::Ambiguous
    }
}

/// A state whose every action entry reduces one rule gets a default
/// action so the driver can skip the token lookup.
fn default_action(actions: &Map<SymbolID, Action>) -> Option<RuleID> {
    let mut default = None;
    for action in actions.values() {
        match action {
            Action::Reduce(rule) if default.is_none() || default == Some(*rule) => {
                default = Some(*rule);
            }
            _ => return None,
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSpec;
    use crate::{automaton, lookahead, rules};

    fn table_for(spec: serde_json::Value) -> (Grammar, ParseTable) {
        let spec: GrammarSpec = serde_json::from_value(spec).unwrap();
        let g = rules::build(&spec).unwrap();
        let automaton = automaton::build(&g);
        let sets = lookahead::compute(&g);
        let lookaheads = lookahead::assign(&g, &automaton, &sets);
        let table = build(&g, &automaton, &lookaheads);
        (g, table)
    }

    #[test]
    fn nonassoc_writes_poison_entries() {
        let (g, table) = table_for(serde_json::json!({
            "grammar": {
                "E": [["NUMBER"], ["E == E"]]
            },
            "operators": [["nonassoc", "=="]]
        }));
        let eq = g.symbols.get("==").unwrap();
        let poisoned = table
            .rows
            .iter()
            .any(|row| row.actions.get(&eq) == Some(&Action::Fail));
        assert!(poisoned);
        assert_eq!(table.conflict_count(), 0);
    }

    #[test]
    fn equal_precedence_follows_associativity() {
        let (g, table) = table_for(serde_json::json!({
            "grammar": {
                "E": [["NUMBER"], ["E + E"]]
            },
            "operators": [["left", "+"]]
        }));
        // Left associativity reduces E + E on a further `+`.
        let plus = g.symbols.get("+").unwrap();
        let reduces = table.rows.iter().any(|row| {
            matches!(row.actions.get(&plus), Some(Action::Reduce(r)) if g.rule(*r).rhs.len() == 3)
        });
        assert!(reduces);
        assert_eq!(table.conflict_count(), 0);
    }

    #[test]
    fn reduce_reduce_prefers_the_earlier_rule() {
        let (g, table) = table_for(serde_json::json!({
            "grammar": {
                "S": [["A"], ["B"]],
                "A": [["x"]],
                "B": [["x"]]
            }
        }));
        assert!(table.conflict_count() >= 1);
        let conflict = table.counted_conflicts().next().unwrap();
        assert_eq!(conflict.kind, ConflictKind::ReduceReduce);
        match conflict.chosen {
            Action::Reduce(rule) => {
                assert_eq!(g.symbols.name(g.rule(rule).lhs), "A");
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[test]
    fn reduce_only_states_get_a_default_action() {
        let (_g, table) = table_for(serde_json::json!({
            "grammar": {
                "List": [[""], ["List ITEM"]]
            }
        }));
        assert!(table
            .rows
            .iter()
            .any(|row| row.default_reduce.is_some()));
    }
}
