//! LR(0) item-set construction with kernel deduplication.

use crate::rules::{Grammar, RuleID};
use crate::symbol::SymbolID;
use crate::types::{Map, Set};
use crate::util::display_fn;
use std::collections::VecDeque;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl StateID {
    pub const START: Self = Self(0);

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// An LR(0) item: a rule with a dot position. Two items with equal
/// `(rule, dot)` are the same item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub rule: RuleID,
    pub dot: u16,
}

impl Item {
    /// The symbol right of the dot, or `None` for a reduction item.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).rhs.get(self.dot as usize).copied()
    }

    pub fn display<'g>(&self, g: &'g Grammar) -> impl fmt::Display + 'g {
        let item = *self;
        display_fn(move |f| {
            let rule = g.rule(item.rule);
            write!(f, "{} ->", g.symbols.name(rule.lhs))?;
            for (i, &sym) in rule.rhs.iter().enumerate() {
                if i == item.dot as usize {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbols.name(sym))?;
            }
            if item.dot as usize == rule.rhs.len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct State {
    /// The closed item set.
    pub items: Set<Item>,
    /// The kernel that identifies this state, sorted.
    pub kernel: Vec<Item>,
    pub transitions: Map<SymbolID, StateID>,
    /// Items whose dot reached the end of the handle.
    pub reductions: Vec<Item>,
    pub has_shifts: bool,
    pub has_conflicts: bool,
}

impl State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.transitions.is_empty() {
                writeln!(f, "## transitions:")?;
                for (sym, next) in &self.transitions {
                    writeln!(f, "- {} => {:?}", g.symbols.name(*sym), next)?;
                }
            }
            if !self.reductions.is_empty() {
                writeln!(f, "## reductions:")?;
                for item in &self.reductions {
                    writeln!(f, "- {}", g.rule(item.rule).display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// The canonical LR(0) automaton; state ids are dense indices into
/// `states`.
#[derive(Debug)]
pub struct Automaton {
    pub states: Vec<State>,
}

impl Automaton {
    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(raw, state)| (StateID(raw as u16), state))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (id, state) in self.iter() {
                writeln!(f, "#### {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Build the canonical collection. Successor kernels are deduplicated by
/// their sorted `(rule, dot)` vector, so each canonical state is created
/// exactly once.
pub fn build(g: &Grammar) -> Automaton {
    let mut states: Vec<State> = Vec::new();
    let mut next_raw: u16 = 0;
    let mut state_id = move || {
        let id = StateID(next_raw);
        next_raw += 1;
        id
    };

    let start_kernel = vec![Item {
        rule: RuleID::ACCEPT,
        dot: 0,
    }];

    let mut kernels = Map::<Vec<Item>, StateID>::default();
    let mut pending = VecDeque::<(StateID, Vec<Item>)>::new();
    let start = state_id();
    kernels.insert(start_kernel.clone(), start);
    pending.push_back((start, start_kernel));

    while let Some((id, kernel)) = pending.pop_front() {
        // Closure, accumulating the reduction/shift flags as items land.
        let mut items: Set<Item> = kernel.iter().copied().collect();
        let mut reductions = Vec::new();
        let mut has_shifts = false;
        let mut has_conflicts = false;

        let mut cursor = 0;
        while let Some(&item) = items.get_index(cursor) {
            cursor += 1;
            match item.next_symbol(g) {
                None => {
                    reductions.push(item);
                    has_conflicts |= reductions.len() > 1 || has_shifts;
                }
                Some(sym) if g.symbols.is_terminal(sym) => {
                    has_shifts = true;
                    has_conflicts |= !reductions.is_empty();
                }
                Some(sym) => {
                    for &rule in g.rules_of(sym) {
                        items.insert(Item { rule, dot: 0 });
                    }
                }
            }
        }

        // Group items by their next symbol; `$end` is never shifted, the
        // table builder turns it into the accept entry.
        let mut successors: Map<SymbolID, Vec<Item>> = Map::default();
        for &item in &items {
            match item.next_symbol(g) {
                Some(sym) if sym != SymbolID::EOI => {
                    successors.entry(sym).or_default().push(Item {
                        rule: item.rule,
                        dot: item.dot + 1,
                    });
                }
                _ => {}
            }
        }

        let mut transitions = Map::default();
        for (sym, mut successor_kernel) in successors {
            successor_kernel.sort();
            let next = match kernels.get(&successor_kernel) {
                Some(&existing) => existing,
                None => {
                    let next = state_id();
                    kernels.insert(successor_kernel.clone(), next);
                    pending.push_back((next, successor_kernel));
                    next
                }
            };
            transitions.insert(sym, next);
        }

        debug_assert_eq!(states.len(), id.0 as usize);
        states.push(State {
            items,
            kernel,
            transitions,
            reductions,
            has_shifts,
            has_conflicts,
        });
    }

    tracing::debug!(states = states.len(), "LR(0) automaton built");

    Automaton { states }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSpec;
    use crate::rules;

    fn arithmetic() -> Grammar {
        let spec: GrammarSpec = serde_json::from_value(serde_json::json!({
            "grammar": {
                "E": [["NUMBER"], ["E + E"], ["E * E"], ["( E )"]]
            },
            "operators": [["left", "+"], ["left", "*"]]
        }))
        .unwrap();
        rules::build(&spec).unwrap()
    }

    #[test]
    fn start_state_closes_over_start_productions() {
        let g = arithmetic();
        let automaton = build(&g);
        let start = automaton.state(StateID::START);
        // [$accept -> . E $end] plus the four E productions.
        assert_eq!(start.items.len(), 5);
        assert!(!start.has_conflicts);
    }

    #[test]
    fn kernels_identify_states() {
        let g = arithmetic();
        let automaton = build(&g);
        let mut seen = std::collections::HashSet::new();
        for state in &automaton.states {
            assert!(seen.insert(state.kernel.clone()), "duplicated kernel");
        }
    }

    #[test]
    fn goto_is_deterministic() {
        let g = arithmetic();
        let a = build(&g);
        let b = build(&g);
        assert_eq!(a.states.len(), b.states.len());
        for (x, y) in a.states.iter().zip(&b.states) {
            assert_eq!(x.kernel, y.kernel);
            assert_eq!(x.transitions, y.transitions);
        }
    }
}
