//! An SLR(1) parser generator.
//!
//! A grammar arrives as plain data — named nonterminals with production
//! alternatives, terminals named by bare strings, an ordered operator
//! table and per-production action templates — and compiles into a parse
//! table plus executable semantic actions. The result can drive a parse
//! directly through `grackle-runtime`, or be emitted as a self-contained
//! parser module.

pub mod action;
pub mod automaton;
pub mod codegen;
pub mod grammar;
pub mod lookahead;
pub mod rules;
pub mod symbol;
pub mod table;
pub mod types;
pub mod util;

pub use crate::codegen::Codegen;
pub use crate::grammar::{ActionMode, Assoc, GrammarSpec};
pub use crate::rules::{Grammar, RuleID};
pub use crate::symbol::SymbolID;
pub use crate::table::{Conflict, ConflictKind, ParseTable};

use crate::automaton::Automaton;
use crate::lookahead::{GrammarSets, Lookaheads};
use grackle_runtime::tables::{ParseAction, ParserTables, Row, RuleInfo};

/// Errors raised while compiling a grammar. Conflicts are not errors;
/// they are counted and recorded on the parse table.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar defines no rules")]
    NoRules,

    #[error("start symbol `{0}` is not defined by any rule")]
    UndefinedStart(String),

    #[error("unknown grammar format: expected a `grammar` or `bnf` rule map")]
    UnknownFormat,

    #[error("`{0}` is reserved and cannot be redefined")]
    ReservedName(String),

    #[error("failed to load grammar: {0}")]
    Load(String),
}

/// Counts reported by `--stats`: user tokens and nonterminals, user
/// rules, automaton states, and counted conflicts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub tokens: usize,
    pub types: usize,
    pub rules: usize,
    pub states: usize,
    pub conflicts: usize,
}

/// The grammar compiler. Construction runs every phase in order: symbol
/// resolution and rule building, LR(0) states, analysis sets and SLR(1)
/// lookaheads, then the parse table.
#[derive(Debug)]
pub struct Generator {
    grammar: Grammar,
    automaton: Automaton,
    sets: GrammarSets,
    lookaheads: Lookaheads,
    table: ParseTable,
}

impl Generator {
    pub fn new(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        let grammar = rules::build(spec)?;
        let automaton = automaton::build(&grammar);
        let sets = lookahead::compute(&grammar);
        let lookaheads = lookahead::assign(&grammar, &automaton, &sets);
        let table = table::build(&grammar, &automaton, &lookaheads);
        tracing::debug!(
            states = automaton.states.len(),
            conflicts = table.conflict_count(),
            "parse table built"
        );
        Ok(Self {
            grammar,
            automaton,
            sets,
            lookaheads,
            table,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn sets(&self) -> &GrammarSets {
        &self.sets
    }

    pub fn lookaheads(&self) -> &Lookaheads {
        &self.lookaheads
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.table.conflicts
    }

    pub fn statistics(&self) -> Statistics {
        let tokens = self
            .grammar
            .symbols
            .terminals()
            .filter(|(id, _)| *id != SymbolID::EOI && *id != SymbolID::ERROR)
            .count();
        let types = self
            .grammar
            .symbols
            .nonterminals()
            .filter(|(id, _)| *id != SymbolID::ACCEPT)
            .count();
        Statistics {
            tokens,
            types,
            rules: self.grammar.rules.len() - 1,
            states: self.automaton.states.len(),
            conflicts: self.table.conflict_count(),
        }
    }

    /// Lower the parse table, rule table, token map and compiled actions
    /// into the data form the runtime driver consumes.
    pub fn tables(&self) -> ParserTables {
        let rows = self
            .table
            .rows
            .iter()
            .map(|row| {
                let mut entries: Vec<(u16, ParseAction)> = row
                    .actions
                    .iter()
                    .map(|(sym, action)| (sym.raw(), lower_action(*action)))
                    .collect();
                entries.sort_by_key(|entry| entry.0);
                Row {
                    entries,
                    default_reduce: row.default_reduce.map(RuleID::raw),
                }
            })
            .collect();

        let rules = self
            .grammar
            .rule_table()
            .into_iter()
            .map(|(lhs, len)| RuleInfo {
                lhs: lhs.raw(),
                len: len as u16,
            })
            .collect();

        let mut token_names: Vec<(String, u16)> = self
            .grammar
            .symbols
            .terminals()
            .map(|(id, data)| (data.name.clone(), id.raw()))
            .collect();
        token_names.sort();

        ParserTables {
            rows,
            rules,
            actions: self.grammar.actions.programs(),
            rule_actions: self
                .grammar
                .rules
                .iter()
                .map(|rule| rule.action as u16)
                .collect(),
            token_names,
            symbol_names: self
                .grammar
                .symbols
                .iter()
                .map(|(_, data)| data.name.clone())
                .collect(),
            parse_params: self.grammar.parse_params.clone(),
        }
    }

    pub fn codegen(&self) -> Codegen<'_> {
        Codegen::new(self)
    }
}

fn lower_action(action: table::Action) -> ParseAction {
    match action {
        table::Action::Shift(next) => ParseAction::Shift(next.raw()),
        table::Action::Goto(next) => ParseAction::Goto(next.raw()),
        table::Action::Reduce(rule) => ParseAction::Reduce(rule.raw()),
        table::Action::Accept => ParseAction::Accept,
        table::Action::Fail => ParseAction::Fail,
    }
}
