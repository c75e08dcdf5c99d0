//! The parse-table data consumed by the driver.
//!
//! Emitted parsers export one [`ParserTables`] value; the generator hands
//! the same structure to the driver when parsing in memory.

use crate::action::ActionProgram;

/// Symbol id of the end-of-input marker `$end`.
pub const EOI: u16 = 1;
/// Symbol id of the `error` recovery token.
pub const ERROR_TOKEN: u16 = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction {
    Shift(u16),
    Goto(u16),
    Reduce(u16),
    Accept,
    /// A poison entry written for nonassoc operators; hitting it is a
    /// syntax error, exactly as if the entry were missing.
    Fail,
}

/// One state's row of the parse table.
#[derive(Debug, Clone)]
pub struct Row {
    /// `(symbol id, action)` entries, sorted by symbol id.
    pub entries: Vec<(u16, ParseAction)>,
    /// Reduction taken without consulting the lookahead, recorded when
    /// every action entry of the row reduces the same rule.
    pub default_reduce: Option<u16>,
}

impl Row {
    pub fn action(&self, symbol: u16) -> Option<ParseAction> {
        self.entries
            .binary_search_by_key(&symbol, |entry| entry.0)
            .ok()
            .map(|idx| self.entries[idx].1)
    }
}

/// The rule table entry: left-hand side and handle length.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub lhs: u16,
    pub len: u16,
}

#[derive(Debug, Clone)]
pub struct ParserTables {
    /// Rows indexed by state id; state 0 is the start state.
    pub rows: Vec<Row>,
    /// Rule infos indexed by rule id; rule 0 is the synthesized accept rule.
    pub rules: Vec<RuleInfo>,
    /// Deduplicated action programs.
    pub actions: Vec<ActionProgram>,
    /// Rule id → index into `actions`.
    pub rule_actions: Vec<u16>,
    /// `(terminal name, symbol id)` pairs, sorted by name.
    pub token_names: Vec<(String, u16)>,
    /// Symbol names indexed by symbol id.
    pub symbol_names: Vec<String>,
    /// Extra parse-parameter names declared by the grammar.
    pub parse_params: Vec<String>,
}

impl ParserTables {
    pub fn token_id(&self, name: &str) -> Option<u16> {
        self.token_names
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|idx| self.token_names[idx].1)
    }

    pub fn symbol_name(&self, id: u16) -> &str {
        self.symbol_names
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    /// Names of the terminals accepted in `state`.
    pub fn expected(&self, state: u16) -> Vec<String> {
        self.rows[state as usize]
            .entries
            .iter()
            .filter(|(_, action)| {
                !matches!(action, ParseAction::Goto(_) | ParseAction::Fail)
            })
            .map(|&(symbol, _)| self.symbol_name(symbol).to_owned())
            .collect()
    }

    /// Whether any state can shift the `error` token, i.e. whether the
    /// grammar opted into error recovery.
    pub fn has_error_recovery(&self) -> bool {
        self.rows
            .iter()
            .any(|row| matches!(row.action(ERROR_TOKEN), Some(ParseAction::Shift(_))))
    }

    pub(crate) fn goto(&self, state: u16, lhs: u16) -> u16 {
        match self.rows[state as usize].action(lhs) {
            Some(ParseAction::Goto(next)) => next,
            _ => unreachable!("missing goto entry for state {} on symbol {}", state, lhs),
        }
    }
}
