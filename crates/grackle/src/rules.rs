//! Rule building: from the declarative grammar object to the compiled
//! rule list the later phases consume.

use crate::action::{self, CompiledActions, NameTable};
use crate::grammar::{ActionMode, AltOptions, Assoc, GrammarSpec};
use crate::symbol::{SymbolID, SymbolKind, SymbolTable};
use crate::types::Map;
use crate::util::display_fn;
use crate::GrammarError;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleID(u16);

impl RuleID {
    /// The synthesized accept rule `$accept → start $end`.
    pub const ACCEPT: Self = Self(0);

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "R#Accept"),
            _ => write!(f, "R#{:03}", self.0),
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub id: RuleID,
    pub lhs: SymbolID,
    /// The handle; empty for ε-productions.
    pub rhs: Vec<SymbolID>,
    /// Operator level; 0 = unspecified.
    pub precedence: u16,
    /// Index into the deduplicated action store.
    pub action: usize,
}

impl Rule {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.symbols.name(self.lhs))?;
            if self.rhs.is_empty() {
                f.write_str(" ε")?;
            } else {
                for &sym in &self.rhs {
                    write!(f, " {}", g.symbols.name(sym))?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Operator {
    pub assoc: Assoc,
    /// Precedence level; 1 = lowest.
    pub level: u16,
}

/// The compiled grammar: interned symbols, the dense rule list (rule 0 is
/// the accept rule), the operator table, and the compiled actions.
#[derive(Debug)]
pub struct Grammar {
    pub symbols: SymbolTable,
    pub rules: Vec<Rule>,
    pub nonterminal_rules: Map<SymbolID, Vec<RuleID>>,
    pub operators: Map<SymbolID, Operator>,
    pub start: SymbolID,
    pub actions: CompiledActions,
    pub mode: ActionMode,
    pub parse_params: Vec<String>,
}

impl Grammar {
    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[id.0 as usize]
    }

    pub fn rules_of(&self, nonterminal: SymbolID) -> &[RuleID] {
        self.nonterminal_rules
            .get(&nonterminal)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The flat rule table: `(LHS, handle length)` per rule id.
    pub fn rule_table(&self) -> Vec<(SymbolID, usize)> {
        self.rules.iter().map(|r| (r.lhs, r.rhs.len())).collect()
    }

    /// Render the grammar as an s-expression.
    pub fn sexp(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            writeln!(f, "(grammar")?;
            writeln!(f, "  (start {})", self.symbols.name(self.start))?;
            if !self.operators.is_empty() {
                writeln!(f, "  (operators")?;
                let mut by_level: Map<u16, (Assoc, Vec<&str>)> = Map::default();
                for (&sym, op) in &self.operators {
                    by_level
                        .entry(op.level)
                        .or_insert((op.assoc, Vec::new()))
                        .1
                        .push(self.symbols.name(sym));
                }
                for (_, (assoc, tokens)) in &by_level {
                    write!(f, "    ({}", assoc.as_str())?;
                    for token in tokens {
                        write!(f, " {}", token)?;
                    }
                    writeln!(f, ")")?;
                }
                writeln!(f, "  )")?;
            }
            writeln!(f, "  (rules")?;
            for (&nt, rule_ids) in &self.nonterminal_rules {
                if nt == SymbolID::ACCEPT {
                    continue;
                }
                writeln!(f, "    ({}", self.symbols.name(nt))?;
                for &id in rule_ids {
                    let rule = self.rule(id);
                    f.write_str("      (")?;
                    for (i, &sym) in rule.rhs.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        f.write_str(self.symbols.name(sym))?;
                    }
                    writeln!(f, ")")?;
                }
                writeln!(f, "    )")?;
            }
            writeln!(f, "  )")?;
            f.write_str(")")
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, (_, data)) in self.symbols.terminals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&data.name)?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, (_, data)) in self.symbols.nonterminals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&data.name)?;
        }
        writeln!(f, "\n#### start: {}", self.symbols.name(self.start))?;
        writeln!(f, "#### rules:")?;
        for rule in &self.rules {
            writeln!(f, "- [{:?}] {}", rule.id, rule.display(self))?;
        }
        Ok(())
    }
}

/// Strip an inline `[alias]` suffix from a pattern token.
fn split_alias(token: &str) -> (&str, Option<&str>) {
    if let Some(open) = token.find('[') {
        if token.ends_with(']') && open > 0 {
            return (&token[..open], Some(&token[open + 1..token.len() - 1]));
        }
    }
    (token, None)
}

fn rule_precedence(
    options: Option<&AltOptions>,
    rhs: &[SymbolID],
    symbols: &SymbolTable,
    operators: &Map<SymbolID, Operator>,
) -> u16 {
    if let Some(prec) = options.and_then(|o| o.prec.as_deref()) {
        if let Some(op) = symbols.get(prec).and_then(|id| operators.get(&id)) {
            return op.level;
        }
    }
    // Inherit from the rightmost operator terminal of the handle.
    for &sym in rhs.iter().rev() {
        if symbols.is_terminal(sym) {
            if let Some(op) = operators.get(&sym) {
                return op.level;
            }
        }
    }
    0
}

/// Compile the declarative grammar into rules, symbols and actions.
pub fn build(spec: &GrammarSpec) -> Result<Grammar, GrammarError> {
    let rule_map = spec.rules()?;
    let mode = spec.mode();
    if rule_map.is_empty() {
        return Err(GrammarError::NoRules);
    }

    for name in rule_map.keys() {
        if matches!(name.as_str(), "$accept" | "$end" | "error") {
            return Err(GrammarError::ReservedName(name.clone()));
        }
    }

    // Intern every symbol in first-seen order: a name is a nonterminal
    // iff the grammar defines productions for it.
    let mut symbols = SymbolTable::new();
    for (lhs, alternatives) in rule_map {
        symbols.intern(lhs, SymbolKind::Nonterminal);
        for alt in alternatives {
            for token in alt.pattern().tokens() {
                let (name, _) = split_alias(token);
                let kind = if rule_map.contains_key(name) {
                    SymbolKind::Nonterminal
                } else {
                    SymbolKind::Terminal
                };
                symbols.intern(name, kind);
            }
        }
    }

    let mut operators = Map::default();
    for (row_idx, row) in spec.operators.iter().enumerate() {
        for token in &row.tokens {
            let id = symbols.intern(token, SymbolKind::Terminal);
            operators.insert(
                id,
                Operator {
                    assoc: row.assoc,
                    level: row_idx as u16 + 1,
                },
            );
        }
    }

    let start_name = match &spec.start {
        Some(name) => name.as_str(),
        None => rule_map.keys().next().expect("non-empty rule map"),
    };
    if !rule_map.contains_key(start_name) {
        return Err(GrammarError::UndefinedStart(start_name.to_owned()));
    }
    let start = symbols.get(start_name).expect("start symbol interned");

    let mut rules = Vec::new();
    let mut actions = CompiledActions::default();
    let mut nonterminal_rules: Map<SymbolID, Vec<RuleID>> = Map::default();

    // Rule 0: the synthesized accept rule. Its action never runs; the
    // driver accepts before reducing it.
    let accept_action = actions.add(action::compile(mode, None, 2, &NameTable::default()));
    rules.push(Rule {
        id: RuleID::ACCEPT,
        lhs: SymbolID::ACCEPT,
        rhs: vec![start, SymbolID::EOI],
        precedence: 0,
        action: accept_action,
    });
    nonterminal_rules.insert(SymbolID::ACCEPT, vec![RuleID::ACCEPT]);

    let mut next_id: u16 = 1;
    for (lhs_name, alternatives) in rule_map {
        let lhs = symbols.get(lhs_name).expect("LHS interned");
        for alt in alternatives {
            let mut rhs = Vec::new();
            let mut named = Vec::new();
            for token in alt.pattern().tokens() {
                let (name, alias) = split_alias(token);
                rhs.push(symbols.get(name).expect("RHS symbol interned"));
                named.push((name.to_owned(), alias.map(str::to_owned)));
            }

            let precedence = rule_precedence(alt.options(), &rhs, &symbols, &operators);
            let names = NameTable::new(&named);
            let body = action::compile(mode, alt.action(), rhs.len(), &names);

            let id = RuleID(next_id);
            next_id += 1;
            nonterminal_rules.entry(lhs).or_default().push(id);
            rules.push(Rule {
                id,
                lhs,
                rhs,
                precedence,
                action: actions.add(body),
            });
        }
    }

    tracing::debug!(
        symbols = symbols.len(),
        rules = rules.len(),
        "grammar compiled"
    );

    Ok(Grammar {
        symbols,
        rules,
        nonterminal_rules,
        operators,
        start,
        actions,
        mode,
        parse_params: spec.parse_params.clone(),
    })
}
