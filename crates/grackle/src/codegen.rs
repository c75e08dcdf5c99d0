//! Emission of a self-contained parser module.
//!
//! The emitted module is ordinary Rust depending only on
//! `grackle-runtime`: the parse table, rule table, token-name map and
//! deduplicated action programs are serialized as constructor data, with
//! a `parser()` factory, a shared `tables()` singleton and a bound
//! `parse` function on top.

use crate::rules::Grammar;
use crate::types::Map;
use crate::Generator;
use grackle_runtime::action::{ActionProgram, ListElem};
use grackle_runtime::tables::{ParseAction, ParserTables};
use std::fmt;

pub struct Codegen<'g> {
    grammar: &'g Grammar,
    tables: ParserTables,
}

impl<'g> Codegen<'g> {
    pub fn new(generator: &'g Generator) -> Self {
        Self {
            grammar: generator.grammar(),
            tables: generator.tables(),
        }
    }
}

impl fmt::Display for Codegen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = &self.tables;

        writeln!(f, "// Parser generated by grackle. Do not edit by hand.")?;
        writeln!(f)?;
        writeln!(f, "use grackle_runtime::_private as rt;")?;
        writeln!(f, "use std::sync::OnceLock;")?;
        writeln!(f)?;

        writeln!(f, "/// Terminal names and their symbol ids.")?;
        writeln!(f, "pub const TOKENS: &[(&str, u16)] = &[")?;
        for (name, id) in &tables.token_names {
            writeln!(f, "    ({:?}, {}),", name, id)?;
        }
        writeln!(f, "];")?;
        writeln!(f)?;

        writeln!(f, "fn build_tables() -> rt::ParserTables {{")?;
        writeln!(f, "    rt::ParserTables {{")?;

        writeln!(f, "        rows: vec![")?;
        for row in &tables.rows {
            write!(f, "            rt::Row {{ entries: vec![")?;
            for (i, (symbol, action)) in row.entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "({}, {})", symbol, render_action(*action))?;
            }
            write!(f, "], default_reduce: ")?;
            match row.default_reduce {
                Some(rule) => write!(f, "Some({})", rule)?,
                None => f.write_str("None")?,
            }
            writeln!(f, " }},")?;
        }
        writeln!(f, "        ],")?;

        writeln!(f, "        rules: vec![")?;
        for info in &tables.rules {
            writeln!(
                f,
                "            rt::RuleInfo {{ lhs: {}, len: {} }},",
                info.lhs, info.len
            )?;
        }
        writeln!(f, "        ],")?;

        // One dispatch entry per deduplicated body; the comment names
        // every rule sharing it.
        let mut sharers: Map<u16, Vec<u16>> = Map::default();
        for (rule, &action) in tables.rule_actions.iter().enumerate() {
            sharers.entry(action).or_default().push(rule as u16);
        }
        writeln!(f, "        actions: vec![")?;
        for (idx, program) in tables.actions.iter().enumerate() {
            if let Some(rules) = sharers.get(&(idx as u16)) {
                write!(f, "            // rules")?;
                for rule in rules {
                    write!(f, " {}", rule)?;
                }
                writeln!(f)?;
            }
            write!(f, "            ")?;
            render_program(f, program)?;
            writeln!(f, ",")?;
        }
        writeln!(f, "        ],")?;

        write!(f, "        rule_actions: vec![")?;
        for (i, action) in tables.rule_actions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", action)?;
        }
        writeln!(f, "],")?;

        writeln!(
            f,
            "        token_names: TOKENS.iter().map(|&(name, id)| (name.to_owned(), id)).collect(),"
        )?;

        writeln!(f, "        symbol_names: vec![")?;
        for name in &tables.symbol_names {
            writeln!(f, "            {:?}.to_owned(),", name)?;
        }
        writeln!(f, "        ],")?;

        write!(f, "        parse_params: vec![")?;
        for (i, param) in tables.parse_params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}.to_owned()", param)?;
        }
        writeln!(f, "],")?;

        writeln!(f, "    }}")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "/// The embedded parse table, built on first use.")?;
        writeln!(f, "pub fn tables() -> &'static rt::ParserTables {{")?;
        writeln!(
            f,
            "    static TABLES: OnceLock<rt::ParserTables> = OnceLock::new();"
        )?;
        writeln!(f, "    TABLES.get_or_init(build_tables)")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "/// Create a parser over the embedded tables.")?;
        writeln!(f, "pub fn parser() -> rt::Parser<'static> {{")?;
        writeln!(f, "    rt::Parser::new(tables())")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(
            f,
            "/// Parse the token stream produced by `lexer`, returning the"
        )?;
        writeln!(
            f,
            "/// value of the `{}` reduction.",
            self.grammar.symbols.name(self.grammar.start)
        )?;
        writeln!(
            f,
            "pub fn parse<L: rt::Lexer>(lexer: &mut L) -> Result<rt::Value, rt::ParseError> {{"
        )?;
        writeln!(f, "    parser().parse(lexer)")?;
        writeln!(f, "}}")?;

        Ok(())
    }
}

fn render_action(action: ParseAction) -> String {
    match action {
        ParseAction::Shift(next) => format!("rt::ParseAction::Shift({})", next),
        ParseAction::Goto(next) => format!("rt::ParseAction::Goto({})", next),
        ParseAction::Reduce(rule) => format!("rt::ParseAction::Reduce({})", rule),
        ParseAction::Accept => "rt::ParseAction::Accept".to_owned(),
        ParseAction::Fail => "rt::ParseAction::Fail".to_owned(),
    }
}

fn render_program(f: &mut fmt::Formatter<'_>, program: &ActionProgram) -> fmt::Result {
    match program {
        ActionProgram::Null => f.write_str("rt::ActionProgram::Null"),
        ActionProgram::Bool(b) => write!(f, "rt::ActionProgram::Bool({})", b),
        ActionProgram::Num(n) => write!(f, "rt::ActionProgram::Num({:?})", n),
        ActionProgram::Str(s) => write!(f, "rt::ActionProgram::Str({:?}.to_owned())", s),
        ActionProgram::Arg(offset) => write!(f, "rt::ActionProgram::Arg({})", offset),
        ActionProgram::Raw(body) => write!(f, "rt::ActionProgram::Raw({:?}.to_owned())", body),
        ActionProgram::List(elems) => {
            f.write_str("rt::ActionProgram::List(vec![")?;
            for (i, elem) in elems.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                match elem {
                    ListElem::Item(inner) => {
                        f.write_str("rt::ListElem::Item(")?;
                        render_program(f, inner)?;
                        f.write_str(")")?;
                    }
                    ListElem::Spread(inner) => {
                        f.write_str("rt::ListElem::Spread(")?;
                        render_program(f, inner)?;
                        f.write_str(")")?;
                    }
                }
            }
            f.write_str("])")
        }
    }
}
