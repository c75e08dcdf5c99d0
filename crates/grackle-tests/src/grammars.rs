//! Grammar definitions for the integration tests.

use grackle::GrammarSpec;
use serde_json::json;

fn load(value: serde_json::Value) -> GrammarSpec {
    serde_json::from_value(value).expect("fixture grammar")
}

/// Ambiguous arithmetic disambiguated by the operator table.
pub fn arithmetic() -> GrammarSpec {
    load(json!({
        "grammar": {
            "Expression": [
                ["NUMBER"],
                ["Expression + Expression", "[\"+\",1,3]"],
                ["Expression * Expression", "[\"*\",1,3]"],
                ["( Expression )", 2]
            ]
        },
        "operators": [["left", "+"], ["left", "*"]],
        "start": "Expression"
    }))
}

/// Right-associative exponentiation.
pub fn exponentiation() -> GrammarSpec {
    load(json!({
        "grammar": {
            "E": [
                ["NUMBER"],
                ["E ^ E", "[\"^\",1,3]"]
            ]
        },
        "operators": [["right", "^"]]
    }))
}

/// Left-recursive list with an ε seed and spread accumulation.
pub fn item_list() -> GrammarSpec {
    load(json!({
        "grammar": {
            "List": [
                [""],
                ["List ITEM", "[...1,2]"]
            ]
        }
    }))
}

/// Nonassoc comparison: chaining `==` is a parse error.
pub fn comparison() -> GrammarSpec {
    load(json!({
        "grammar": {
            "E": [
                ["NUMBER"],
                ["E == E", "[\"==\",1,3]"]
            ]
        },
        "operators": [["nonassoc", "=="]]
    }))
}

/// Two nonterminals deriving the same terminal under the same lookahead:
/// a reduce/reduce conflict the table resolves toward the earlier rule.
pub fn ambiguous_reduce() -> GrammarSpec {
    load(json!({
        "grammar": {
            "S": [["A"], ["B"]],
            "A": [["x"]],
            "B": [["x"]]
        }
    }))
}

/// jison-mode rules with inline aliases and named references.
pub fn assignment_bnf() -> GrammarSpec {
    load(json!({
        "bnf": {
            "Stmt": [
                ["Var[name] = Expr[value]", "return assign($name, $value)"]
            ],
            "Var": [["ID"]],
            "Expr": [["NUMBER"]]
        }
    }))
}
