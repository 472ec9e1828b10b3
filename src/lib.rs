extern crate wasm_bindgen;

use std::fmt::Display;

use wasm_bindgen::prelude::*;

pub mod grammar;
pub use grammar::{
    AnalysisConfig, Grammar, GrammarError, LL1ParsingTable, LRParseReport, LRParsingTable,
    LRParsingTableAction,
};

fn error_json<E: Display>(e: E) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

fn first_follow(grammar: &str) -> Result<String, GrammarError> {
    let g = Grammar::parse(grammar)?;
    let analysis = g.analyze(&AnalysisConfig::default())?;
    Ok(analysis.to_first_follow_output_vec().to_json())
}

fn ll1_table(grammar: &str) -> Result<String, GrammarError> {
    let g = Grammar::parse(grammar)?;
    let analysis = g.analyze(&AnalysisConfig::default())?;
    let (table, conflicts) = analysis.generate_ll1_parsing_table();
    Ok(serde_json::to_string(&table.to_output(&conflicts))?)
}

#[wasm_bindgen]
pub fn first_follow_to_json(grammar: &str) -> String {
    first_follow(grammar).unwrap_or_else(error_json)
}

#[wasm_bindgen]
pub fn ll1_table_to_json(grammar: &str) -> String {
    ll1_table(grammar).unwrap_or_else(error_json)
}

/// `tables` is the JSON action/goto form, `input` whitespace-separated terminals.
#[wasm_bindgen]
pub fn lr_parse_to_json(tables: &str, input: &str) -> String {
    match LRParsingTable::from_json(tables) {
        Ok(table) => {
            let report = table.parse(input.split_whitespace());
            serde_json::to_string(&report).unwrap_or_else(error_json)
        }
        Err(e) => error_json(e),
    }
}


#[cfg(test)]
mod json_tests {
    #[test]
    fn first_follow() {
        let json = crate::first_follow_to_json("S -> A B\nA -> a A | ε\nB -> b B | ε");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["data"][1]["name"], "A");
        assert_eq!(value["data"][1]["first"], serde_json::json!(["a", "ε"]));
        assert_eq!(value["data"][1]["follow"], serde_json::json!(["$", "b"]));
    }

    #[test]
    fn reports_errors() {
        let json = crate::first_follow_to_json("S a -> b");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["error"], "line 1: left side contains whitespace");
    }

    #[test]
    fn ll1_table_with_conflict() {
        let json = crate::ll1_table_to_json("S -> a b | a c");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["terminals"], serde_json::json!(["a", "b", "c", "$"]));
        assert_eq!(value["conflicts"][0]["terminal"], "a");
    }

    #[test]
    fn lr_parse() {
        let tables = r#"{
            "action": {"0": {"a": "shift 1"}, "1": {"a": "shift 2"}, "2": {"$": "accept"}},
            "goto": {"0": {"A": 2}, "1": {}, "2": {"A": 1}}
        }"#;
        let value: serde_json::Value =
            serde_json::from_str(&crate::lr_parse_to_json(tables, "a a")).unwrap();
        assert_eq!(value["rejection"], serde_json::Value::Null);
        assert_eq!(value["steps"][0]["kind"], "shift");
        assert_eq!(value["steps"][2]["kind"], "accept");

        let value: serde_json::Value =
            serde_json::from_str(&crate::lr_parse_to_json(tables, "a b")).unwrap();
        assert_eq!(value["rejection"]["stack"], serde_json::json!([0, "a", 1]));
        assert_eq!(value["rejection"]["remaining"], serde_json::json!(["b", "$"]));
        assert_eq!(value["rejection"]["reason"]["kind"], "no_action");
    }
}
