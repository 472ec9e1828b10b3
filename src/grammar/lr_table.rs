//! Action/goto tables for the shift-reduce engine, supplied as configuration.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{is_epsilon, LRTableError};

/// Production used by a reduce action. An empty `right` is an ε production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReduceRule {
    pub left: String,
    pub right: Vec<String>,
}

impl fmt::Display for ReduceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.right.is_empty() {
            write!(f, "{} -> {}", self.left, super::EPSILON)
        } else {
            write!(f, "{} -> {}", self.left, self.right.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LRParsingTableAction {
    Shift(usize),
    Reduce(ReduceRule),
    Accept,
}

impl LRParsingTableAction {
    pub fn reduce<L, R, S>(left: L, right: R) -> Self
    where
        L: Into<String>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LRParsingTableAction::Reduce(ReduceRule {
            left: left.into(),
            right: right
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !is_epsilon(s))
                .collect(),
        })
    }
}

impl fmt::Display for LRParsingTableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LRParsingTableAction::Shift(s) => write!(f, "shift {}", s),
            LRParsingTableAction::Reduce(r) => write!(f, "reduce {}", r),
            LRParsingTableAction::Accept => f.write_str("accept"),
        }
    }
}

/// Accepts `shift N`, `accept` and `reduce A -> β` (`→` also works, β is
/// whitespace separated and may be `ε` or empty).
impl FromStr for LRParsingTableAction {
    type Err = LRTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LRTableError::InvalidAction(s.to_string());
        let text = s.trim();

        if text == "accept" {
            return Ok(LRParsingTableAction::Accept);
        }
        if let Some(state) = text.strip_prefix("shift") {
            return state
                .trim()
                .parse()
                .map(LRParsingTableAction::Shift)
                .map_err(|_| invalid());
        }
        if let Some(rule) = text.strip_prefix("reduce") {
            let (left, right) = rule
                .split_once("->")
                .or_else(|| rule.split_once('→'))
                .ok_or_else(invalid)?;
            let left = left.trim();
            if left.is_empty() || left.split_whitespace().count() != 1 {
                return Err(invalid());
            }
            return Ok(LRParsingTableAction::reduce(left, right.split_whitespace()));
        }
        Err(invalid())
    }
}

impl TryFrom<String> for LRParsingTableAction {
    type Error = LRTableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LRParsingTableAction> for String {
    fn from(action: LRParsingTableAction) -> Self {
        action.to_string()
    }
}

/// `Action[state][terminal]` and `Goto[state][non-terminal]`.
///
/// The JSON form mirrors the two tables:
///
/// ```json
/// {
///   "action": {"0": {"a": "shift 1"}, "2": {"$": "accept"}},
///   "goto": {"0": {"A": 2}}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LRParsingTable {
    #[serde(default)]
    action: HashMap<usize, HashMap<String, LRParsingTableAction>>,
    #[serde(default)]
    goto: HashMap<usize, HashMap<String, usize>>,
}

impl LRParsingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, LRTableError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn with_action<S: Into<String>>(
        mut self,
        state: usize,
        terminal: S,
        action: LRParsingTableAction,
    ) -> Self {
        self.set_action(state, terminal, action);
        self
    }

    pub fn with_goto<S: Into<String>>(mut self, state: usize, non_terminal: S, next: usize) -> Self {
        self.set_goto(state, non_terminal, next);
        self
    }

    pub fn set_action<S: Into<String>>(
        &mut self,
        state: usize,
        terminal: S,
        action: LRParsingTableAction,
    ) {
        self.action
            .entry(state)
            .or_default()
            .insert(terminal.into(), action);
    }

    pub fn set_goto<S: Into<String>>(&mut self, state: usize, non_terminal: S, next: usize) {
        self.goto
            .entry(state)
            .or_default()
            .insert(non_terminal.into(), next);
    }

    pub fn action(&self, state: usize, terminal: &str) -> Option<&LRParsingTableAction> {
        self.action.get(&state)?.get(terminal)
    }

    pub fn goto(&self, state: usize, non_terminal: &str) -> Option<usize> {
        self.goto.get(&state)?.get(non_terminal).copied()
    }

    /// Every state mentioned by either table, ascending.
    pub fn states(&self) -> Vec<usize> {
        let mut states: Vec<usize> = self.action.keys().chain(self.goto.keys()).copied().collect();
        states.sort_unstable();
        states.dedup();
        states
    }

    /// Column headers: action terminals (sorted, `$` last) and goto non-terminals
    /// (sorted).
    pub fn columns(&self) -> (Vec<&str>, Vec<&str>) {
        let mut terminals: Vec<&str> = self
            .action
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        terminals.sort_unstable_by_key(|t| (*t == super::END_MARK, *t));
        terminals.dedup();

        let mut non_terminals: Vec<&str> = self
            .goto
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        non_terminals.sort_unstable();
        non_terminals.dedup();

        (terminals, non_terminals)
    }
}
