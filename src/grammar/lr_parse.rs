//! Table-driven shift-reduce automaton.

use std::{collections::VecDeque, fmt};

use serde::Serialize;

use super::{
    lr_table::{LRParsingTable, LRParsingTableAction, ReduceRule},
    END_MARK,
};

/// Parser stack cell. The stack alternates states and symbols, starting and
/// ending with a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StackEntry {
    State(usize),
    Symbol(String),
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEntry::State(s) => write!(f, "{}", s),
            StackEntry::Symbol(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LRStep {
    Shift { symbol: String, state: usize },
    Reduce { rule: ReduceRule, state: usize },
    Accept,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// No `Action[state][lookahead]` entry.
    NoAction { state: usize, lookahead: String },
    /// No `Goto[state][non_terminal]` entry after a reduce.
    NoGoto { state: usize, non_terminal: String },
    /// A reduce needed more stack cells than there were.
    StackUnderflow { rule: ReduceRule },
    /// The input itself contained the end marker.
    EndMarkInInput,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoAction { state, lookahead } => {
                write!(f, "no action for state {} on `{}`", state, lookahead)
            }
            RejectReason::NoGoto {
                state,
                non_terminal,
            } => write!(f, "no goto for state {} on `{}`", state, non_terminal),
            RejectReason::StackUnderflow { rule } => {
                write!(f, "stack too short to reduce by {}", rule)
            }
            RejectReason::EndMarkInInput => {
                write!(f, "`{}` is reserved for the end of input", END_MARK)
            }
        }
    }
}

/// Automaton state at the point the parse stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseRejection {
    pub reason: RejectReason,
    /// Bottom to top.
    pub stack: Vec<StackEntry>,
    /// Unconsumed input, end marker included.
    pub remaining: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LRParseReport {
    pub steps: Vec<LRStep>,
    pub rejection: Option<ParseRejection>,
}

impl LRParseReport {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// One run of the shift-reduce automaton over a fixed input.
///
/// The table is only read; each parser owns its stack and input.
#[derive(Debug, Clone)]
pub struct LRParser<'t> {
    table: &'t LRParsingTable,
    stack: Vec<StackEntry>,
    input: VecDeque<String>,
    accepted: bool,
}

impl<'t> LRParser<'t> {
    /// `tokens` must not include the end marker; it is appended here. An end
    /// marker in `tokens` makes the parse fail once it reaches the lookahead.
    pub fn new<I, S>(table: &'t LRParsingTable, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input: VecDeque<String> = tokens.into_iter().map(Into::into).collect();
        input.push_back(END_MARK.to_string());
        Self {
            table,
            stack: vec![StackEntry::State(0)],
            input,
            accepted: false,
        }
    }

    pub fn stack(&self) -> &[StackEntry] {
        &self.stack
    }

    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.input.iter().map(String::as_str)
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    fn current_state(&self) -> usize {
        match self.stack.last() {
            Some(StackEntry::State(s)) => *s,
            _ => unreachable!("the parser stack always ends with a state"),
        }
    }

    /// Applies one action. On a reduce the input is left untouched.
    ///
    /// After an error the stack and input are those from right before the
    /// failing lookup, except that a failed goto leaves the reduced cells
    /// popped.
    pub fn step(&mut self) -> Result<LRStep, RejectReason> {
        if self.accepted {
            return Ok(LRStep::Accept);
        }

        let table = self.table;
        let state = self.current_state();
        let lookahead = self.input.front().map(String::as_str).unwrap_or(END_MARK);
        if lookahead == END_MARK && self.input.len() > 1 {
            return Err(RejectReason::EndMarkInInput);
        }
        let action = table
            .action(state, lookahead)
            .ok_or_else(|| RejectReason::NoAction {
                state,
                lookahead: lookahead.to_string(),
            })?;

        match action {
            LRParsingTableAction::Accept => {
                tracing::debug!("accept");
                self.accepted = true;
                Ok(LRStep::Accept)
            }
            LRParsingTableAction::Shift(next) => {
                let symbol = self.input.pop_front().unwrap_or_else(|| END_MARK.to_string());
                tracing::debug!("shift `{}`, goto {}", symbol, next);
                self.stack.push(StackEntry::Symbol(symbol.clone()));
                self.stack.push(StackEntry::State(*next));
                Ok(LRStep::Shift {
                    symbol,
                    state: *next,
                })
            }
            LRParsingTableAction::Reduce(rule) => {
                let n = 2 * rule.right.len();
                if self.stack.len() <= n {
                    return Err(RejectReason::StackUnderflow { rule: rule.clone() });
                }
                self.stack.truncate(self.stack.len() - n);

                let exposed = self.current_state();
                let next = table.goto(exposed, &rule.left).ok_or_else(|| {
                    RejectReason::NoGoto {
                        state: exposed,
                        non_terminal: rule.left.clone(),
                    }
                })?;
                tracing::debug!("reduce by {}, goto {}", rule, next);
                self.stack.push(StackEntry::Symbol(rule.left.clone()));
                self.stack.push(StackEntry::State(next));
                Ok(LRStep::Reduce {
                    rule: rule.clone(),
                    state: next,
                })
            }
        }
    }

    /// Steps until accept or the first missing table entry.
    #[tracing::instrument(skip_all)]
    pub fn run(mut self) -> LRParseReport {
        let mut steps = Vec::new();
        loop {
            match self.step() {
                Ok(LRStep::Accept) => {
                    steps.push(LRStep::Accept);
                    return LRParseReport {
                        steps,
                        rejection: None,
                    };
                }
                Ok(step) => steps.push(step),
                Err(reason) => {
                    tracing::debug!("reject: {}", reason);
                    return LRParseReport {
                        steps,
                        rejection: Some(ParseRejection {
                            reason,
                            stack: self.stack,
                            remaining: self.input.into_iter().collect(),
                        }),
                    };
                }
            }
        }
    }
}

impl LRParsingTable {
    /// Parses `tokens` (without end marker) to acceptance or the first error.
    pub fn parse<I, S>(&self, tokens: I) -> LRParseReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LRParser::new(self, tokens).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::lr_table::LRParsingTableAction::{Accept, Shift};

    fn s(n: usize) -> StackEntry {
        StackEntry::State(n)
    }

    fn sym(name: &str) -> StackEntry {
        StackEntry::Symbol(name.to_string())
    }

    /// The hand-written tables for `S -> A A`, `A -> a`.
    fn handwritten_table() -> LRParsingTable {
        LRParsingTable::new()
            .with_action(0, "a", Shift(1))
            .with_action(1, "a", Shift(2))
            .with_action(2, "$", Accept)
            .with_goto(0, "A", 2)
            .with_goto(2, "A", 1)
    }

    /// The canonical LR(0) tables for `S -> A A`, `A -> a`.
    fn canonical_table() -> LRParsingTable {
        let reduce_a = LRParsingTableAction::reduce("A", ["a"]);
        LRParsingTable::new()
            .with_action(0, "a", Shift(3))
            .with_action(1, "$", Accept)
            .with_action(2, "a", Shift(3))
            .with_action(3, "a", reduce_a.clone())
            .with_action(3, "$", reduce_a)
            .with_action(4, "$", LRParsingTableAction::reduce("S", ["A", "A"]))
            .with_goto(0, "S", 1)
            .with_goto(0, "A", 2)
            .with_goto(2, "A", 4)
    }

    #[test]
    fn handwritten_table_accepts_aa() {
        let report = handwritten_table().parse(["a", "a"]);
        assert!(report.accepted());
        assert_eq!(
            report.steps,
            vec![
                LRStep::Shift {
                    symbol: "a".to_string(),
                    state: 1
                },
                LRStep::Shift {
                    symbol: "a".to_string(),
                    state: 2
                },
                LRStep::Accept,
            ]
        );
    }

    #[test]
    fn handwritten_table_rejects_ab() {
        let table = handwritten_table();
        let report = table.parse(["a", "b"]);
        let rejection = report.rejection.unwrap();
        assert_eq!(
            rejection.reason,
            RejectReason::NoAction {
                state: 1,
                lookahead: "b".to_string()
            }
        );
        assert_eq!(rejection.stack, vec![s(0), sym("a"), s(1)]);
        assert_eq!(rejection.remaining, vec!["b", "$"]);
        assert_eq!(report.steps.len(), 1);
    }

    #[test]
    fn end_mark_in_input_is_rejected() {
        let report = handwritten_table().parse(["a", "a", "$", "junk"]);
        assert_eq!(report.steps.len(), 2);
        let rejection = report.rejection.unwrap();
        assert_eq!(rejection.reason, RejectReason::EndMarkInInput);
        assert_eq!(rejection.stack, vec![s(0), sym("a"), s(1), sym("a"), s(2)]);
        assert_eq!(rejection.remaining, vec!["$", "junk", "$"]);

        let report = handwritten_table().parse(["a", "a", "$"]);
        assert!(!report.accepted());
    }

    #[test]
    fn canonical_table_reduces() {
        let table = canonical_table();
        let mut parser = LRParser::new(&table, ["a", "a"]);

        let mut shifts = 0;
        let mut reduces = Vec::new();
        loop {
            match parser.step().unwrap() {
                LRStep::Shift { .. } => shifts += 1,
                LRStep::Reduce { rule, .. } => reduces.push(rule.to_string()),
                LRStep::Accept => break,
            }
        }
        assert_eq!(shifts, 2);
        assert_eq!(reduces, vec!["A -> a", "A -> a", "S -> A A"]);
        assert_eq!(parser.stack(), &[s(0), sym("S"), s(1)]);
        assert_eq!(parser.remaining().collect::<Vec<_>>(), vec!["$"]);
        assert!(parser.is_accepted());
    }

    #[test]
    fn reduce_does_not_consume_input() {
        let table = canonical_table();
        let mut parser = LRParser::new(&table, ["a", "a"]);
        parser.step().unwrap();
        assert_eq!(parser.remaining().count(), 2);
        assert!(matches!(parser.step().unwrap(), LRStep::Reduce { state: 2, .. }));
        assert_eq!(parser.remaining().count(), 2);
        assert_eq!(parser.stack(), &[s(0), sym("A"), s(2)]);
    }

    #[test]
    fn canonical_table_rejects() {
        let table = canonical_table();

        let report = table.parse(["a"]);
        let rejection = report.rejection.unwrap();
        assert_eq!(
            rejection.reason,
            RejectReason::NoAction {
                state: 2,
                lookahead: "$".to_string()
            }
        );
        assert_eq!(rejection.stack, vec![s(0), sym("A"), s(2)]);

        let report = table.parse(["a", "a", "a"]);
        assert!(!report.accepted());

        let report = table.parse(Vec::<String>::new());
        assert_eq!(report.rejection.unwrap().remaining, vec!["$"]);
    }

    #[test]
    fn missing_goto_and_underflow() {
        let table = LRParsingTable::new()
            .with_action(0, "a", Shift(1))
            .with_action(1, "$", LRParsingTableAction::reduce("A", ["a"]));
        let rejection = table.parse(["a"]).rejection.unwrap();
        assert_eq!(
            rejection.reason,
            RejectReason::NoGoto {
                state: 0,
                non_terminal: "A".to_string()
            }
        );
        assert_eq!(rejection.stack, vec![s(0)]);

        let table = LRParsingTable::new()
            .with_action(0, "$", LRParsingTableAction::reduce("S", ["x", "y"]));
        let rejection = table.parse(Vec::<String>::new()).rejection.unwrap();
        assert!(matches!(rejection.reason, RejectReason::StackUnderflow { .. }));
        assert_eq!(rejection.stack, vec![s(0)]);
    }

    #[test]
    fn epsilon_reduce_pops_nothing() {
        // S -> A b, A -> ε
        let table = LRParsingTable::new()
            .with_action(0, "b", LRParsingTableAction::reduce("A", ["ε"]))
            .with_action(2, "b", Shift(3))
            .with_action(3, "$", LRParsingTableAction::reduce("S", ["A", "b"]))
            .with_action(1, "$", Accept)
            .with_goto(0, "A", 2)
            .with_goto(0, "S", 1);
        let report = table.parse(["b"]);
        assert!(report.accepted());
        assert_eq!(report.steps.len(), 4);
    }
}
