use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
};

use serde::Serialize;

use super::{
    first_follow::Analysis,
    grammar::{NonTerminal, END_MARK_INDEX, EPSILON_INDEX},
    Grammar, GrammarError, END_MARK,
};

/// Two distinct alternatives of one non-terminal competing for a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1Conflict {
    pub non_terminal: String,
    pub terminal: String,
    /// The alternative that was placed first and stays in the table.
    pub existing: Vec<String>,
    pub conflicting: Vec<String>,
}

impl fmt::Display for LL1Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M[{}, {}] holds both {} -> {} and {} -> {}",
            self.non_terminal,
            self.terminal,
            self.non_terminal,
            self.existing.join(" "),
            self.non_terminal,
            self.conflicting.join(" ")
        )
    }
}

/// Predictive parsing table: `(non-terminal, terminal)` → alternative.
///
/// Cells store the index of the chosen alternative within
/// [`NonTerminal::productions`](super::grammar::NonTerminal). An absent cell
/// means there is no valid expansion.
#[derive(Debug, Clone)]
pub struct LL1ParsingTable<'g> {
    grammar: &'g Grammar,
    terminals: Vec<usize>,
    cells: HashMap<(usize, usize), usize>,
    conflicts: usize,
}

impl<'g> Analysis<'g> {
    /// Builds the table, keeping the first alternative placed in each cell and
    /// returning every collision next to it.
    #[tracing::instrument(skip_all)]
    pub fn generate_ll1_parsing_table(&self) -> (LL1ParsingTable<'g>, Vec<LL1Conflict>) {
        let grammar = self.grammar();
        let mut cells: HashMap<(usize, usize), usize> = HashMap::new();
        let mut conflicts: Vec<LL1Conflict> = Vec::new();

        let mut place = |nt: &NonTerminal, terminal: usize, alternative: usize| match cells
            .entry((nt.index, terminal))
        {
            Entry::Vacant(e) => {
                e.insert(alternative);
            }
            Entry::Occupied(e) if *e.get() != alternative => {
                let conflict = LL1Conflict {
                    non_terminal: nt.name.clone(),
                    terminal: grammar.get_symbol_name(terminal).to_string(),
                    existing: to_strings(grammar, &nt.productions[*e.get()]),
                    conflicting: to_strings(grammar, &nt.productions[alternative]),
                };
                tracing::warn!("LL(1) conflict: {}", conflict);
                conflicts.push(conflict);
            }
            Entry::Occupied(_) => {}
        };

        for nt in grammar.non_terminal_iter() {
            for (alternative, production) in nt.productions.iter().enumerate() {
                let first = self.first().of_sequence(production);

                let mut lookaheads: Vec<usize> = first
                    .iter()
                    .copied()
                    .filter(|&t| t != EPSILON_INDEX)
                    .collect();
                if first.contains(&EPSILON_INDEX) {
                    lookaheads.extend(self.follow().get(nt.index).iter().copied());
                }
                // Placement order decides which alternative survives a conflict.
                lookaheads.sort_unstable();

                for t in lookaheads {
                    place(nt, t, alternative);
                }
            }
        }

        let terminals = grammar
            .terminal_iter()
            .map(|(i, _)| i)
            .chain(std::iter::once(END_MARK_INDEX))
            .collect();

        (
            LL1ParsingTable {
                grammar,
                terminals,
                cells,
                conflicts: conflicts.len(),
            },
            conflicts,
        )
    }

    /// Builds the table, failing with [`GrammarError::NotLL1`] on any conflict.
    pub fn ll1_table(&self) -> Result<LL1ParsingTable<'g>, GrammarError> {
        let (table, conflicts) = self.generate_ll1_parsing_table();
        if conflicts.is_empty() {
            Ok(table)
        } else {
            Err(GrammarError::NotLL1(conflicts))
        }
    }
}

fn to_strings(grammar: &Grammar, production: &[usize]) -> Vec<String> {
    grammar
        .production_to_vec_str(production)
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl<'g> LL1ParsingTable<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Column order: terminals by first appearance, then `$`.
    pub fn terminals(&self) -> &[usize] {
        &self.terminals
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether any cell had more than one candidate alternative.
    pub fn has_conflicts(&self) -> bool {
        self.conflicts > 0
    }

    /// The right-hand side chosen for `(non_terminal, terminal)`.
    pub fn get(&self, non_terminal: usize, terminal: usize) -> Option<&'g [usize]> {
        let grammar = self.grammar;
        let alternative = *self.cells.get(&(non_terminal, terminal))?;
        grammar
            .non_terminal(non_terminal)
            .map(|nt| nt.productions[alternative].as_slice())
    }

    pub fn get_by_name(&self, non_terminal: &str, terminal: &str) -> Option<Vec<&'g str>> {
        let grammar = self.grammar;
        let production = self.get(
            grammar.get_symbol_index(non_terminal)?,
            grammar.get_symbol_index(terminal)?,
        )?;
        Some(grammar.production_to_vec_str(production))
    }

    /// Runs a table-driven top-down parse over `tokens`. The end marker is
    /// appended here and must not occur in `tokens`.
    ///
    /// A table with conflicts is refused up front: a left-recursive or cyclic
    /// grammar would otherwise expand forever without consuming input.
    #[tracing::instrument(skip_all)]
    pub fn parse<I, S>(&self, tokens: I) -> LL1ParseReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let grammar = self.grammar;
        let mut input: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        input.push(END_MARK.to_string());

        let mut stack: Vec<usize> = vec![END_MARK_INDEX, grammar.start_symbol()];
        let mut derivation: Vec<LL1Step> = Vec::new();
        let mut position = 0;

        let reject = |reason: LL1RejectReason, stack: &[usize], position: usize| LL1Rejection {
            reason,
            stack: stack
                .iter()
                .map(|&s| grammar.get_symbol_name(s).to_string())
                .collect(),
            remaining: input[position..].to_vec(),
        };

        if self.has_conflicts() {
            let reason = LL1RejectReason::NotLL1 {
                conflicts: self.conflicts,
            };
            return LL1ParseReport {
                derivation,
                rejection: Some(reject(reason, &stack, position)),
            };
        }

        while let Some(&top) = stack.last() {
            let name = input[position].as_str();
            if name == END_MARK && position + 1 < input.len() {
                return LL1ParseReport {
                    derivation,
                    rejection: Some(reject(LL1RejectReason::EndMarkInInput, &stack, position)),
                };
            }
            let lookahead = grammar
                .get_symbol_index(name)
                .filter(|&i| grammar.is_terminal(i));

            if grammar.is_terminal(top) {
                if Some(top) != lookahead {
                    let reason = LL1RejectReason::Mismatch {
                        expected: grammar.get_symbol_name(top).to_string(),
                        found: name.to_string(),
                    };
                    return LL1ParseReport {
                        derivation,
                        rejection: Some(reject(reason, &stack, position)),
                    };
                }
                tracing::debug!("match {}", name);
                stack.pop();
                if top == END_MARK_INDEX {
                    break;
                }
                position += 1;
                continue;
            }

            match lookahead.and_then(|t| self.get(top, t)) {
                Some(production) => {
                    tracing::debug!(
                        "expand {} -> {}",
                        grammar.get_symbol_name(top),
                        grammar.production_to_vec_str(production).join(" ")
                    );
                    derivation.push(LL1Step {
                        left: grammar.get_symbol_name(top).to_string(),
                        right: to_strings(grammar, production),
                    });
                    stack.pop();
                    stack.extend(production.iter().rev());
                }
                None => {
                    let reason = LL1RejectReason::NoEntry {
                        non_terminal: grammar.get_symbol_name(top).to_string(),
                        lookahead: name.to_string(),
                    };
                    return LL1ParseReport {
                        derivation,
                        rejection: Some(reject(reason, &stack, position)),
                    };
                }
            }
        }

        LL1ParseReport {
            derivation,
            rejection: None,
        }
    }
}

/// One expansion applied by the predictive parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1Step {
    pub left: String,
    pub right: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LL1RejectReason {
    NoEntry {
        non_terminal: String,
        lookahead: String,
    },
    Mismatch {
        expected: String,
        found: String,
    },
    /// The table was built with conflicts.
    NotLL1 { conflicts: usize },
    EndMarkInInput,
}

/// Parser state at the point the parse stopped. The stack is listed bottom to
/// top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1Rejection {
    pub reason: LL1RejectReason,
    pub stack: Vec<String>,
    pub remaining: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1ParseReport {
    /// Leftmost derivation, in order.
    pub derivation: Vec<LL1Step>,
    pub rejection: Option<LL1Rejection>,
}

impl LL1ParseReport {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}
