use std::collections::HashSet;

use crowbook_text_processing::escape;
use serde::Serialize;

use super::{
    first_follow::Analysis,
    grammar::EPSILON_INDEX,
    ll1_parsing_table::{LL1Conflict, LL1ParseReport, LL1RejectReason},
    lr_parse::{LRParseReport, LRStep, StackEntry},
    lr_table::{LRParsingTable, LRParsingTableAction},
    Grammar, LL1ParsingTable, END_MARK, EPSILON,
};

fn align_columns(output: &[Vec<String>]) -> String {
    let columns = output.first().map(|row| row.len()).unwrap_or(0);
    let width: Vec<usize> = (0..columns)
        .map(|j| {
            output
                .iter()
                .map(|row| row[j].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    output
        .iter()
        .map(|line| {
            line.iter()
                .enumerate()
                .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn symbols_to_latex(symbols: &[&str], terminal_set: &HashSet<&str>) -> String {
    symbols
        .iter()
        .map(|s| {
            if *s == EPSILON {
                "\\epsilon".to_string()
            } else if terminal_set.contains(s) {
                format!("\\text{{{}}}", escape::tex(*s))
            } else {
                escape::tex(*s).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" \\ ")
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    pub rights: Vec<Vec<&'a str>>,
}

impl ProductionOutput<'_> {
    pub fn to_plaintext(&self, left_width: usize, multiline: bool) -> String {
        self.rights
            .iter()
            .map(|right| right.join(" "))
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else if multiline {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                } else {
                    format!(" | {}", right)
                }
            })
            .collect::<Vec<_>>()
            .join(if multiline { "\n" } else { "" })
    }

    pub fn to_latex(&self, and_sign: bool, terminal_set: &HashSet<&str>) -> String {
        if self.rights.is_empty() {
            return String::new();
        }

        let left = if and_sign {
            format!("{} & \\rightarrow &", escape::tex(self.left))
        } else {
            format!("{} \\rightarrow ", escape::tex(self.left))
        };
        let right = self
            .rights
            .iter()
            .map(|right| symbols_to_latex(right, terminal_set))
            .collect::<Vec<_>>()
            .join(" \\mid ");

        left + &right
    }
}

#[derive(Debug, Serialize)]
pub struct ProductionOutputVec<'a> {
    productions: Vec<ProductionOutput<'a>>,
    #[serde(skip)]
    terminals: HashSet<&'a str>,
}

impl ProductionOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len, true))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(
                self.productions
                    .iter()
                    .map(|s| s.to_latex(true, &self.terminals)),
            )
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    pub fn to_production_output_vec(&self) -> ProductionOutputVec<'_> {
        let productions = self
            .non_terminal_iter()
            .map(|nt| ProductionOutput {
                left: nt.name.as_str(),
                rights: nt
                    .productions
                    .iter()
                    .map(|p| self.production_to_vec_str(p))
                    .collect(),
            })
            .collect();
        ProductionOutputVec {
            productions,
            terminals: self.terminal_iter().map(|(_, t)| t).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FirstFollowOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl FirstFollowOutput<'_> {
    fn to_plaintext(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            self.first.join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        fn f(a: &[&str]) -> String {
            a.iter()
                .map(|s| escape::tex(*s))
                .collect::<Vec<_>>()
                .join(r"\ ")
                .replace(EPSILON, r"$\epsilon$")
        }

        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            f(&self.first),
            f(&self.follow)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct FirstFollowOutputVec<'a> {
    data: Vec<FirstFollowOutput<'a>>,
}

impl FirstFollowOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n ");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl<'g> Analysis<'g> {
    /// One row per non-terminal; ε is listed last in FIRST when nullable.
    pub fn to_first_follow_output_vec(&self) -> FirstFollowOutputVec<'g> {
        let grammar = self.grammar();
        let data = grammar
            .non_terminal_iter()
            .map(|nt| {
                let mut first: Vec<&str> = self
                    .first()
                    .get(nt.index)
                    .iter()
                    .filter(|&&i| i != EPSILON_INDEX)
                    .map(|&i| grammar.get_symbol_name(i))
                    .collect();
                let mut follow: Vec<&str> = self
                    .follow()
                    .get(nt.index)
                    .iter()
                    .map(|&i| grammar.get_symbol_name(i))
                    .collect();
                first.sort_unstable();
                follow.sort_unstable();

                let nullable = self.first().is_nullable(nt.index);
                if nullable {
                    first.push(EPSILON);
                }
                FirstFollowOutput {
                    name: nt.name.as_str(),
                    nullable,
                    first,
                    follow,
                }
            })
            .collect();
        FirstFollowOutputVec { data }
    }
}

#[derive(Debug, Serialize)]
pub struct LL1ParsingTableOutput<'a> {
    terminals: Vec<&'a str>,
    rows: Vec<(&'a str, Vec<ProductionOutput<'a>>)>,
    conflicts: Vec<LL1Conflict>,
}

impl<'g> LL1ParsingTable<'g> {
    /// Render form of the table. Conflicting alternatives are shown next to the
    /// one kept in the cell.
    pub fn to_output(&self, conflicts: &[LL1Conflict]) -> LL1ParsingTableOutput<'g> {
        let grammar = self.grammar();
        let terminals: Vec<&str> = self
            .terminals()
            .iter()
            .map(|&t| grammar.get_symbol_name(t))
            .collect();

        let rows = grammar
            .non_terminal_iter()
            .map(|nt| {
                let left = nt.name.as_str();
                let row = self
                    .terminals()
                    .iter()
                    .zip(terminals.iter())
                    .map(|(&t, &t_name)| {
                        let mut rights: Vec<Vec<&str>> = self
                            .get(nt.index, t)
                            .map(|p| grammar.production_to_vec_str(p))
                            .into_iter()
                            .collect();
                        for c in conflicts
                            .iter()
                            .filter(|c| c.non_terminal == left && c.terminal == t_name)
                        {
                            let conflicting = nt
                                .productions
                                .iter()
                                .map(|p| grammar.production_to_vec_str(p))
                                .find(|p| *p == c.conflicting);
                            rights.extend(conflicting);
                        }
                        ProductionOutput { left, rights }
                    })
                    .collect();
                (left, row)
            })
            .collect();

        LL1ParsingTableOutput {
            terminals,
            rows,
            conflicts: conflicts.to_vec(),
        }
    }
}

impl LL1ParsingTableOutput<'_> {
    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.terminals.iter().map(|&t| t.to_string()));
        let mut output: Vec<Vec<String>> = vec![header];
        for (left, row) in &self.rows {
            let mut line: Vec<String> = vec![left.to_string()];
            line.extend(
                row.iter()
                    .map(|productions| productions.to_plaintext(left.chars().count(), false)),
            );
            output.push(line);
        }

        let mut table = align_columns(&output);
        for c in &self.conflicts {
            table.push_str(&format!("\n[warning] {}", c));
        }
        table
    }

    pub fn to_latex(&self) -> String {
        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.terminals.len()),
        )];
        header.extend(
            self.terminals
                .iter()
                .map(|&t| format!("\\text{{{}}}", escape::tex(t))),
        );
        let header = header.join(" & ");

        let terminal_set: HashSet<&str> = self.terminals.iter().cloned().collect();
        let output = self
            .rows
            .iter()
            .map(|(left, row)| {
                let mut line: Vec<String> = vec![escape::tex(*left).to_string()];
                line.extend(row.iter().map(|productions| {
                    let cell = productions.to_latex(false, &terminal_set);
                    if productions.rights.len() > 1 {
                        format!("{{\\color{{red}}{}}}", cell)
                    } else {
                        cell
                    }
                }));
                line.join(" & ")
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }
}

impl LRParsingTableAction {
    pub fn to_plaintext(&self) -> String {
        match self {
            LRParsingTableAction::Reduce(r) => format!("r({})", r),
            LRParsingTableAction::Shift(s) => format!("s{}", s),
            LRParsingTableAction::Accept => "acc".to_string(),
        }
    }

    pub fn to_latex(&self, terminal_set: &HashSet<&str>) -> String {
        match self {
            LRParsingTableAction::Reduce(r) => {
                let right: Vec<&str> = if r.right.is_empty() {
                    vec![EPSILON]
                } else {
                    r.right.iter().map(String::as_str).collect()
                };
                format!(
                    "reduce ${} \\rightarrow {}$",
                    escape::tex(&r.left),
                    symbols_to_latex(&right, terminal_set)
                )
            }
            LRParsingTableAction::Shift(s) => format!("shift {}", s),
            LRParsingTableAction::Accept => "accept".to_string(),
        }
    }
}

impl LRParsingTable {
    pub fn to_plaintext(&self) -> String {
        let (terminals, non_terminals) = self.columns();

        let mut output: Vec<Vec<String>> = Vec::new();
        output.push(
            std::iter::once(String::new())
                .chain(terminals.iter().chain(non_terminals.iter()).map(|s| s.to_string()))
                .collect(),
        );

        for state in self.states() {
            let row: Vec<String> = std::iter::once(state.to_string())
                .chain(terminals.iter().map(|t| {
                    self.action(state, t)
                        .map(|action| action.to_plaintext())
                        .unwrap_or_default()
                }))
                .chain(non_terminals.iter().map(|nt| {
                    self.goto(state, nt)
                        .map(|goto| goto.to_string())
                        .unwrap_or_default()
                }))
                .collect();
            output.push(row);
        }

        align_columns(&output)
    }

    pub fn to_latex(&self) -> String {
        let (terminals, non_terminals) = self.columns();
        let mut groups: Vec<String> = vec![String::new()];
        if !terminals.is_empty() {
            groups.push(format!("\\multicolumn{{{}}}{{c}}{{action}}", terminals.len()));
        }
        if !non_terminals.is_empty() {
            groups.push(format!(
                "\\multicolumn{{{}}}{{|c}}{{goto}}",
                non_terminals.len()
            ));
        }
        let header = format!(
            "\\begin{{tabular}}{{c{}}}\n{}\\\\",
            "|l".repeat(terminals.len() + non_terminals.len()),
            groups.join(" & "),
        );

        let first_row = std::iter::once(String::new())
            .chain(
                terminals
                    .iter()
                    .chain(non_terminals.iter())
                    .map(|s| escape::tex(*s).to_string()),
            )
            .collect::<Vec<_>>()
            .join(" & ");

        let terminal_set: HashSet<&str> = terminals.iter().cloned().collect();

        let content = self
            .states()
            .into_iter()
            .map(|state| {
                std::iter::once(state.to_string())
                    .chain(terminals.iter().map(|t| {
                        self.action(state, t)
                            .map(|action| action.to_latex(&terminal_set))
                            .unwrap_or_default()
                    }))
                    .chain(non_terminals.iter().map(|nt| {
                        self.goto(state, nt)
                            .map(|goto| goto.to_string())
                            .unwrap_or_default()
                    }))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join(" \\\\\n");

        format!(
            "{}\n{} \\\\\\hline\n{}\n\\end{{tabular}}",
            header, first_row, content
        )
    }
}

fn join_stack(stack: &[StackEntry]) -> String {
    stack
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl LRStep {
    pub fn to_plaintext(&self) -> String {
        match self {
            LRStep::Shift { symbol, state } => format!("shift {}, goto {}", symbol, state),
            LRStep::Reduce { rule, state } => format!("reduce by {}, goto {}", rule, state),
            LRStep::Accept => "accept".to_string(),
        }
    }
}

impl LRParseReport {
    pub fn to_plaintext(&self) -> String {
        let mut lines: Vec<String> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{:>3}: {}", i + 1, step.to_plaintext()))
            .collect();
        match &self.rejection {
            None => lines.push("Input accepted".to_string()),
            Some(r) => {
                lines.push(format!("Input rejected: {}", r.reason));
                lines.push(format!("stack: {}", join_stack(&r.stack)));
                lines.push(format!("input: {}", r.remaining.join(" ")));
            }
        }
        lines.join("\n")
    }
}

impl LL1ParseReport {
    pub fn to_plaintext(&self) -> String {
        let mut lines: Vec<String> = self
            .derivation
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{:>3}: {} -> {}", i + 1, step.left, step.right.join(" ")))
            .collect();
        match &self.rejection {
            None => lines.push("Input accepted".to_string()),
            Some(r) => {
                lines.push(match &r.reason {
                    LL1RejectReason::NoEntry {
                        non_terminal,
                        lookahead,
                    } => format!("Input rejected: no entry M[{}, {}]", non_terminal, lookahead),
                    LL1RejectReason::Mismatch { expected, found } => {
                        format!("Input rejected: expected `{}`, found `{}`", expected, found)
                    }
                    LL1RejectReason::NotLL1 { conflicts } => {
                        format!("Input rejected: table has {} conflict(s)", conflicts)
                    }
                    LL1RejectReason::EndMarkInInput => {
                        format!("Input rejected: `{}` is reserved for the end of input", END_MARK)
                    }
                });
                lines.push(format!("stack: {}", r.stack.join(" ")));
                lines.push(format!("input: {}", r.remaining.join(" ")));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{AnalysisConfig, Grammar, LRParsingTable, LRParsingTableAction};

    #[test]
    fn productions_plaintext() {
        let g = Grammar::parse("S -> A B\nAA -> a AA | ε").unwrap();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            " S -> A B\nAA -> a AA\n    | ε"
        );
    }

    #[test]
    fn first_follow_plaintext() {
        let g = Grammar::parse("S -> A B\nA -> a A | ε\nB -> b B | ε").unwrap();
        let analysis = g.analyze(&AnalysisConfig::default()).unwrap();
        assert_eq!(
            analysis.to_first_follow_output_vec().to_plaintext(),
            "S | true | a, b, ε | $\nA | true | a, ε | $, b\nB | true | b, ε | $"
        );
    }

    #[test]
    fn first_follow_json() {
        let g = Grammar::parse("S -> a").unwrap();
        let analysis = g.analyze(&AnalysisConfig::default()).unwrap();
        assert_eq!(
            analysis.to_first_follow_output_vec().to_json(),
            r#"{"data":[{"name":"S","nullable":false,"first":["a"],"follow":["$"]}]}"#
        );
    }

    #[test]
    fn ll1_table_shows_conflicts() {
        let g = Grammar::parse("S -> a b | a c").unwrap();
        let analysis = g.analyze(&AnalysisConfig::default()).unwrap();
        let (table, conflicts) = analysis.generate_ll1_parsing_table();
        let text = table.to_output(&conflicts).to_plaintext();
        assert!(text.contains("S -> a b | a c"));
        assert!(text.contains("[warning] M[S, a]"));
    }

    #[test]
    fn lr_table_plaintext() {
        let table = LRParsingTable::new()
            .with_action(0, "a", LRParsingTableAction::Shift(1))
            .with_action(1, "$", LRParsingTableAction::reduce("A", ["a"]))
            .with_goto(0, "A", 2);
        assert_eq!(
            table.to_plaintext(),
            "  |  a |         $ | A\n0 | s1 |           | 2\n1 |    | r(A -> a) |  "
        );
    }

    #[test]
    fn lr_table_latex_without_goto() {
        let table = LRParsingTable::new()
            .with_action(0, "a", LRParsingTableAction::Shift(1))
            .with_action(1, "$", LRParsingTableAction::Accept);
        let latex = table.to_latex();
        assert!(latex.starts_with(
            "\\begin{tabular}{c|l|l}\n & \\multicolumn{2}{c}{action}\\\\\n"
        ));
        assert!(!latex.contains("goto"));
        assert!(!latex.contains("\\multicolumn{0}"));

        let table = table.with_goto(0, "S", 1);
        assert!(table
            .to_latex()
            .contains(" & \\multicolumn{2}{c}{action} & \\multicolumn{1}{|c}{goto}\\\\"));
    }

    #[test]
    fn lr_report_plaintext() {
        let table = LRParsingTable::new().with_action(0, "a", LRParsingTableAction::Shift(1));
        assert_eq!(
            table.parse(["a"]).to_plaintext(),
            "  1: shift a, goto 1\nInput rejected: no action for state 1 on `$`\nstack: 0 a 1\ninput: $"
        );
    }
}
