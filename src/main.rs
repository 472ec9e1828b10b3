use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use grammar_course_helper::{AnalysisConfig, Grammar, GrammarError, LRParsingTable};
use serde::Serialize;
use std::{fs, io, path::Path, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Eliminate left recursion before printing anything
    Elf,
    /// Productions
    Prod,
    /// FIRST and FOLLOW sets
    Ff,
    /// LL(1) parsing table
    Ll1,
    /// Predictive parse of --input with the LL(1) table
    Ll1parse,
    /// LR action/goto table from --tables
    Lrtable,
    /// Shift-reduce parse of --input with --tables
    Lrparse,
}

impl Output {
    fn needs_grammar(self) -> bool {
        matches!(
            self,
            Output::Elf | Output::Prod | Output::Ff | Output::Ll1 | Output::Ll1parse
        )
    }

    fn needs_tables(self) -> bool {
        matches!(self, Output::Lrtable | Output::Lrparse)
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Plain,
    LaTeX,
    Json,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Actions and outputs, printed in order.
    #[arg(value_enum, required = true)]
    outputs: Vec<Output>,

    /// Print in LaTeX format.
    #[arg(short = 'l', long, conflicts_with = "json")]
    latex: bool,

    /// Print in JSON format.
    #[arg(short = 'j', long)]
    json: bool,

    /// Grammar file, JSON when it ends in `.json`. Read from stdin when omitted.
    #[arg(short = 'g', long)]
    grammar: Option<PathBuf>,

    /// LR action/goto tables (JSON).
    #[arg(short = 't', long)]
    tables: Option<PathBuf>,

    /// Input terminals, separated by whitespace.
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Treat every character of --input as one terminal.
    #[arg(long)]
    chars: bool,

    /// Maximum fixed-point passes for FIRST and FOLLOW.
    #[arg(long, default_value_t = AnalysisConfig::default().max_iterations)]
    max_iterations: usize,
}

fn load_grammar(path: Option<&Path>) -> anyhow::Result<Grammar> {
    let grammar = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read grammar file {}", path.display()))?;
            if path.extension().is_some_and(|ext| ext == "json") {
                Grammar::from_json(&text)?
            } else {
                Grammar::parse(&text)?
            }
        }
        None => {
            let text = io::read_to_string(io::stdin()).context("failed to read stdin")?;
            Grammar::parse(&text)?
        }
    };
    Ok(grammar)
}

/// Applies `elf`. Without it, immediate left recursion is only reported.
fn prepare_grammar(g: Grammar, eliminate: bool) -> Result<Grammar, GrammarError> {
    if eliminate {
        return g.eliminate_left_recursion();
    }
    for r in g.detect_left_recursion() {
        tracing::warn!(
            "left recursion in {} -> {}",
            r.non_terminal,
            r.production.join(" ")
        );
    }
    Ok(g)
}

fn tokenize(input: &str, chars: bool) -> Vec<String> {
    if chars {
        input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect()
    } else {
        input.split_whitespace().map(str::to_string).collect()
    }
}

fn render<T: Serialize>(
    format: OutputFormat,
    t: &T,
    plain: impl Fn(&T) -> String,
    latex: impl Fn(&T) -> String,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Plain => plain(t),
        OutputFormat::LaTeX => latex(t),
        OutputFormat::Json => serde_json::to_string(t)?,
    })
}

fn verbatim(text: String) -> String {
    format!("\\begin{{verbatim}}\n{}\n\\end{{verbatim}}", text)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let format = if args.latex {
        OutputFormat::LaTeX
    } else if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };
    let config = AnalysisConfig {
        max_iterations: args.max_iterations,
    };

    let grammar = if args.outputs.iter().any(|o| o.needs_grammar()) {
        let g = load_grammar(args.grammar.as_deref())?;
        Some(prepare_grammar(g, args.outputs.contains(&Output::Elf))?)
    } else {
        None
    };
    let analysis = grammar.as_ref().map(|g| g.analyze(&config)).transpose()?;

    let tables = if args.outputs.iter().any(|o| o.needs_tables()) {
        let path = args
            .tables
            .as_deref()
            .context("--tables is required for lrtable and lrparse")?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read tables file {}", path.display()))?;
        Some(LRParsingTable::from_json(&text)?)
    } else {
        None
    };

    let tokens = args.input.as_deref().map(|input| tokenize(input, args.chars));

    for output in &args.outputs {
        let text = match output {
            Output::Elf => continue,
            Output::Prod => {
                let g = grammar.as_ref().context("no grammar")?;
                let t = g.to_production_output_vec();
                render(format, &t, |t| t.to_plaintext(), |t| t.to_latex())?
            }
            Output::Ff => {
                let analysis = analysis.as_ref().context("no grammar")?;
                let t = analysis.to_first_follow_output_vec();
                render(format, &t, |t| t.to_plaintext(), |t| t.to_latex())?
            }
            Output::Ll1 => {
                let analysis = analysis.as_ref().context("no grammar")?;
                let (table, conflicts) = analysis.generate_ll1_parsing_table();
                let t = table.to_output(&conflicts);
                render(format, &t, |t| t.to_plaintext(), |t| t.to_latex())?
            }
            Output::Ll1parse => {
                let analysis = analysis.as_ref().context("no grammar")?;
                let tokens = tokens.as_ref().context("--input is required for ll1parse")?;
                let table = analysis.ll1_table()?;
                let report = table.parse(tokens);
                render(
                    format,
                    &report,
                    |t| t.to_plaintext(),
                    |t| verbatim(t.to_plaintext()),
                )?
            }
            Output::Lrtable => {
                let table = tables.as_ref().context("no tables")?;
                render(format, table, |t| t.to_plaintext(), |t| t.to_latex())?
            }
            Output::Lrparse => {
                let table = tables.as_ref().context("no tables")?;
                let tokens = tokens.as_ref().context("--input is required for lrparse")?;
                let report = table.parse(tokens.iter().cloned());
                render(
                    format,
                    &report,
                    |t| t.to_plaintext(),
                    |t| verbatim(t.to_plaintext()),
                )?
            }
        };
        println!("{}", text);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elf_handles_indirect_left_recursion() {
        let g = Grammar::parse("S -> A a | b\nA -> S d | c").unwrap();
        assert!(g.detect_left_recursion().is_empty());

        let rules = prepare_grammar(g.clone(), true).unwrap().to_rules();
        assert_eq!(rules["A"], vec![vec!["b", "d", "A'"], vec!["c", "A'"]]);
        assert_eq!(rules["A'"], vec![vec!["a", "d", "A'"], vec!["ε"]]);

        let rules = prepare_grammar(g, false).unwrap().to_rules();
        assert!(!rules.contains_key("A'"));
    }

    #[test]
    fn tokenize_chars() {
        assert_eq!(tokenize("a b", false), vec!["a", "b"]);
        assert_eq!(tokenize("ab c", true), vec!["a", "b", "c"]);
    }
}
