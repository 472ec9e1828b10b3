use super::ll1_parsing_table::LL1Conflict;

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("grammar has no productions")]
    EmptyGrammar,

    #[error("`{0}` is reserved and cannot be used as a grammar symbol here")]
    ReservedSymbol(String),

    #[error("non-terminal `{0}` has no alternatives")]
    NoProductions(String),

    #[error("symbol `{symbol}` used in a production of `{left}` is neither a declared terminal nor a non-terminal")]
    UndefinedSymbol { symbol: String, left: String },

    #[error("`{0}` is declared as a terminal but also has productions")]
    TerminalDeclaredAsNonTerminal(String),

    #[error("{set} sets did not converge after {iterations} passes")]
    NonConvergent {
        set: &'static str,
        iterations: usize,
    },

    #[error("grammar is not LL(1): {}", display_conflicts(.0))]
    NotLL1(Vec<LL1Conflict>),

    #[error("invalid JSON grammar")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

fn display_conflicts(conflicts: &[LL1Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum LRTableError {
    #[error("invalid action `{0}`, expected `shift N`, `reduce A -> β` or `accept`")]
    InvalidAction(String),

    #[error("invalid LR table")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}
