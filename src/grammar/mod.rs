pub mod error;
pub mod first_follow;
pub mod grammar;
pub mod left_recursion;
pub mod ll1_parsing_table;
pub mod lr_parse;
pub mod lr_table;
pub mod parse;
pub mod pretty_print;

pub use error::{GrammarError, LRTableError};
pub use first_follow::{Analysis, AnalysisConfig, FirstSets, FollowSets};
pub use grammar::{Grammar, GrammarBuilder, Symbol};
pub use ll1_parsing_table::{LL1Conflict, LL1ParsingTable};
pub use lr_parse::{LRParseReport, LRParser};
pub use lr_table::{LRParsingTable, LRParsingTableAction};

pub const EPSILON: &str = "ε";
pub const END_MARK: &str = "$";

/// Spellings accepted for the empty string in grammar input.
pub const EPSILON_ALIASES: [&str; 3] = [EPSILON, "ϵ", "epsilon"];

pub(crate) fn is_epsilon(name: &str) -> bool {
    EPSILON_ALIASES.contains(&name)
}
