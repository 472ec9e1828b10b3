use super::{Grammar, GrammarBuilder, GrammarError};

const ARROWS: [&str; 2] = ["->", "→"];

fn split_arrow(line: &str) -> Vec<&str> {
    let arrow = ARROWS
        .iter()
        .find(|a| line.contains(*a))
        .copied()
        .unwrap_or(ARROWS[0]);
    line.split(arrow).collect()
}

impl Grammar {
    /// Parses the text format:
    ///
    /// ```text
    /// %token a b
    /// S -> A B
    /// A -> a A | ε
    ///   | A
    /// ```
    ///
    /// A line starting with `|` continues the previous left-hand side. `%token`
    /// lines declare terminals; once any are declared, every other
    /// right-hand-side symbol must be a left-hand side.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut builder = GrammarBuilder::new();

        let mut previous_left: Option<&str> = None;
        for (i, line) in grammar.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let syntax_error = |message: &str| GrammarError::Syntax {
                line: i + 1,
                message: message.to_string(),
            };

            if let Some(tokens) = line
                .strip_prefix("%token")
                .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            {
                for t in tokens.split_whitespace() {
                    builder.declare_terminal(t);
                }
                continue;
            }

            let parts = split_arrow(line);
            if parts.len() > 2 {
                return Err(syntax_error("too many \"->\""));
            }
            let (left, rights): (&str, &str) = if parts.len() == 2 {
                let left_str = parts[0].trim();
                if left_str.is_empty() {
                    return Err(syntax_error("empty left side"));
                } else if left_str.split_whitespace().count() != 1 {
                    return Err(syntax_error("left side contains whitespace"));
                }
                (left_str, parts[1].trim())
            } else if let (Some(left), Some(rest)) = (previous_left, line.strip_prefix('|')) {
                (left, rest.trim())
            } else {
                return Err(syntax_error("cannot find left side"));
            };

            previous_left = Some(left);

            for right in rights.split('|') {
                builder.add_alternative(
                    left,
                    right.split_whitespace().map(str::to_string).collect(),
                );
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{Grammar, GrammarError};

    #[test]
    fn unicode_arrow() {
        let g = Grammar::parse("S → a S | ε").unwrap();
        let s = g.non_terminal(g.start_symbol()).unwrap();
        assert_eq!(s.productions.len(), 2);
        assert!(s.productions[1].is_empty());
    }

    #[test]
    fn token_declaration() {
        let err = Grammar::parse("%token a\nS -> a b").unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedSymbol { .. }));

        let g = Grammar::parse("%token a b\nS -> a b").unwrap();
        assert_eq!(g.terminal_iter().count(), 2);
    }

    #[test]
    fn token_keyword_needs_separator() {
        match Grammar::parse("%tokens a\nS -> a") {
            Err(GrammarError::Syntax { line, message }) => {
                assert_eq!(line, 1);
                assert_eq!(message, "cannot find left side");
            }
            r => panic!("unexpected result: {:?}", r),
        }

        let g = Grammar::parse("%token\n%token\ta\nS -> a").unwrap();
        assert_eq!(g.terminal_iter().map(|(_, t)| t).collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn reports_line_number() {
        match Grammar::parse("S -> a\n\nS a -> b") {
            Err(GrammarError::Syntax { line, .. }) => assert_eq!(line, 3),
            r => panic!("unexpected result: {:?}", r),
        }
    }
}
