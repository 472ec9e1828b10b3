use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use super::{is_epsilon, GrammarError, END_MARK, EPSILON};

/// Index of the ε marker in every grammar's symbol list.
pub const EPSILON_INDEX: usize = 0;
/// Index of the end-of-input marker in every grammar's symbol list.
pub const END_MARK_INDEX: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminal {
    pub index: usize,
    pub name: String,
    /// Right-hand sides in declaration order. An ε alternative is stored empty.
    pub productions: Vec<Vec<usize>>,
}

impl NonTerminal {
    fn new(index: usize, name: String) -> Self {
        Self {
            index,
            name,
            productions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Epsilon,
    EndMark,
    Terminal(String),
    NonTerminal(NonTerminal),
}

impl Symbol {
    pub fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    fn mut_non_terminal(&mut self) -> Option<&mut NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    /// Terminals and the end marker: symbols that can be matched against input.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_) | Symbol::EndMark)
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Epsilon => EPSILON,
            Symbol::EndMark => END_MARK,
            Symbol::Terminal(name) => name.as_str(),
            Symbol::NonTerminal(nt) => nt.name.as_str(),
        }
    }
}

/// A context-free grammar with the terminal/non-terminal partition resolved.
///
/// Symbols are referred to by their index into [`Grammar::symbols`]. Index 0 is
/// always ε and index 1 the end marker; non-terminals follow in declaration
/// order, the first of them being the start symbol.
#[derive(Debug, Clone)]
pub struct Grammar {
    symbols: Vec<Symbol>,
    symbol_table: HashMap<String, usize>,
    start_symbol: usize,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Builds a grammar from a non-terminal → alternatives mapping. The first
    /// key becomes the start symbol.
    pub fn from_rules(rules: IndexMap<String, Vec<Vec<String>>>) -> Result<Self, GrammarError> {
        GrammarBuilder {
            rules,
            terminals: None,
        }
        .build()
    }

    /// Reads the JSON form `{"S": [["A", "B"]], "A": [["a", "A"], ["ε"]]}`.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let rules: IndexMap<String, Vec<Vec<String>>> = serde_json::from_str(json)?;
        Self::from_rules(rules)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }

    pub fn start_symbol(&self) -> usize {
        self.start_symbol
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        self.symbols[index].is_terminal()
    }

    /// Terminals in order of first appearance. The end marker is not included.
    pub fn terminal_iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.symbols.iter().enumerate().filter_map(|(i, s)| {
            if let Symbol::Terminal(name) = s {
                Some((i, name.as_str()))
            } else {
                None
            }
        })
    }

    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &NonTerminal> {
        self.symbols.iter().filter_map(|s| s.non_terminal())
    }

    pub fn non_terminal(&self, index: usize) -> Option<&NonTerminal> {
        self.symbols.get(index).and_then(|s| s.non_terminal())
    }

    /// Every production as `(left, right)`, grouped by non-terminal in
    /// declaration order.
    pub fn productions(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.non_terminal_iter().flat_map(|nt| {
            nt.productions
                .iter()
                .map(move |production| (nt.index, production.as_slice()))
        })
    }

    pub fn get_symbol_index(&self, name: &str) -> Option<usize> {
        if is_epsilon(name) {
            return Some(EPSILON_INDEX);
        }
        self.symbol_table.get(name).cloned()
    }

    pub fn get_symbol_name(&self, index: usize) -> &str {
        self.symbols[index].name()
    }

    /// Symbol names of a right-hand side; the empty production renders as `[ε]`.
    pub fn production_to_vec_str(&self, production: &[usize]) -> Vec<&str> {
        if production.is_empty() {
            vec![EPSILON]
        } else {
            production
                .iter()
                .map(|idx| self.get_symbol_name(*idx))
                .collect()
        }
    }

    /// The grammar back in its mapping form, ε alternatives written as `["ε"]`.
    pub fn to_rules(&self) -> IndexMap<String, Vec<Vec<String>>> {
        self.non_terminal_iter()
            .map(|nt| {
                let rights = nt
                    .productions
                    .iter()
                    .map(|p| {
                        self.production_to_vec_str(p)
                            .into_iter()
                            .map(str::to_string)
                            .collect()
                    })
                    .collect();
                (nt.name.clone(), rights)
            })
            .collect()
    }

    pub(crate) fn get_symbol_prime_name(&self, mut name: String) -> String {
        while self.symbol_table.contains_key(&name) {
            name.push('\'');
        }
        name
    }

    fn empty() -> Self {
        let mut symbol_table = HashMap::new();
        symbol_table.insert(EPSILON.to_string(), EPSILON_INDEX);
        symbol_table.insert(END_MARK.to_string(), END_MARK_INDEX);
        Self {
            symbols: vec![Symbol::Epsilon, Symbol::EndMark],
            symbol_table,
            start_symbol: END_MARK_INDEX + 1,
        }
    }

    fn add_non_terminal(&mut self, name: &str) -> usize {
        let idx = self.symbols.len();
        self.symbols
            .push(Symbol::NonTerminal(NonTerminal::new(idx, name.to_string())));
        self.symbol_table.insert(name.to_string(), idx);
        idx
    }

    fn add_terminal(&mut self, name: String) -> usize {
        let idx = self.symbols.len();
        self.symbols.push(Symbol::Terminal(name.clone()));
        self.symbol_table.insert(name, idx);
        idx
    }

    fn add_production(&mut self, left: usize, right: Vec<usize>) {
        if let Some(nt) = self.symbols[left].mut_non_terminal() {
            nt.productions.push(right);
        }
    }
}

fn is_reserved(name: &str) -> bool {
    is_epsilon(name) || name == END_MARK
}

/// Collects rules in declaration order and resolves them into a [`Grammar`].
///
/// Without declared terminals every right-hand-side symbol that never appears on
/// a left-hand side is a terminal. Once [`GrammarBuilder::terminals`] is used,
/// such a symbol must be declared, otherwise building fails with
/// [`GrammarError::UndefinedSymbol`].
#[derive(Debug, Default, Clone)]
pub struct GrammarBuilder {
    rules: IndexMap<String, Vec<Vec<String>>>,
    terminals: Option<IndexSet<String>>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule<L, R, A, S>(mut self, left: L, rights: R) -> Self
    where
        L: Into<String>,
        R: IntoIterator<Item = A>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alternatives = self.rules.entry(left.into()).or_default();
        alternatives.extend(
            rights
                .into_iter()
                .map(|right| right.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn terminals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.declare_terminal(name);
        }
        self
    }

    pub fn declare_terminal<S: Into<String>>(&mut self, name: S) {
        self.terminals
            .get_or_insert_with(IndexSet::new)
            .insert(name.into());
    }

    pub fn add_alternative(&mut self, left: &str, right: Vec<String>) {
        match self.rules.get_mut(left) {
            Some(alternatives) => alternatives.push(right),
            None => {
                self.rules.insert(left.to_string(), vec![right]);
            }
        }
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let GrammarBuilder { rules, terminals } = self;
        if rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        let mut g = Grammar::empty();
        for (left, rights) in &rules {
            if is_reserved(left) {
                return Err(GrammarError::ReservedSymbol(left.clone()));
            }
            if rights.is_empty() {
                return Err(GrammarError::NoProductions(left.clone()));
            }
            if terminals.as_ref().is_some_and(|t| t.contains(left)) {
                return Err(GrammarError::TerminalDeclaredAsNonTerminal(left.clone()));
            }
            g.add_non_terminal(left);
        }

        if let Some(terminals) = &terminals {
            for name in terminals {
                if is_reserved(name) {
                    return Err(GrammarError::ReservedSymbol(name.clone()));
                }
                g.add_terminal(name.clone());
            }
        }

        for (left, rights) in rules {
            let left_idx = g.symbol_table[&left];
            for right in rights {
                let mut production = Vec::with_capacity(right.len());
                for s in right {
                    if is_epsilon(&s) {
                        continue;
                    }
                    if s == END_MARK {
                        return Err(GrammarError::ReservedSymbol(s));
                    }
                    let idx = match g.get_symbol_index(&s) {
                        Some(idx) => idx,
                        None if terminals.is_some() => {
                            return Err(GrammarError::UndefinedSymbol {
                                symbol: s,
                                left: left.clone(),
                            })
                        }
                        None => g.add_terminal(s),
                    };
                    production.push(idx);
                }
                g.add_production(left_idx, production);
            }
        }

        tracing::trace!(
            "grammar with {} symbols, start symbol `{}`",
            g.symbols.len(),
            g.get_symbol_name(g.start_symbol)
        );

        Ok(g)
    }
}
