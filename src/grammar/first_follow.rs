//! Fixed-point computation of FIRST and FOLLOW sets.

use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;

use super::{
    grammar::{END_MARK_INDEX, EPSILON_INDEX},
    Grammar, GrammarError, Symbol,
};

/// Limits for the fixed-point loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum number of full passes over the productions per set kind.
    pub max_iterations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

/// FIRST sets for every symbol, indexed like [`Grammar::symbols`].
///
/// A set holds terminal indices and [`EPSILON_INDEX`] when the symbol can
/// derive the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets {
    sets: Vec<HashSet<usize>>,
}

impl FirstSets {
    /// `FIRST(t) = {t}` for terminals and markers, `∅` for non-terminals.
    pub fn new(grammar: &Grammar) -> Self {
        let sets = grammar
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, s)| match s {
                Symbol::NonTerminal(_) => HashSet::new(),
                _ => HashSet::from([i]),
            })
            .collect();
        Self { sets }
    }

    #[tracing::instrument(skip_all)]
    pub fn compute(grammar: &Grammar, config: &AnalysisConfig) -> Result<Self, GrammarError> {
        let mut first = Self::new(grammar);
        for iteration in 1..=config.max_iterations {
            let changed = first.step(grammar);
            tracing::trace!("FIRST pass {}: changed = {}", iteration, changed);
            if !changed {
                return Ok(first);
            }
        }
        Err(GrammarError::NonConvergent {
            set: "FIRST",
            iterations: config.max_iterations,
        })
    }

    /// Runs one pass over all productions. Returns whether any set grew.
    pub fn step(&mut self, grammar: &Grammar) -> bool {
        let mut changed = false;
        for (left, production) in grammar.productions() {
            let first = self.of_sequence(production);
            let set = &mut self.sets[left];
            for s in first {
                changed |= set.insert(s);
            }
        }
        changed
    }

    pub fn get(&self, symbol: usize) -> &HashSet<usize> {
        &self.sets[symbol]
    }

    pub fn is_nullable(&self, symbol: usize) -> bool {
        self.sets[symbol].contains(&EPSILON_INDEX)
    }

    /// `FIRST(X1 X2 ... Xn)`; contains ε iff every `Xi` is nullable, so the
    /// empty sequence yields `{ε}`.
    pub fn of_sequence(&self, sequence: &[usize]) -> HashSet<usize> {
        let mut first = HashSet::new();
        for idx in sequence {
            let set = &self.sets[*idx];
            first.extend(set.iter().copied().filter(|&s| s != EPSILON_INDEX));
            if !set.contains(&EPSILON_INDEX) {
                return first;
            }
        }
        first.insert(EPSILON_INDEX);
        first
    }
}

/// FOLLOW sets for every non-terminal. Entries for other symbols stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSets {
    sets: Vec<HashSet<usize>>,
}

impl FollowSets {
    /// Empty sets, except `FOLLOW(start) = {$}`.
    pub fn new(grammar: &Grammar) -> Self {
        let mut sets = vec![HashSet::new(); grammar.symbols().len()];
        sets[grammar.start_symbol()].insert(END_MARK_INDEX);
        Self { sets }
    }

    #[tracing::instrument(skip_all)]
    pub fn compute(
        grammar: &Grammar,
        first: &FirstSets,
        config: &AnalysisConfig,
    ) -> Result<Self, GrammarError> {
        let mut follow = Self::new(grammar);
        for iteration in 1..=config.max_iterations {
            let changed = follow.step(grammar, first);
            tracing::trace!("FOLLOW pass {}: changed = {}", iteration, changed);
            if !changed {
                return Ok(follow);
            }
        }
        Err(GrammarError::NonConvergent {
            set: "FOLLOW",
            iterations: config.max_iterations,
        })
    }

    /// Runs one pass over all productions. Returns whether any set grew.
    ///
    /// Each right-hand side is walked right to left with `tail` holding what
    /// can follow the current position: it starts as `FOLLOW(left)`, resets to
    /// `{t}` on a terminal and to `FIRST(X) - {ε}` on a non-terminal `X`, keeping
    /// the previous tail only when `X` is nullable.
    pub fn step(&mut self, grammar: &Grammar, first: &FirstSets) -> bool {
        let mut changed = false;
        for (left, production) in grammar.productions() {
            let mut tail = self.sets[left].clone();
            for &x in production.iter().rev() {
                if grammar.is_terminal(x) {
                    tail = HashSet::from([x]);
                    continue;
                }

                let set = &mut self.sets[x];
                for &t in &tail {
                    changed |= set.insert(t);
                }

                let first_x = first.get(x);
                let mut next: HashSet<usize> = first_x
                    .iter()
                    .copied()
                    .filter(|&s| s != EPSILON_INDEX)
                    .collect();
                if first_x.contains(&EPSILON_INDEX) {
                    next.extend(tail);
                }
                tail = next;
            }
        }
        changed
    }

    pub fn get(&self, non_terminal: usize) -> &HashSet<usize> {
        &self.sets[non_terminal]
    }
}

/// FIRST and FOLLOW sets of one grammar.
#[derive(Debug, Clone)]
pub struct Analysis<'g> {
    grammar: &'g Grammar,
    first: FirstSets,
    follow: FollowSets,
}

impl Grammar {
    pub fn analyze(&self, config: &AnalysisConfig) -> Result<Analysis<'_>, GrammarError> {
        let first = FirstSets::compute(self, config)?;
        let follow = FollowSets::compute(self, &first, config)?;
        Ok(Analysis {
            grammar: self,
            first,
            follow,
        })
    }
}

impl<'g> Analysis<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn first(&self) -> &FirstSets {
        &self.first
    }

    pub fn follow(&self) -> &FollowSets {
        &self.follow
    }

    pub fn first_of(&self, symbol: &str) -> Option<BTreeSet<&'g str>> {
        let idx = self.grammar.get_symbol_index(symbol)?;
        Some(self.names(self.first.get(idx)))
    }

    /// `None` unless `symbol` is a non-terminal.
    pub fn follow_of(&self, symbol: &str) -> Option<BTreeSet<&'g str>> {
        let idx = self.grammar.get_symbol_index(symbol)?;
        self.grammar.non_terminal(idx)?;
        Some(self.names(self.follow.get(idx)))
    }

    fn names(&self, set: &HashSet<usize>) -> BTreeSet<&'g str> {
        let grammar = self.grammar;
        set.iter().map(|&i| grammar.get_symbol_name(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    fn worked_example() -> Grammar {
        Grammar::parse("S -> A B\nA -> a A | ε\nB -> b B | ε").unwrap()
    }

    fn expression_grammar() -> Grammar {
        Grammar::parse(
            "E -> T E'
             E' -> + T E' | ε
             T -> F T'
             T' -> * F T' | ε
             F -> ( E ) | id",
        )
        .unwrap()
    }

    #[test]
    fn worked_example_sets() {
        let g = worked_example();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();

        assert_eq!(a.first_of("A").unwrap(), set(&["a", "ε"]));
        assert_eq!(a.first_of("B").unwrap(), set(&["b", "ε"]));
        assert_eq!(a.first_of("S").unwrap(), set(&["a", "b", "ε"]));
        assert_eq!(a.follow_of("S").unwrap(), set(&["$"]));
        assert!(a.follow_of("A").unwrap().is_superset(&set(&["b", "$"])));
        assert_eq!(a.follow_of("B").unwrap(), set(&["$"]));
        assert_eq!(a.follow_of("a"), None);
    }

    #[test]
    fn expression_grammar_sets() {
        let g = expression_grammar();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();

        for nt in ["E", "T", "F"] {
            assert_eq!(a.first_of(nt).unwrap(), set(&["(", "id"]));
        }
        assert_eq!(a.first_of("E'").unwrap(), set(&["+", "ε"]));
        assert_eq!(a.first_of("T'").unwrap(), set(&["*", "ε"]));

        assert_eq!(a.follow_of("E").unwrap(), set(&[")", "$"]));
        assert_eq!(a.follow_of("E'").unwrap(), set(&[")", "$"]));
        assert_eq!(a.follow_of("T").unwrap(), set(&["+", ")", "$"]));
        assert_eq!(a.follow_of("T'").unwrap(), set(&["+", ")", "$"]));
        assert_eq!(a.follow_of("F").unwrap(), set(&["*", "+", ")", "$"]));
    }

    #[test]
    fn first_of_terminal_is_itself() {
        let g = expression_grammar();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();
        for (_, t) in g.terminal_iter() {
            assert_eq!(a.first_of(t).unwrap(), set(&[t]));
        }
    }

    #[test]
    fn end_mark_follows_start_symbol() {
        // start symbol never appears on a right-hand side
        let g = Grammar::parse("P -> x Q\nQ -> y").unwrap();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();
        assert!(a.follow_of("P").unwrap().contains("$"));
        assert_eq!(a.follow_of("Q").unwrap(), set(&["$"]));

        let g = Grammar::parse("S -> ( S ) S | ε").unwrap();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();
        assert_eq!(a.follow_of("S").unwrap(), set(&[")", "$"]));
    }

    #[test]
    fn sets_only_grow_between_passes() {
        let g = expression_grammar();

        let mut first = FirstSets::new(&g);
        loop {
            let before = first.clone();
            let changed = first.step(&g);
            for i in 0..g.symbols().len() {
                assert!(first.get(i).is_superset(before.get(i)));
            }
            if !changed {
                assert_eq!(first, before);
                break;
            }
        }

        let mut follow = FollowSets::new(&g);
        loop {
            let before = follow.clone();
            let changed = follow.step(&g, &first);
            for nt in g.non_terminal_iter() {
                assert!(follow.get(nt.index).is_superset(before.get(nt.index)));
            }
            if !changed {
                break;
            }
        }
    }

    #[test]
    fn converged_sets_are_stable() {
        let g = expression_grammar();
        let config = AnalysisConfig::default();
        let mut first = FirstSets::compute(&g, &config).unwrap();
        let mut follow = FollowSets::compute(&g, &first, &config).unwrap();

        let (first_before, follow_before) = (first.clone(), follow.clone());
        assert!(!first.step(&g));
        assert!(!follow.step(&g, &first));
        assert_eq!(first, first_before);
        assert_eq!(follow, follow_before);
    }

    #[test]
    fn left_recursion_converges() {
        let g = Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id").unwrap();
        let a = g.analyze(&AnalysisConfig::default()).unwrap();
        assert_eq!(a.first_of("E").unwrap(), set(&["(", "id"]));
        assert_eq!(a.follow_of("E").unwrap(), set(&["+", ")", "$"]));
        assert_eq!(a.follow_of("F").unwrap(), set(&["*", "+", ")", "$"]));
    }

    #[test]
    fn iteration_cap() {
        // FIRST(S) is only known after the pass that fills FIRST(A)
        let g = Grammar::parse("S -> A\nA -> a").unwrap();
        let config = AnalysisConfig { max_iterations: 1 };
        match g.analyze(&config) {
            Err(GrammarError::NonConvergent { set, iterations }) => {
                assert_eq!(set, "FIRST");
                assert_eq!(iterations, 1);
            }
            r => panic!("unexpected result: {:?}", r.map(|_| ())),
        }

        let config = AnalysisConfig { max_iterations: 3 };
        assert!(g.analyze(&config).is_ok());
    }
}
