use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use super::{Grammar, GrammarError};

/// An alternative of the form `A -> A α`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeftRecursion {
    pub non_terminal: String,
    pub production: Vec<String>,
}

impl Grammar {
    /// Lists every immediately left-recursive alternative.
    pub fn detect_left_recursion(&self) -> Vec<LeftRecursion> {
        self.productions()
            .filter(|(left, production)| production.first() == Some(left))
            .map(|(left, production)| LeftRecursion {
                non_terminal: self.get_symbol_name(left).to_string(),
                production: self
                    .production_to_vec_str(production)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect()
    }

    /// Removes left recursion by ordered substitution.
    ///
    /// Non-terminals are visited in declaration order; leading occurrences of
    /// earlier non-terminals are substituted first, then immediate recursion on
    /// `A` is moved into a fresh `A'` with an ε alternative. Alternatives of the
    /// form `A -> A` are dropped.
    #[tracing::instrument(skip_all)]
    pub fn eliminate_left_recursion(&self) -> Result<Grammar, GrammarError> {
        let offset = self.symbols().len();
        let non_terminals: Vec<usize> = self.non_terminal_iter().map(|nt| nt.index).collect();
        let order: HashMap<usize, usize> = non_terminals
            .iter()
            .enumerate()
            .map(|(i, idx)| (*idx, i))
            .collect();

        let mut productions: Vec<Vec<Vec<usize>>> = self
            .non_terminal_iter()
            .map(|nt| nt.productions.clone())
            .collect();
        // (owner position, name, alternatives), prime indices start at `offset`
        let mut primes: Vec<(usize, String, Vec<Vec<usize>>)> = Vec::new();
        let mut used_names: HashSet<String> = HashSet::new();

        for i in 0..non_terminals.len() {
            let nt_idx = non_terminals[i];
            let old_productions = std::mem::take(&mut productions[i]);
            let mut kept: Vec<Vec<usize>> = Vec::new();
            let mut recursive: Vec<Vec<usize>> = Vec::new();

            for production in old_productions {
                match production.first().and_then(|s| order.get(s)) {
                    Some(&j) if j < i => {
                        for prefix in &productions[j] {
                            let substituted: Vec<usize> =
                                prefix.iter().chain(production.iter().skip(1)).cloned().collect();
                            if substituted.first() == Some(&nt_idx) {
                                recursive.push(substituted[1..].to_vec());
                            } else {
                                kept.push(substituted);
                            }
                        }
                    }
                    Some(&j) if j == i => recursive.push(production[1..].to_vec()),
                    _ => kept.push(production),
                }
            }
            recursive.retain(|alpha| !alpha.is_empty());

            if recursive.is_empty() {
                productions[i] = kept;
                continue;
            }

            let prime_idx = offset + primes.len();
            let mut name = self.get_symbol_prime_name(self.get_symbol_name(nt_idx).to_string());
            while used_names.contains(&name) {
                name.push('\'');
            }
            used_names.insert(name.clone());
            tracing::debug!(
                "`{}` is left recursive, introducing `{}`",
                self.get_symbol_name(nt_idx),
                name
            );

            for production in kept.iter_mut().chain(recursive.iter_mut()) {
                production.push(prime_idx);
            }
            recursive.push(Vec::new());
            productions[i] = kept;
            primes.push((i, name, recursive));
        }

        let symbol_name = |idx: usize| -> String {
            if idx < offset {
                self.get_symbol_name(idx).to_string()
            } else {
                primes[idx - offset].1.clone()
            }
        };
        let to_names = |alternatives: &[Vec<usize>]| -> Vec<Vec<String>> {
            alternatives
                .iter()
                .map(|p| p.iter().map(|&s| symbol_name(s)).collect())
                .collect()
        };

        let mut rules: IndexMap<String, Vec<Vec<String>>> = IndexMap::new();
        for (i, &nt_idx) in non_terminals.iter().enumerate() {
            rules.insert(self.get_symbol_name(nt_idx).to_string(), to_names(&productions[i]));
            for (_, name, alternatives) in primes.iter().filter(|(owner, _, _)| *owner == i) {
                rules.insert(name.clone(), to_names(alternatives));
            }
        }

        let mut builder = Grammar::builder().terminals(self.terminal_iter().map(|(_, t)| t));
        for (left, rights) in rules {
            builder = builder.rule(left, rights);
        }
        builder.build()
    }
}
