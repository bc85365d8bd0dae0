//! Source registry and include/exclude resolution.
//!
//! The registry is a fixed, ordered table built at startup. Every search run
//! resolves its own [`ActiveSourceSet`] from a [`SourceSelection`]; nothing
//! about the selection outlives the run.

use std::collections::HashSet;
use std::sync::Arc;

use crate::app::{HifiscoutError, Result};
use crate::domain::Diagnostic;
use crate::sources::ListingAdapter;

/// Which sources a run should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    /// Neither include nor exclude was given. Holds the configured default
    /// tokens; an empty list means every registered source.
    Default(Vec<String>),
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl SourceSelection {
    /// Build a selection from command-line style flags.
    ///
    /// Fails with [`HifiscoutError::ConflictingSourceFilters`] when both
    /// lists are non-empty.
    pub fn from_flags(include: &[String], exclude: &[String], defaults: &[String]) -> Result<Self> {
        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(HifiscoutError::ConflictingSourceFilters),
            (false, true) => Ok(Self::Include(include.to_vec())),
            (true, false) => Ok(Self::Exclude(exclude.to_vec())),
            (true, true) => Ok(Self::Default(defaults.to_vec())),
        }
    }
}

/// The adapters taking part in one run, plus the tokens that matched nothing.
#[derive(Clone, Default)]
pub struct ActiveSourceSet {
    adapters: Vec<Arc<dyn ListingAdapter>>,
    unrecognized: Vec<String>,
}

impl ActiveSourceSet {
    pub fn adapters(&self) -> &[Arc<dyn ListingAdapter>] {
        &self.adapters
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ActiveSourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSourceSet")
            .field("adapters", &self.names())
            .field("unrecognized", &self.unrecognized)
            .finish()
    }
}

/// Every known source, in a fixed order.
#[derive(Clone)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn ListingAdapter>>,
}

impl SourceRegistry {
    pub fn new(adapters: Vec<Arc<dyn ListingAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn adapters(&self) -> &[Arc<dyn ListingAdapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Index of the first adapter `token` names.
    ///
    /// A token names a source when it equals the full name or any one of
    /// its whitespace-separated words, ignoring case.
    fn position(&self, token: &str) -> Option<usize> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return None;
        }
        self.adapters.iter().position(|adapter| {
            let name = adapter.name().to_lowercase();
            name == token || name.split_whitespace().any(|word| word == token)
        })
    }

    /// Resolve `selection` against the registry.
    pub fn resolve(&self, selection: &SourceSelection) -> ActiveSourceSet {
        match selection {
            SourceSelection::Default(tokens) if tokens.is_empty() => ActiveSourceSet {
                adapters: self.adapters.clone(),
                unrecognized: Vec::new(),
            },
            SourceSelection::Default(tokens) | SourceSelection::Include(tokens) => {
                self.include(tokens)
            }
            SourceSelection::Exclude(tokens) => self.exclude(tokens),
        }
    }

    fn include(&self, tokens: &[String]) -> ActiveSourceSet {
        let mut picked = Vec::new();
        let mut unrecognized = Vec::new();

        for token in tokens {
            match self.position(token) {
                Some(idx) if !picked.contains(&idx) => picked.push(idx),
                Some(_) => {}
                None => unrecognized.push(token.clone()),
            }
        }

        ActiveSourceSet {
            adapters: picked.into_iter().map(|i| self.adapters[i].clone()).collect(),
            unrecognized,
        }
    }

    fn exclude(&self, tokens: &[String]) -> ActiveSourceSet {
        let mut excluded = HashSet::new();
        let mut unrecognized = Vec::new();

        for token in tokens {
            match self.position(token) {
                Some(idx) => {
                    excluded.insert(idx);
                }
                None => unrecognized.push(token.clone()),
            }
        }

        ActiveSourceSet {
            adapters: self
                .adapters
                .iter()
                .enumerate()
                .filter(|(i, _)| !excluded.contains(i))
                .map(|(_, adapter)| adapter.clone())
                .collect(),
            unrecognized,
        }
    }

    /// One warning per unrecognized token of `active`.
    pub fn diagnostics(&self, active: &ActiveSourceSet) -> Vec<Diagnostic> {
        let available: Vec<String> = self.names().into_iter().map(String::from).collect();
        active
            .unrecognized
            .iter()
            .map(|token| {
                tracing::warn!(token = %token, "unrecognized source");
                Diagnostic::UnrecognizedSource {
                    token: token.clone(),
                    available: available.clone(),
                }
            })
            .collect()
    }
}
