//! Include/exclude filtering of candidate directory names.

use std::collections::BTreeSet;

use crate::error::{ReplError, Result};

/// Which way a [`FilterSpec`] selects directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Keep names containing at least one term.
    Include,
    /// Keep names containing none of the terms.
    Exclude,
    /// Keep everything.
    None,
}

/// Directory-name filter applied to the immediate children of a basepath.
///
/// Matching is a case-sensitive substring test against the child's own name,
/// never the full path, so a term that matches a parent segment selects
/// nothing by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    mode: FilterMode,
    terms: BTreeSet<String>,
}

impl FilterSpec {
    /// A filter that accepts every name.
    pub fn none() -> Self {
        Self {
            mode: FilterMode::None,
            terms: BTreeSet::new(),
        }
    }

    /// Filter keeping names that contain any of `terms`.
    pub fn include<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(FilterMode::Include, terms)
    }

    /// Filter dropping names that contain any of `terms`.
    pub fn exclude<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(FilterMode::Exclude, terms)
    }

    fn with_mode<I, S>(mode: FilterMode, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a filter from the include and exclude term lists given on the command line.
    ///
    /// Supplying both lists is rejected rather than preferring one of them, and
    /// so is an empty term, which every name contains.
    pub fn from_terms(include: &[String], exclude: &[String]) -> Result<Self> {
        if include.iter().chain(exclude).any(|t| t.is_empty()) {
            return Err(ReplError::Configuration(
                "filter terms must not be empty".to_string(),
            ));
        }
        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(ReplError::Configuration(
                "--filteri and --filtere are mutually exclusive".to_string(),
            )),
            (false, true) => Ok(Self::include(include.iter().cloned())),
            (true, false) => Ok(Self::exclude(exclude.iter().cloned())),
            (true, true) => Ok(Self::none()),
        }
    }

    /// Active mode.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Decide whether a directory name passes the filter.
    pub fn matches(&self, directory_name: &str) -> bool {
        let name = directory_name.trim_matches('/');
        match self.mode {
            FilterMode::None => true,
            FilterMode::Include => self.terms.iter().any(|t| name.contains(t.as_str())),
            FilterMode::Exclude => !self.terms.iter().any(|t| name.contains(t.as_str())),
        }
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::none()
    }
}
