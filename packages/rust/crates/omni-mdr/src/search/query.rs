//! Extended query syntax.
//!
//! | token     | meaning                      |
//! |-----------|------------------------------|
//! | `word`    | fuzzy match                  |
//! | `'word`   | contains `word`              |
//! | `=word`   | field equals `word`          |
//! | `^word`   | field starts with `word`     |
//! | `word$`   | field ends with `word`       |
//! | `!word`   | field does not contain `word`|
//! | `!^word`  | field does not start with    |
//! | `!word$`  | field does not end with      |
//!
//! Whitespace separated tokens must all match; ` | ` separates alternatives.

use super::fuzzy::FuzzyScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TermKind {
    Fuzzy,
    Include,
    Exact,
    Prefix,
    Suffix,
    InverseInclude,
    InversePrefix,
    InverseSuffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Term {
    pub(crate) kind: TermKind,
    pub(crate) chars: Vec<char>,
}

/// Alternatives of conjunctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedQuery {
    groups: Vec<Vec<Term>>,
}

impl ParsedQuery {
    pub(crate) fn parse(raw: &str) -> Self {
        let groups = raw
            .to_lowercase()
            .split(" | ")
            .map(|group| group.split_whitespace().filter_map(parse_term).collect())
            .filter(|terms: &Vec<Term>| !terms.is_empty())
            .collect();
        Self { groups }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Score of the first alternative whose terms all match, averaged over its terms.
    pub(crate) fn score_field(
        &self,
        field: &[char],
        scorer: &dyn FuzzyScorer,
        min_match_chars: usize,
    ) -> Option<f64> {
        self.groups.iter().find_map(|terms| {
            let mut total = 0.0;
            for term in terms {
                total += term_score(term, field, scorer, min_match_chars)?;
            }
            #[allow(clippy::cast_precision_loss)]
            let count = terms.len() as f64;
            Some(total / count)
        })
    }
}

fn parse_term(token: &str) -> Option<Term> {
    let (inverse, rest) = match token.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (kind, text) = if let Some(text) = rest.strip_prefix('=') {
        (TermKind::Exact, text)
    } else if let Some(text) = rest.strip_prefix('^') {
        let kind = if inverse {
            TermKind::InversePrefix
        } else {
            TermKind::Prefix
        };
        (kind, text)
    } else if let Some(text) = rest.strip_suffix('$') {
        let kind = if inverse {
            TermKind::InverseSuffix
        } else {
            TermKind::Suffix
        };
        (kind, text)
    } else if let Some(text) = rest.strip_prefix('\'') {
        (TermKind::Include, text)
    } else if inverse {
        (TermKind::InverseInclude, rest)
    } else {
        (TermKind::Fuzzy, rest)
    };
    if text.is_empty() {
        return None;
    }
    Some(Term {
        kind,
        chars: text.chars().collect(),
    })
}

fn contains(field: &[char], needle: &[char]) -> bool {
    needle.len() <= field.len() && field.windows(needle.len()).any(|window| window == needle)
}

fn exact_when(matched: bool) -> Option<f64> {
    matched.then_some(0.0)
}

fn term_score(
    term: &Term,
    field: &[char],
    scorer: &dyn FuzzyScorer,
    min_match_chars: usize,
) -> Option<f64> {
    let needle = term.chars.as_slice();
    match term.kind {
        TermKind::Fuzzy => {
            if needle.len() < min_match_chars {
                return None;
            }
            scorer.score(needle, field)
        }
        TermKind::Include => exact_when(contains(field, needle)),
        TermKind::Exact => exact_when(field == needle),
        TermKind::Prefix => exact_when(field.starts_with(needle)),
        TermKind::Suffix => exact_when(field.ends_with(needle)),
        TermKind::InverseInclude => exact_when(!contains(field, needle)),
        TermKind::InversePrefix => exact_when(!field.starts_with(needle)),
        TermKind::InverseSuffix => exact_when(!field.ends_with(needle)),
    }
}
