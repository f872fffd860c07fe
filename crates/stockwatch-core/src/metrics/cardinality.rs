//! Bounded label values for user-supplied strings (ticker symbols).
//!
//! Symbols arrive straight from request paths, so using them raw as label
//! values would grow the registry without bound. The guard normalizes each
//! symbol and admits at most `max_values` distinct ones (or only an explicit
//! allowlist); everything else folds into [`OTHER_LABEL`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashSet;

/// Label for symbols past the cap or outside the allowlist.
pub const OTHER_LABEL: &str = "__other__";
/// Label for strings that are not plausible ticker symbols.
pub const INVALID_LABEL: &str = "__invalid__";

const MAX_SYMBOL_LEN: usize = 12;

#[derive(Debug)]
pub struct CardinalityGuard {
    allowlist: Option<HashSet<String>>,
    max_values: usize,
    admitted: DashSet<String>,
    reserved: AtomicUsize,
    overflow_logged: AtomicBool,
}

impl CardinalityGuard {
    /// Admit the first `max_values` distinct symbols.
    pub fn new(max_values: usize) -> Self {
        Self {
            allowlist: None,
            max_values,
            admitted: DashSet::new(),
            reserved: AtomicUsize::new(0),
            overflow_logged: AtomicBool::new(false),
        }
    }

    /// Admit only the listed symbols (normalized the same way as input).
    pub fn with_allowlist<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowlist: HashSet<String> = symbols
            .into_iter()
            .filter_map(|s| normalize(s.as_ref()))
            .collect();
        Self {
            max_values: allowlist.len(),
            allowlist: Some(allowlist),
            ..Self::new(0)
        }
    }

    /// Label value to record for a raw symbol.
    pub fn admit(&self, raw: &str) -> String {
        let Some(symbol) = normalize(raw) else {
            return INVALID_LABEL.to_string();
        };

        if let Some(allow) = &self.allowlist {
            return if allow.contains(&symbol) {
                symbol
            } else {
                OTHER_LABEL.to_string()
            };
        }

        if self.admitted.contains(&symbol) {
            return symbol;
        }
        self.admit_new(symbol)
    }

    fn admit_new(&self, symbol: String) -> String {
        // Reserve a slot before inserting so the cap holds under races.
        let max = self.max_values;
        let reserved = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            // A concurrent first writer of this symbol may have taken the
            // last slot.
            if self.admitted.contains(&symbol) {
                return symbol;
            }
            if !self.overflow_logged.swap(true, Ordering::Relaxed) {
                tracing::warn!(cap = max, "symbol label cap reached; new symbols fold into {OTHER_LABEL}");
            }
            return OTHER_LABEL.to_string();
        }

        if !self.admitted.insert(symbol.clone()) {
            // Lost the race to another writer of the same symbol.
            self.reserved.fetch_sub(1, Ordering::AcqRel);
        }
        symbol
    }

    /// Number of distinct symbols admitted so far.
    pub fn admitted(&self) -> usize {
        match &self.allowlist {
            Some(_) => self.max_values,
            None => self.admitted.len(),
        }
    }
}

/// Trim and upper-case; `None` unless the result looks like a ticker.
pub fn normalize(raw: &str) -> Option<String> {
    let s = raw.trim().to_ascii_uppercase();
    let ok = !s.is_empty()
        && s.len() <= MAX_SYMBOL_LEN
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '^' | '=' | '-'));
    ok.then_some(s)
}
