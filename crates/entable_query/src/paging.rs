//! `$top` / `$skip` parsing and application.

use entable_foundation::{CoreConfig, Error, Result};

/// Resolved paging window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Paging {
    /// Most items returned.
    pub top: usize,
    /// Items skipped first.
    pub skip: usize,
}

impl Paging {
    /// Creates a window.
    #[must_use]
    pub const fn new(top: usize, skip: usize) -> Self {
        Self { top, skip }
    }

    /// Parses `$top` and `$skip` against the configured limits.
    ///
    /// A missing `$top` takes `config.default_top`; a missing `$skip` is 0.
    ///
    /// # Errors
    ///
    /// Returns `QUERY_PARSE_ERROR` for non-numeric values and values above
    /// `max_top` / `max_skip`.
    pub fn parse(top: Option<&str>, skip: Option<&str>, config: &CoreConfig) -> Result<Self> {
        let top = match top {
            Some(text) => parse_bounded("$top", text, config.max_top)?,
            None => config.default_top,
        };
        let skip = match skip {
            Some(text) => parse_bounded("$skip", text, config.max_skip)?,
            None => 0,
        };
        Ok(Self { top, skip })
    }

    /// Applies the window to an ordered sequence.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.top).collect()
    }
}

fn parse_bounded(option: &'static str, text: &str, max: usize) -> Result<usize> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::query_parse(option, format!("not a non-negative integer: {text:?}")));
    }
    match text.parse::<usize>() {
        Ok(n) if n <= max => Ok(n),
        _ => Err(Error::query_parse(option, format!("must be between 0 and {max}"))),
    }
}
