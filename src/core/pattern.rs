//! Pattern matching for Athenz names
//!
//! Athenz patterns support a single wildcard:
//! - `*` - Matches zero or more of any character (e.g., `user.*`, `home.domain:*`)
//!
//! Every other character is literal, including regex metacharacters such as
//! `+`, `?` and `(`. A pattern always matches the whole input, so `user.*`
//! matches `user.name` but not `other.user.name`.

use crate::error::{AuthzError, Result};
use lru::LruCache;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;

/// Default upper bound on the compiled size of a single pattern
pub const DEFAULT_SIZE_LIMIT: usize = 1 << 20;

/// Options applied when a glob is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Match without regard to ASCII/Unicode case
    pub case_insensitive: bool,
    /// Maximum compiled size in bytes
    pub size_limit: usize,
}

impl Default for PatternOptions {
    fn default() -> Self {
        PatternOptions {
            case_insensitive: false,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

/// A compiled, anchored Athenz glob
#[derive(Debug, Clone)]
pub struct Pattern {
    glob: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a glob with default (case-sensitive) options
    ///
    /// # Examples
    /// ```
    /// use athenz_rbac::Pattern;
    ///
    /// let pattern = Pattern::compile("user.*").unwrap();
    /// assert!(pattern.is_match("user.name"));
    /// assert!(!pattern.is_match("other.user.name"));
    /// ```
    pub fn compile(glob: &str) -> Result<Self> {
        Self::compile_with(glob, &PatternOptions::default())
    }

    /// Compile a glob with explicit options
    pub fn compile_with(glob: &str, options: &PatternOptions) -> Result<Self> {
        let source = regex_from_glob(glob);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(options.case_insensitive)
            .size_limit(options.size_limit)
            .build()
            .map_err(|e| AuthzError::InvalidPattern {
                pattern: glob.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Pattern {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Check if the whole input matches this pattern
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// The glob this pattern was compiled from
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// The anchored regular expression backing this pattern
    pub fn regex_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Translate a glob into an anchored regex, escaping every literal run
fn regex_from_glob(glob: &str) -> String {
    let literals: Vec<String> = glob.split('*').map(regex::escape).collect();
    format!("^{}$", literals.join("(?s:.*)"))
}

/// Compiles globs with fixed options, reusing recently compiled patterns
///
/// Document refreshes usually re-submit mostly unchanged policy, so a small
/// LRU of compiled patterns keeps a re-parse from recompiling every glob.
pub struct PatternCompiler {
    options: PatternOptions,
    cache: Option<Mutex<LruCache<String, Pattern>>>,
}

impl PatternCompiler {
    /// Create a compiler; a `capacity` of zero disables reuse
    pub fn new(options: PatternOptions, capacity: usize) -> Self {
        PatternCompiler {
            options,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Options every pattern is compiled with
    pub fn options(&self) -> &PatternOptions {
        &self.options
    }

    /// Compile a glob, consulting the LRU first
    ///
    /// Failures are never cached.
    pub fn compile(&self, glob: &str) -> Result<Pattern> {
        let Some(cache) = &self.cache else {
            return Pattern::compile_with(glob, &self.options);
        };

        if let Some(hit) = cache.lock().get(glob) {
            return Ok(hit.clone());
        }

        let pattern = Pattern::compile_with(glob, &self.options)?;
        cache.lock().put(glob.to_string(), pattern.clone());
        Ok(pattern)
    }

    /// Number of compiled patterns currently retained
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().len())
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new(PatternOptions::default(), 0)
    }
}
