//! Restricted glob syntax compiled to anchored regular expressions.
//!
//! - `**` matches across directories
//! - `*` matches within one path segment
//! - `?` matches one character other than `/`
//!
//! Every compiled pattern also matches anything beneath the matched path,
//! so `**/node_modules` covers the directory and all of its descendants.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;
use log::warn;
use lru::LruCache;
use regex::{Regex, RegexBuilder};

use super::model::PatternKind;
use crate::file_cleaner::errors::{CleanerError, Result};

pub const MAX_PATTERN_LENGTH: usize = 256;
pub const MAX_GLOBSTARS: usize = 5;
pub const MAX_SEPARATOR_DEPTH: usize = 50;
const REGEX_SIZE_LIMIT: usize = 1 << 20;
const PATTERN_CACHE_CAPACITY: usize = 512;

type CacheKey = (PatternKind, String);
type CacheValue = std::result::Result<CompiledPattern, String>;

lazy_static! {
    static ref PATTERN_CACHE: Mutex<LruCache<CacheKey, CacheValue>> = Mutex::new(LruCache::new(
        NonZeroUsize::new(PATTERN_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
    ));
}

/// A compiled glob or regex, ready to test standardized paths.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as written by the rule author.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn as_regex(&self) -> &str {
        self.regex.as_str()
    }
}

/// Translate a glob into regex source, enforcing the length and globstar limits.
pub fn glob_to_regex(glob: &str) -> Result<String> {
    if glob.chars().count() > MAX_PATTERN_LENGTH {
        return Err(CleanerError::InvalidPattern {
            pattern: truncate_for_log(glob),
            reason: format!("longer than {} characters", MAX_PATTERN_LENGTH),
        });
    }
    let globstars = glob.matches("**").count();
    if globstars > MAX_GLOBSTARS {
        return Err(CleanerError::InvalidPattern {
            pattern: glob.to_string(),
            reason: format!("{} `**` segments (max {})", globstars, MAX_GLOBSTARS),
        });
    }

    let mut out = String::with_capacity(glob.len() * 2 + 8);
    out.push('^');

    let chars: Vec<char> = glob.chars().collect();
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '/' => {
                depth += 1;
                if depth > MAX_SEPARATOR_DEPTH {
                    // too deep: accept anything below this point instead of failing
                    out.push_str("/.*");
                    break;
                }
                out.push('/');
                i += 1;
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    out.push_str("(/.*)?$");
    Ok(out)
}

/// Compile a glob. Results (including rejections) are memoised.
pub fn compile_glob(pattern: &str) -> Result<CompiledPattern> {
    cached(PatternKind::Glob, pattern, || {
        let source = glob_to_regex(pattern)?;
        build(pattern, &source)
    })
}

/// Compile a raw regex rule pattern (unanchored, first-match semantics).
pub fn compile_regex(pattern: &str) -> Result<CompiledPattern> {
    cached(PatternKind::Regex, pattern, || build(pattern, pattern))
}

pub(crate) fn compile(kind: PatternKind, pattern: &str) -> Result<CompiledPattern> {
    match kind {
        PatternKind::Glob => compile_glob(pattern),
        PatternKind::Regex => compile_regex(pattern),
    }
}

fn build(pattern: &str, source: &str) -> Result<CompiledPattern> {
    let regex = RegexBuilder::new(source)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| CleanerError::InvalidPattern {
            pattern: truncate_for_log(pattern),
            reason: e.to_string(),
        })?;
    Ok(CompiledPattern {
        source: pattern.to_string(),
        regex,
    })
}

fn cached<F>(kind: PatternKind, pattern: &str, compile: F) -> Result<CompiledPattern>
where
    F: FnOnce() -> Result<CompiledPattern>,
{
    let key = (kind, pattern.to_string());
    if let Some(hit) = lock_cache().get(&key) {
        return hit.clone().map_err(|reason| CleanerError::InvalidPattern {
            pattern: truncate_for_log(pattern),
            reason,
        });
    }

    let result = compile();
    let stored = match &result {
        Ok(compiled) => Ok(compiled.clone()),
        Err(CleanerError::InvalidPattern { reason, .. }) => {
            warn!(target: "rule_engine", "Ignoring {:?} pattern: {}", kind, reason);
            Err(reason.clone())
        }
        Err(other) => Err(other.to_string()),
    };
    lock_cache().put(key, stored);
    result
}

fn lock_cache() -> MutexGuard<'static, LruCache<CacheKey, CacheValue>> {
    PATTERN_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn truncate_for_log(pattern: &str) -> String {
    if pattern.chars().count() <= 64 {
        pattern.to_string()
    } else {
        let head: String = pattern.chars().take(64).collect();
        format!("{}…", head)
    }
}
