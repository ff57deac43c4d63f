mod builtin;
mod glob;
mod matcher;
mod model;
mod store;

pub use builtin::builtin_rules;
pub use glob::{compile_glob, compile_regex, glob_to_regex, CompiledPattern};
pub use matcher::{MatcherOptions, RuleMatcher, ALLOWLIST_RULE_ID};
pub use model::{CleanupRule, PatternKind, RiskLevel, RuleMatch};
pub use store::RuleStore;
