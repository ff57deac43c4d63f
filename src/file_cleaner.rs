mod errors;
pub mod protection;
pub mod rules;
mod scanner;
mod trash;
pub mod types;
mod volume;

#[cfg(test)]
mod tests;

pub use errors::{CleanerError, Result};
pub use protection::standardize_path;
pub use rules::{
    CleanupRule, CompiledPattern, MatcherOptions, PatternKind, RiskLevel, RuleMatch, RuleMatcher,
    RuleStore,
};
pub use scanner::{FileScanner, ScanEvent, ScanOptions, ScanState, ScanTask};
pub use trash::{AuditLog, BatchSummary, HomeTrash, TrashBackend, TrashManager, TrashRecord};
pub use types::{
    AiAnalysis, AnalysisRequest, CandidateItem, RecommendedAction, ScanProgress, ScannedItem,
};
