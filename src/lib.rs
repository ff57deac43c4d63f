pub mod config;
mod file_cleaner;
pub mod ops;

pub use config::CleanerSettings;
pub use file_cleaner::{
    standardize_path, AiAnalysis, AnalysisRequest, AuditLog, BatchSummary, CandidateItem,
    CleanerError, CleanupRule, CompiledPattern, FileScanner, HomeTrash, MatcherOptions,
    PatternKind, RecommendedAction, Result, RiskLevel, RuleMatch, RuleMatcher, RuleStore,
    ScanEvent, ScanOptions, ScanProgress, ScanState, ScanTask, ScannedItem, TrashBackend,
    TrashManager, TrashRecord,
};
pub use file_cleaner::{protection, rules};
pub use ops::{OperationKind, OperationRegistry, OperationStatus};
