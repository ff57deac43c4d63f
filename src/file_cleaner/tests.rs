#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::CleanerSettings;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn write_file(path: &Path, size: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        file.write_all(&vec![7u8; size]).unwrap();
    }

    fn age(path: &Path, days: u64) {
        let when = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
        File::open(path).unwrap().set_modified(when).unwrap();
    }

    fn scan_opts() -> ScanOptions {
        ScanOptions {
            skip_icloud_placeholders: true,
            require_local_volume: false,
        }
    }

    fn candidate(path: &Path, size: u64) -> CandidateItem {
        CandidateItem::from_scanned(
            ScannedItem {
                path: path.to_path_buf(),
                is_directory: path.is_dir(),
                size_bytes: size,
            },
            None,
            "test",
            Uuid::new_v4(),
        )
    }

    struct TrashFixture {
        dir: TempDir,
        manager: TrashManager,
    }

    impl TrashFixture {
        fn new(settings: CleanerSettings) -> Self {
            let dir = TempDir::new().unwrap();
            let audit = Arc::new(AuditLog::at(dir.path().join("data/audit.log")));
            let backend = Box::new(HomeTrash::at(dir.path().join(".Trash")));
            let manager = TrashManager::new(audit, backend, &settings);
            TrashFixture { dir, manager }
        }

        fn file(&self, relative: &str) -> PathBuf {
            let path = self.dir.path().join("work").join(relative);
            write_file(&path, 1024);
            path
        }

        fn trash_dir(&self) -> PathBuf {
            self.dir.path().join(".Trash")
        }
    }

    // Scanner

    #[test]
    fn test_scan_aggregates_per_top_level_child() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("a/one.bin"), 4096);
        write_file(&root.path().join("a/deep/two.bin"), 4096);
        write_file(&root.path().join("b.bin"), 1000);
        write_file(&root.path().join("empty.txt"), 0);

        let (items, progress) = FileScanner::new()
            .scan_collect(root.path(), &scan_opts(), &CancellationToken::new())
            .unwrap();

        assert_eq!(progress.counted_files, 3);
        let a = items.iter().find(|i| i.name() == "a").unwrap();
        let b = items.iter().find(|i| i.name() == "b.bin").unwrap();
        assert!(a.is_directory);
        assert!(!b.is_directory);
        assert!(a.size_bytes >= 8192);
        assert!(b.size_bytes >= 1000);
        assert_eq!(progress.counted_bytes, a.size_bytes + b.size_bytes);
        assert!(items.iter().all(|i| i.name() != "empty.txt"));
    }

    #[test]
    fn test_scan_streams_growing_aggregates() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("dir/x"), 100);
        write_file(&root.path().join("dir/y"), 100);

        let mut updates = Vec::new();
        FileScanner::new()
            .scan(
                root.path(),
                &scan_opts(),
                &CancellationToken::new(),
                |_| {},
                |item| updates.push(item),
            )
            .unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].path, updates[1].path);
        assert!(updates[1].size_bytes > updates[0].size_bytes);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_never_follows_symlinks() {
        let outside = TempDir::new().unwrap();
        write_file(&outside.path().join("big.bin"), 64 * 1024);
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("real/file.bin"), 10);
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let (items, progress) = FileScanner::new()
            .scan_collect(root.path(), &scan_opts(), &CancellationToken::new())
            .unwrap();

        assert_eq!(progress.counted_files, 1);
        assert!(items.iter().all(|i| i.name() != "link"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_counts_hard_links_once() {
        let root = TempDir::new().unwrap();
        let original = root.path().join("dir/data.bin");
        write_file(&original, 8192);
        fs::hard_link(&original, root.path().join("dir/alias.bin")).unwrap();

        let (_, progress) = FileScanner::new()
            .scan_collect(root.path(), &scan_opts(), &CancellationToken::new())
            .unwrap();
        assert_eq!(progress.counted_files, 1);
    }

    #[test]
    fn test_scan_skips_icloud_stubs() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("docs/.report.pdf.icloud"), 512);
        write_file(&root.path().join("docs/local.pdf"), 512);

        let (_, progress) = FileScanner::new()
            .scan_collect(root.path(), &scan_opts(), &CancellationToken::new())
            .unwrap();
        assert_eq!(progress.counted_files, 1);

        let opts = ScanOptions {
            skip_icloud_placeholders: false,
            ..scan_opts()
        };
        let (_, progress) = FileScanner::new()
            .scan_collect(root.path(), &opts, &CancellationToken::new())
            .unwrap();
        assert_eq!(progress.counted_files, 2);
    }

    #[test]
    fn test_scan_progress_cadence() {
        let root = TempDir::new().unwrap();
        for i in 0..600 {
            write_file(&root.path().join(format!("bulk/f{}", i)), 1);
        }

        let mut reports = Vec::new();
        FileScanner::new()
            .scan(
                root.path(),
                &scan_opts(),
                &CancellationToken::new(),
                |p| reports.push(p),
                |_| {},
            )
            .unwrap();

        // 601 entries: two interval reports plus the final one
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].visited_entries, 256);
        assert_eq!(reports[1].visited_entries, 512);
        assert_eq!(reports[2].visited_entries, 601);
        assert_eq!(reports[2].counted_files, 600);
    }

    #[test]
    fn test_scan_rejects_protected_and_missing_roots() {
        let scanner = FileScanner::new();
        let token = CancellationToken::new();
        assert!(matches!(
            scanner.scan_collect(Path::new("/System/Library"), &scan_opts(), &token),
            Err(CleanerError::PermissionDenied(_))
        ));
        assert!(matches!(
            scanner.scan_collect(Path::new("/tmp/../usr/lib"), &scan_opts(), &token),
            Err(CleanerError::PermissionDenied(_))
        ));
        let gone = TempDir::new().unwrap().path().join("nope");
        assert!(matches!(
            scanner.scan_collect(&gone, &scan_opts(), &token),
            Err(CleanerError::PermissionDenied(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_rejects_symlinked_protected_root() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("innocent");
        std::os::unix::fs::symlink("/usr", &link).unwrap();
        assert!(matches!(
            FileScanner::new().scan_collect(&link, &scan_opts(), &CancellationToken::new()),
            Err(CleanerError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_scan_honours_cancellation() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("a/b"), 10);
        let token = CancellationToken::new();
        token.cancel();

        let mut items = 0;
        let result = FileScanner::new().scan(root.path(), &scan_opts(), &token, |_| {}, |_| {
            items += 1
        });
        assert!(matches!(result, Err(CleanerError::ScanCancelled)));
        assert_eq!(items, 0);
    }

    #[test]
    fn test_scan_stops_mid_walk_when_cancelled() {
        let root = TempDir::new().unwrap();
        for i in 0..10 {
            write_file(&root.path().join(format!("dir{}/file.bin", i)), 10);
        }
        let token = CancellationToken::new();

        let mut items = 0;
        let result = FileScanner::new().scan(root.path(), &scan_opts(), &token, |_| {}, |_| {
            items += 1;
            token.cancel();
        });
        assert!(matches!(result, Err(CleanerError::ScanCancelled)));
        assert_eq!(items, 1);
    }

    #[tokio::test]
    async fn test_background_scan_streams_and_finishes() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("a/1"), 10);
        write_file(&root.path().join("b/2"), 10);

        let mut task =
            FileScanner::spawn(root.path().to_path_buf(), scan_opts(), CancellationToken::new());
        let mut items = 0;
        let mut last_progress = None;
        while let Some(event) = task.next_event().await {
            match event {
                ScanEvent::Item(_) => items += 1,
                ScanEvent::Progress(p) => last_progress = Some(p),
            }
        }
        assert_eq!(task.state(), ScanState::Finished);
        task.join().await.unwrap();
        assert_eq!(items, 2);
        assert_eq!(last_progress.unwrap().counted_files, 2);
    }

    #[tokio::test]
    async fn test_background_scan_cancelled_state() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("a/1"), 10);
        let token = CancellationToken::new();
        token.cancel();

        let mut task = FileScanner::spawn(root.path().to_path_buf(), scan_opts(), token);
        while task.next_event().await.is_some() {}
        assert_eq!(task.state(), ScanState::Cancelled);
        assert!(matches!(task.join().await, Err(CleanerError::ScanCancelled)));
    }

    // Rule matching

    #[test]
    fn test_node_modules_activity_from_lockfile() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("app");
        fs::create_dir_all(project.join("node_modules")).unwrap();
        write_file(&project.join("package-lock.json"), 10);

        let matcher = RuleMatcher::with_builtins(MatcherOptions::default());
        let target = project.join("node_modules");
        let m = matcher.match_path(&target.to_string_lossy()).unwrap();
        assert_eq!(m.rule.id, "node_modules");
        assert!(m.is_active_project);
        assert_eq!(
            m.note.as_deref(),
            Some("Project seems active (<30d); treat as needs-review.")
        );

        age(&project.join("package-lock.json"), 90);
        let m = matcher.match_path(&target.to_string_lossy()).unwrap();
        assert!(!m.is_active_project);
        assert!(m.note.is_none());
    }

    #[test]
    fn test_node_modules_without_markers_is_inactive() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("lib/node_modules");
        fs::create_dir_all(&target).unwrap();

        let matcher = RuleMatcher::with_builtins(MatcherOptions::default());
        let m = matcher.match_path(&target.to_string_lossy()).unwrap();
        assert!(!m.is_active_project);
        assert_eq!(m.rule.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_derived_data_activity_uses_own_mtime() {
        let tmp = TempDir::new().unwrap();
        let derived = tmp.path().join("Library/Developer/Xcode/DerivedData");
        fs::create_dir_all(&derived).unwrap();

        let matcher = RuleMatcher::with_builtins(MatcherOptions::default());
        let m = matcher.match_path(&derived.to_string_lossy()).unwrap();
        assert_eq!(m.rule.id, "xcode.deriveddata");
        assert!(m.is_active_project);

        age(&derived, 45);
        assert!(!matcher.match_path(&derived.to_string_lossy()).unwrap().is_active_project);

        let wide = RuleMatcher::with_builtins(MatcherOptions {
            active_project_days: 60,
            ..MatcherOptions::default()
        });
        assert!(wide.match_path(&derived.to_string_lossy()).unwrap().is_active_project);
    }

    #[test]
    fn test_specific_rule_beats_generic() {
        let matcher = RuleMatcher::with_builtins(MatcherOptions::default());
        let m = matcher
            .match_path("/Users/dev/Library/Caches/Homebrew/downloads/x.tar.gz")
            .unwrap();
        assert_eq!(m.rule.id, "homebrew.cache");

        let m = matcher.match_path("/Users/dev/Library/Caches/com.example").unwrap();
        assert_eq!(m.rule.id, "user.caches");
        assert!(matcher.match_path("/Users/dev/Documents/thesis.tex").is_none());
    }

    #[test]
    fn test_priority_ties_keep_declaration_order() {
        let rules = vec![
            CleanupRule::glob("first", "First", "**/build", RiskLevel::Low, 100),
            CleanupRule::glob("second", "Second", "**/build", RiskLevel::High, 100),
            CleanupRule::regex("lower", "Lower", "^.*/build$", RiskLevel::Low, 99),
        ];
        let matcher = RuleMatcher::new(rules, MatcherOptions::default());
        assert_eq!(matcher.match_path("/src/build").unwrap().rule.id, "first");
    }

    #[test]
    fn test_denylist_dominates_allowlist_and_rules() {
        let matcher = RuleMatcher::with_builtins(MatcherOptions {
            denylist_patterns: vec!["**/Library/Caches/Keep*".into()],
            allowlist_patterns: vec!["**/Library/Caches/*".into(), "**/scratch".into()],
            ..MatcherOptions::default()
        });

        assert!(matcher.match_path("/Users/dev/Library/Caches/KeepMe").is_none());

        let m = matcher.match_path("/Users/dev/Library/Caches/Homebrew").unwrap();
        assert_eq!(m.rule.id, "user.allowlist");
        assert_eq!(m.rule.risk_level, RiskLevel::Low);
        assert_eq!(m.note.as_deref(), Some("Matched user allowlist"));

        // allowlist also covers paths no rule knows about
        let m = matcher.match_path("/Users/dev/scratch").unwrap();
        assert_eq!(m.rule.id, "user.allowlist");
    }

    #[test]
    fn test_invalid_user_patterns_never_match() {
        let matcher = RuleMatcher::new(
            vec![CleanupRule::regex("bad", "Bad", "([unclosed", RiskLevel::Low, 1000).user_defined()],
            MatcherOptions {
                denylist_patterns: vec!["".into(), "   ".into()],
                ..MatcherOptions::default()
            },
        );
        assert!(matcher.match_path("/anything").is_none());
    }

    #[test]
    fn test_candidate_request_and_effective_risk() {
        let matcher = RuleMatcher::with_builtins(MatcherOptions::default());
        let path = PathBuf::from("/Users/dev/.npm");
        let rule_match = matcher.match_path(&path.to_string_lossy());
        let mut item = CandidateItem::from_scanned(
            ScannedItem {
                path,
                is_directory: true,
                size_bytes: 42,
            },
            rule_match,
            "dev",
            Uuid::new_v4(),
        );

        let request = item.analysis_request();
        assert_eq!(request.matched_rule_id.as_deref(), Some("npm_cache"));
        assert_eq!(request.is_active_project, Some(false));
        assert_eq!(item.effective_risk_level(), Some(RiskLevel::Low));

        item.ai_analysis = Some(AiAnalysis {
            summary: "Shared cache".into(),
            recommended_action: RecommendedAction::Review,
            risk_level: RiskLevel::High,
            reasons: vec![],
            warnings: vec![],
            confidence: 0.7,
        });
        assert_eq!(item.effective_risk_level(), Some(RiskLevel::High));
        assert_eq!(item.name(), ".npm");
    }

    // Rule store

    #[test]
    fn test_rule_store_guards_builtins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_rules.json");
        let mut store = RuleStore::load(&path).unwrap();
        assert!(store.user_rules().is_empty());

        let builtin_copy = CleanupRule::glob("mine", "Mine", "**/tmp", RiskLevel::Low, 1000);
        assert!(matches!(
            store.add_user_rule(builtin_copy),
            Err(CleanerError::CannotModifyBuiltIn(_))
        ));
        let shadow = CleanupRule::glob("node_modules", "Mine", "**/nm", RiskLevel::Low, 1000)
            .user_defined();
        assert!(matches!(
            store.add_user_rule(shadow),
            Err(CleanerError::DuplicateRuleId(_))
        ));
        assert!(matches!(
            store.delete_user_rule("node_modules"),
            Err(CleanerError::CannotModifyBuiltIn(_))
        ));
        assert!(matches!(
            store.delete_user_rule("missing"),
            Err(CleanerError::RuleNotFound(_))
        ));
    }

    #[test]
    fn test_rule_store_persists_user_rules() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rules/user_rules.json");
        let mut store = RuleStore::load(&path).unwrap();
        let rule =
            CleanupRule::glob("user.build", "Build dirs", "**/build", RiskLevel::Medium, 1000)
                .user_defined();
        store.add_user_rule(rule.clone()).unwrap();
        assert!(matches!(
            store.add_user_rule(rule.clone()),
            Err(CleanerError::DuplicateRuleId(_))
        ));

        let reloaded = RuleStore::load(&path).unwrap();
        assert_eq!(reloaded.user_rules(), &[rule]);
        let m = reloaded
            .matcher(MatcherOptions::default())
            .match_path("/code/app/build")
            .unwrap();
        assert_eq!(m.rule.id, "user.build");

        let mut reloaded = reloaded;
        reloaded.delete_user_rule("user.build").unwrap();
        assert!(RuleStore::load(&path).unwrap().user_rules().is_empty());
    }

    // Audit log

    fn record(path: &str) -> TrashRecord {
        let item = candidate(Path::new(path), 10);
        TrashRecord::for_candidate(&item, true).succeeded(None)
    }

    #[test]
    fn test_audit_reads_newest_first() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::at(tmp.path().join("nested/audit.log"));
        assert!(log.read_recent(10).is_empty());

        for name in ["/a", "/b", "/c"] {
            log.append(&record(name)).unwrap();
        }
        let recent: Vec<String> = log
            .read_recent(2)
            .into_iter()
            .map(|r| r.original_path)
            .collect();
        assert_eq!(recent, vec!["/c".to_string(), "/b".to_string()]);
        assert_eq!(log.read_recent(0).len(), 0);
    }

    #[test]
    fn test_audit_survives_torn_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("audit.log");
        let log = AuditLog::at(&path);
        log.append(&record("/first")).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{\"id\": \"trunc")
            .unwrap();
        log.append(&record("/second")).unwrap();

        let recent = log.read_recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].original_path, "/second");
        assert_eq!(recent[1].original_path, "/first");
    }

    #[test]
    fn test_audit_record_wire_format() {
        let value = serde_json::to_value(record("/x")).unwrap();
        for key in [
            "id",
            "timestamp",
            "originalPath",
            "trashedPath",
            "sizeBytes",
            "decisionSource",
            "matchedRuleId",
            "aiRecommendedAction",
            "dryRun",
            "success",
            "errorMessage",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["decisionSource"], "manual");
    }

    // Trash manager

    #[tokio::test]
    async fn test_dry_run_leaves_files_in_place() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let file = fx.file("cache.bin");

        let records = fx
            .manager
            .trash(&[candidate(&file, 1024)], true, &CancellationToken::new())
            .await;

        assert_eq!(records.len(), 1);
        assert!(records[0].success && records[0].dry_run);
        assert!(records[0].trashed_path.is_none());
        assert!(file.exists());
        assert_eq!(fx.manager.recent_audit(5), records);
        assert!(fx.manager.undo_last_batch().await.is_empty());
    }

    #[tokio::test]
    async fn test_persisted_dry_run_overrides_caller() {
        let fx = TrashFixture::new(CleanerSettings {
            dry_run: true,
            ..CleanerSettings::default()
        });
        let file = fx.file("keep.bin");
        let records = fx
            .manager
            .trash(&[candidate(&file, 1024)], false, &CancellationToken::new())
            .await;
        assert!(records[0].dry_run);
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_protected_and_missing_items_fail_without_stopping_batch() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let good = fx.file("ok.bin");
        let missing = fx.dir.path().join("work/not-there.bin");
        let items = vec![
            candidate(Path::new("/System/Library/Caches"), 1),
            candidate(&missing, 1),
            candidate(&good, 1024),
        ];

        let records = fx
            .manager
            .trash(&items, false, &CancellationToken::new())
            .await;

        assert_eq!(records.len(), 3);
        assert!(!records[0].success);
        assert_eq!(records[0].error_message.as_deref(), Some("Protected system path"));
        assert!(!records[1].success);
        assert!(records[1].error_message.is_some());
        assert!(records[2].success);
        assert!(!good.exists());

        let summary = BatchSummary::from_records(&records);
        assert_eq!((summary.total, summary.succeeded, summary.failed), (3, 1, 2));
        assert_eq!(summary.bytes, 1024);
        assert!(!summary.dry_run);
        assert_eq!(fx.manager.recent_audit(10).len(), 3);
    }

    #[tokio::test]
    async fn test_undo_restores_last_batch_once() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let a = fx.file("a/log.txt");
        let b = fx.file("b/log.txt");

        let records = fx
            .manager
            .trash(
                &[candidate(&a, 1024), candidate(&b, 1024)],
                false,
                &CancellationToken::new(),
            )
            .await;
        assert!(records.iter().all(|r| r.success));
        assert!(!a.exists() && !b.exists());
        let trashed: Vec<PathBuf> = records
            .iter()
            .map(|r| PathBuf::from(r.trashed_path.clone().unwrap()))
            .collect();
        assert!(trashed.iter().all(|p| p.starts_with(fx.trash_dir()) && p.exists()));
        assert_ne!(trashed[0], trashed[1]);

        let undone = fx.manager.undo_last_batch().await;
        assert_eq!(undone.len(), 2);
        assert!(undone.iter().all(|r| r.success && r.is_undo()));
        assert!(a.exists() && b.exists());

        assert!(fx.manager.undo_last_batch().await.is_empty());
        let audit = fx.manager.recent_audit(10);
        assert_eq!(audit.len(), 4);
        assert!(audit[0].is_undo());
    }

    #[tokio::test]
    async fn test_undo_skips_reoccupied_paths_until_cleared() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let file = fx.file("report.log");
        let records = fx
            .manager
            .trash(&[candidate(&file, 1024)], false, &CancellationToken::new())
            .await;
        let trashed = PathBuf::from(records[0].trashed_path.clone().unwrap());

        fs::write(&file, b"new contents").unwrap();
        let undone = fx.manager.undo_last_batch().await;

        assert!(undone.is_empty());
        assert_eq!(fs::read(&file).unwrap(), b"new contents");
        assert!(trashed.exists());

        // once the conflict is gone the skipped item can still be restored
        fs::remove_file(&file).unwrap();
        let undone = fx.manager.undo_last_batch().await;
        assert_eq!(undone.len(), 1);
        assert!(undone[0].success);
        assert_eq!(fs::read(&file).unwrap(), vec![7u8; 1024]);
        assert!(!trashed.exists());
        assert!(fx.manager.undo_last_batch().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_batch_processes_nothing() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let file = fx.file("x.bin");
        let token = CancellationToken::new();
        token.cancel();

        let records = fx.manager.trash(&[candidate(&file, 1)], false, &token).await;
        assert!(records.is_empty());
        assert!(file.exists());
        assert!(fx.manager.recent_audit(10).is_empty());
    }

    struct CancelAfterFirstMove {
        inner: HomeTrash,
        token: CancellationToken,
    }

    impl TrashBackend for CancelAfterFirstMove {
        fn move_to_trash(&self, path: &Path) -> std::io::Result<PathBuf> {
            let moved = self.inner.move_to_trash(path);
            self.token.cancel();
            moved
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_partial_records() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let files = [fx.file("one.bin"), fx.file("two.bin"), fx.file("three.bin")];
        let items: Vec<CandidateItem> = files.iter().map(|f| candidate(f, 1024)).collect();

        let token = CancellationToken::new();
        let audit = Arc::new(AuditLog::at(fx.dir.path().join("data/audit.log")));
        let backend = Box::new(CancelAfterFirstMove {
            inner: HomeTrash::at(fx.trash_dir()),
            token: token.clone(),
        });
        let manager = TrashManager::new(audit, backend, &CleanerSettings::default());

        let records = manager.trash(&items, false, &token).await;

        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert!(!files[0].exists());
        assert!(files[1].exists() && files[2].exists());
        assert_eq!(manager.recent_audit(10), records);

        let undone = manager.undo_last_batch().await;
        assert_eq!(undone.len(), 1);
        assert!(files[0].exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_into_protected_areas_are_refused() {
        let fx = TrashFixture::new(CleanerSettings::default());
        let work = fx.dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let direct = work.join("tools");
        let parent = work.join("sys");
        std::os::unix::fs::symlink("/usr/bin", &direct).unwrap();
        std::os::unix::fs::symlink("/usr", &parent).unwrap();
        let items = vec![candidate(&direct, 1), candidate(&parent.join("bin"), 1)];

        let records = fx
            .manager
            .trash(&items, false, &CancellationToken::new())
            .await;

        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(!record.success);
            assert_eq!(record.error_message.as_deref(), Some("Protected system path"));
            assert!(record.trashed_path.is_none());
        }
        assert!(fs::symlink_metadata(&direct).unwrap().file_type().is_symlink());
        assert!(fs::symlink_metadata(&parent).unwrap().file_type().is_symlink());
        assert!(Path::new("/usr/bin").is_dir());
        assert!(fs::read_dir(fx.trash_dir()).map_or(true, |mut d| d.next().is_none()));
    }

    #[test]
    fn test_audit_instances_on_one_file_append_serially() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("audit.log");
        let writers: Vec<Arc<AuditLog>> = (0..2).map(|_| Arc::new(AuditLog::at(&path))).collect();

        let handles: Vec<_> = writers
            .iter()
            .enumerate()
            .map(|(n, log)| {
                let log = Arc::clone(log);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.append(&record(&format!("/w{}/{}", n, i))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 200);
        assert_eq!(writers[0].read_recent(1000).len(), 200);
    }

    #[test]
    fn test_ai_analysis_reads_snake_case_verdicts() {
        let raw = r#"{
            "summary": "Regenerable build output",
            "recommended_action": "delete",
            "risk_level": "low",
            "reasons": ["Rebuilt on next compile"],
            "confidence": 0.9
        }"#;
        let analysis: AiAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(analysis.recommended_action, RecommendedAction::Delete);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.warnings.is_empty());
    }
}
