//! Integration tests for fhcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    /// Isolated environment: its own cache root and config file
    struct Env {
        dir: TempDir,
    }

    impl Env {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("fhcache");
            cmd.env_remove("RUST_LOG")
                .arg("--cache-root")
                .arg(self.dir.path().join("cache"))
                .arg("--config")
                .arg(self.dir.path().join("config.toml"));
            cmd
        }

        fn file(&self, name: &str, content: &str) -> String {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path.to_str().unwrap().to_string()
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("fhcache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("local file handle cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("fhcache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fhcache"));
    }

    #[test]
    fn path_uses_bucket_layout() {
        let env = Env::new();
        let expected = env.dir.path().join("cache").join("949").join("59949");
        env.cmd()
            .args(["path", "59949"])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected.to_str().unwrap()));
    }

    #[test]
    fn list_empty() {
        let env = Env::new();
        env.cmd()
            .args(["list", "42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No unmodified copies cached"));
    }

    #[test]
    fn register_then_list() {
        let env = Env::new();
        let file = env.file("a.txt", "content");

        env.cmd()
            .args(["register", "42", &file])
            .assert()
            .success()
            .stdout(predicate::str::contains("Registered"));

        env.cmd()
            .args(["list", "42", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(file.as_str()));
    }

    #[test]
    fn register_missing_file_fails() {
        let env = Env::new();
        let missing = env.dir.path().join("missing.txt");
        env.cmd()
            .arg("register")
            .arg("42")
            .arg(&missing)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Can't find file"));
    }

    #[test]
    fn remove_with_delete_file() {
        let env = Env::new();
        let file = env.file("a.txt", "content");

        env.cmd().args(["register", "42", &file]).assert().success();
        env.cmd()
            .args(["remove", "42", "--delete-file"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 registration(s)"));

        assert!(!std::path::Path::new(&file).exists());
        let map = fs::read_to_string(env.dir.path().join("cache/42/42/.cacheMap")).unwrap();
        assert_eq!(map, "{}\n");
    }

    #[test]
    fn purge_dry_run_keeps_everything() {
        let env = Env::new();
        let file = env.file("a.txt", "content");
        env.cmd().args(["register", "7", &file]).assert().success();

        env.cmd()
            .args(["purge", "--before", "2999-01-01T00:00:00.000Z", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains(file.as_str()));

        assert!(std::path::Path::new(&file).exists());
        env.cmd()
            .args(["list", "7", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(file.as_str()));
    }

    #[test]
    fn purge_rejects_bad_cutoff() {
        let env = Env::new();
        env.cmd()
            .args(["purge", "--before", "yesterday"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid argument"));
    }

    #[test]
    fn purge_days_out_of_range_is_an_error() {
        let env = Env::new();
        env.cmd()
            .args(["purge", "--days", "4294967295"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("out of range"));
    }

    #[test]
    fn digest_md5() {
        let env = Env::new();
        let file = env.file("hello.txt", "hello world");
        env.cmd()
            .args(["digest", &file])
            .assert()
            .success()
            .stdout(predicate::str::contains("5eb63bbbe01eeed093cb22bb8f5acdc3"));
    }

    #[test]
    fn config_path() {
        let env = Env::new();
        env.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let env = Env::new();
        env.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[lock]"));
    }

    #[test]
    fn config_set_then_show() {
        let env = Env::new();
        env.cmd()
            .args(["config", "set", "lock.max_age_secs", "42"])
            .assert()
            .success();
        env.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("max_age_secs = 42"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let env = Env::new();
        env.cmd()
            .args(["config", "set", "cache.colour", "blue"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown configuration key"));
    }
}

mod cache_tests {
    use chrono::{TimeZone, Utc};
    use filetime::{set_file_mtime, FileTime};
    use fhcache::cache::LockSettings;
    use fhcache::path::{modified_time_iso, normalize_path};
    use fhcache::Cache;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_cache(dir: &TempDir) -> Cache {
        Cache::new(dir.path().join("cache")).with_lock_settings(LockSettings {
            poll_interval: Duration::from_millis(10),
            blocking_timeout: Duration::from_secs(10),
            ..LockSettings::default()
        })
    }

    fn write_file(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn register_writes_map_file() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let file = write_file(&dir, "a.txt");

        cache.register(42, &file).unwrap();

        let raw = fs::read_to_string(cache.cache_dir(42).join(".cacheMap")).unwrap();
        let expected = format!(
            "{{\"{}\":\"{}\"}}\n",
            normalize_path(&file).unwrap(),
            modified_time_iso(&file).unwrap()
        );
        assert_eq!(raw, expected);
        assert!(!cache.cache_dir(42).join(".cacheMap.lock").exists());
    }

    #[test]
    fn modified_file_drops_out_of_list() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let a = write_file(&dir, "a.txt");
        let b = write_file(&dir, "b.txt");

        cache.register(5, &a).unwrap();
        cache.register(5, &b).unwrap();
        assert_eq!(cache.list_unmodified_paths(5).unwrap().len(), 2);

        set_file_mtime(&b, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
        assert_eq!(
            cache.list_unmodified_paths(5).unwrap(),
            vec![normalize_path(&a).unwrap()]
        );
        assert!(!cache.is_unmodified(5, &b).unwrap());
    }

    #[test]
    fn ids_in_same_bucket_are_independent() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let a = write_file(&dir, "a.txt");
        let b = write_file(&dir, "b.txt");

        cache.register(1001, &a).unwrap();
        cache.register(2001, &b).unwrap();

        assert_eq!(
            cache.cache_dir(1001).parent(),
            cache.cache_dir(2001).parent()
        );
        assert_eq!(
            cache.list_unmodified_paths(1001).unwrap(),
            vec![normalize_path(&a).unwrap()]
        );
        assert_eq!(
            cache.list_unmodified_paths(2001).unwrap(),
            vec![normalize_path(&b).unwrap()]
        );
    }

    #[test]
    fn purge_removes_old_and_keeps_new() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let old = write_file(&dir, "old.txt");
        let new = write_file(&dir, "new.txt");
        set_file_mtime(&old, FileTime::from_unix_time(946_684_800, 0)).unwrap();

        cache.register(10, &old).unwrap();
        cache.register(11, &new).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        let removed = cache.purge(cutoff, false).unwrap();

        assert_eq!(removed, vec![normalize_path(&old).unwrap()]);
        assert!(!old.exists());
        assert!(!cache.cache_dir(10).exists());
        assert!(new.exists());
        assert_eq!(cache.list_unmodified_paths(11).unwrap().len(), 1);
    }

    #[test]
    fn purge_dry_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let old = write_file(&dir, "old.txt");
        set_file_mtime(&old, FileTime::from_unix_time(946_684_800, 0)).unwrap();
        cache.register(10, &old).unwrap();

        let map_before = fs::read_to_string(cache.cache_dir(10).join(".cacheMap")).unwrap();
        let removed = cache.purge(Utc::now(), true).unwrap();

        assert_eq!(removed.len(), 1);
        assert!(old.exists());
        let map_after = fs::read_to_string(cache.cache_dir(10).join(".cacheMap")).unwrap();
        assert_eq!(map_before, map_after);
    }

    #[test]
    fn concurrent_registrations_are_all_recorded() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let files: Vec<_> = (0..8)
            .map(|i| write_file(&dir, &format!("file{i}.txt")))
            .collect();

        std::thread::scope(|scope| {
            for file in &files {
                let cache = cache.clone();
                scope.spawn(move || cache.register(99, Path::new(file)).unwrap());
            }
        });

        assert_eq!(cache.list_unmodified_paths(99).unwrap().len(), files.len());
    }
}

mod lock_tests {
    use fhcache::Lock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn mutual_exclusion_across_threads() {
        const THREADS: usize = 6;
        const ROUNDS: usize = 5;

        let dir = TempDir::new().unwrap();
        let holders = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let log = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for t in 0..THREADS {
                let (dir, holders, max_seen, log) = (dir.path(), &holders, &max_seen, &log);
                scope.spawn(move || {
                    let mut lock = Lock::new("shared", dir)
                        .with_poll_interval(Duration::from_millis(5))
                        .with_default_blocking_timeout(Duration::from_secs(30));
                    for round in 0..ROUNDS {
                        let guard = lock.lock().unwrap();
                        let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        log.lock().unwrap().push((t, round));
                        thread::sleep(Duration::from_millis(2));
                        holders.fetch_sub(1, Ordering::SeqCst);
                        guard.unlock().unwrap();
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        let log = log.into_inner().unwrap();
        assert_eq!(log.len(), THREADS * ROUNDS);
        for t in 0..THREADS {
            let rounds: Vec<usize> = log.iter().filter(|(id, _)| *id == t).map(|(_, r)| *r).collect();
            assert_eq!(rounds, (0..ROUNDS).collect::<Vec<_>>());
        }
        assert!(!dir.path().join("shared.lock").exists());
    }
}
