//! 配置缓存集成测试
//!
//! 使用当前平台的真实目录监控器，验证扫描与事件流的最终一致性

use confwatch::{ConfigCache, FileLoader, KeyValueLoader, LoadError, ParsedFile, PlatformWatcher};
use serial_test::serial;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// 在超时前反复检查条件
fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// 先写临时文件再重命名，读者不会看到写了一半的内容
fn write_atomic(dir: &Path, name: &str, content: &str) {
    let tmp = dir.join(format!(".{name}.tmp"));
    fs::write(&tmp, content).unwrap();
    fs::rename(&tmp, dir.join(name)).unwrap();
}

fn setup_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("example"),
        "debug=on\nport = 8080\n\n# comment-like line without '=' is skipped\n",
    )
    .unwrap();
    fs::write(dir.path().join("b"), "k = b1\n").unwrap();
    dir
}

#[test]
#[serial]
fn test_initial_scan_without_events() {
    let dir = setup_dir();
    let cache = ConfigCache::new();

    assert!(cache.watch_directory(dir.path()));
    assert_eq!(cache.load("example", "debug"), "on");
    assert_eq!(cache.load("example", "port"), "8080");
    assert_eq!(cache.load("example", "missing"), "");
    assert_eq!(cache.load("b", "k"), "b1");
}

#[test]
#[serial]
fn test_subdirectories_are_not_cached() {
    let dir = setup_dir();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("inner"), "k=v\n").unwrap();

    let cache = ConfigCache::new();
    assert!(cache.watch_directory(dir.path()));
    assert_eq!(cache.files(), vec!["b".to_string(), "example".to_string()]);
}

#[test]
#[serial]
fn test_new_file_becomes_visible() {
    let dir = setup_dir();
    let cache = ConfigCache::new();
    assert!(cache.watch_directory(dir.path()));

    fs::write(dir.path().join("c"), "k=c1\n").unwrap();
    assert!(eventually(|| cache.load("c", "k") == "c1"));
}

#[test]
#[serial]
fn test_modified_file_is_reloaded() {
    let dir = setup_dir();
    let cache = ConfigCache::new();
    assert!(cache.watch_directory(dir.path()));

    write_atomic(dir.path(), "example", "debug=off\n");
    assert!(eventually(|| cache.load("example", "debug") == "off"));
    // 整体重载，旧键不再存在
    assert_eq!(cache.load("example", "port"), "");
}

#[test]
#[serial]
fn test_deleted_file_is_evicted() {
    let dir = setup_dir();
    let cache = ConfigCache::new();
    assert!(cache.watch_directory(dir.path()));

    fs::remove_file(dir.path().join("b")).unwrap();
    assert!(eventually(|| cache.load("b", "k").is_empty()));
    assert!(cache.snapshot("b").is_none());
}

#[test]
#[serial]
fn test_rename_moves_entry() {
    let dir = setup_dir();
    let cache = ConfigCache::new();
    assert!(cache.watch_directory(dir.path()));

    fs::rename(dir.path().join("b"), dir.path().join("renamed")).unwrap();
    assert!(eventually(|| {
        cache.load("renamed", "k") == "b1" && cache.load("b", "k").is_empty()
    }));
}

#[test]
#[serial]
fn test_second_watch_is_rejected() {
    let dir = setup_dir();
    let other = TempDir::new().unwrap();
    let cache = ConfigCache::new();

    assert!(cache.watch_directory(dir.path()));
    assert!(!cache.watch_directory(other.path()));
    assert_eq!(cache.watched_directory().as_deref(), Some(dir.path()));

    // 原有监控仍然生效
    fs::write(dir.path().join("late"), "k=still-watching\n").unwrap();
    assert!(eventually(|| cache.load("late", "k") == "still-watching"));
}

#[test]
#[serial]
fn test_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let cache = ConfigCache::new();

    assert!(!cache.watch_directory(dir.path().join("missing")));
    assert!(!cache.is_watching());
    assert_eq!(cache.load("anything", "k"), "");
}

#[test]
#[serial]
fn test_readers_observe_only_written_values() {
    let dir = setup_dir();
    write_atomic(dir.path(), "a", "k=v1\n");

    let cache = Arc::new(ConfigCache::new());
    assert!(cache.watch_directory(dir.path()));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let deadline = Instant::now() + Duration::from_millis(500);
                while Instant::now() < deadline {
                    let value = cache.load("a", "k");
                    assert!(value == "v1" || value == "v2", "unexpected value {value:?}");
                }
            })
        })
        .collect();

    write_atomic(dir.path(), "a", "k=v2\n");

    for reader in readers {
        reader.join().unwrap();
    }
    assert!(eventually(|| cache.load("a", "k") == "v2"));
}

/// 记录读取次数的加载器
struct CountingLoader {
    loads: Arc<AtomicUsize>,
}

impl FileLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<ParsedFile, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        KeyValueLoader.load(path)
    }
}

#[test]
#[serial]
fn test_drop_stops_watching() {
    let dir = setup_dir();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader {
        loads: Arc::clone(&loads),
    };
    let cache = ConfigCache::with_parts(loader, PlatformWatcher::default());
    assert!(cache.watch_directory(dir.path()));

    fs::write(dir.path().join("before-drop"), "k=v\n").unwrap();
    assert!(eventually(|| cache.load("before-drop", "k") == "v"));

    // 等待写入产生的事件全部处理完
    thread::sleep(Duration::from_millis(200));
    drop(cache);
    let loads_at_drop = loads.load(Ordering::SeqCst);

    for round in 0..20 {
        fs::write(dir.path().join(format!("after-drop-{round}")), "k=v\n").unwrap();
    }
    thread::sleep(Duration::from_millis(500));

    assert_eq!(loads.load(Ordering::SeqCst), loads_at_drop);
}
