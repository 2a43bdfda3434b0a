//! 配置缓存模块
//!
//! 在内存中镜像被监控目录下每个文件的解析结果，查询从不访问磁盘。
//!
//! 并发模型：监控线程是唯一的事件来源，读者可以在任意线程查询。
//! 映射由一把互斥锁保护，只在映射读写期间持有，文件I/O总在加锁之前完成。

use crate::config::loader::{regular_files, FileLoader, KeyValueLoader};
use crate::config::parser::ParsedFile;
use crate::error::WatchError;
use crate::watcher::{
    already_watching, DirectoryWatcher, EventHandler, FileEvent, FileEventKind, PlatformWatcher,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// 文件名到解析结果的映射
#[derive(Debug, Default)]
struct CacheMap {
    entries: HashMap<String, ParsedFile>,
    /// 初始扫描期间被事件触及的文件名，扫描结果不会覆盖它们
    touched_during_scan: Option<HashSet<String>>,
}

impl CacheMap {
    fn touch(&mut self, filename: &str) {
        if let Some(touched) = self.touched_during_scan.as_mut() {
            touched.insert(filename.to_string());
        }
    }
}

/// 缓存与监控线程共享的状态
struct CacheState<L> {
    loader: L,
    files: Mutex<CacheMap>,
}

impl<L: FileLoader> CacheState<L> {
    fn new(loader: L) -> Self {
        Self {
            loader,
            files: Mutex::new(CacheMap::default()),
        }
    }

    fn lock_files(&self) -> MutexGuard<'_, CacheMap> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 应用一个事件：创建或变更时整体重新加载，删除时移除
    fn apply_event(&self, directory: &Path, event: FileEvent) {
        let filename = event.filename();
        if filename.is_empty() {
            return;
        }

        match event.kind() {
            FileEventKind::Created | FileEventKind::Changed => {
                debug!("文件{}: {}", event.kind(), filename);
                match self.loader.load(&directory.join(filename)) {
                    Ok(parsed) => {
                        let mut files = self.lock_files();
                        files.touch(filename);
                        files.entries.insert(filename.to_string(), parsed);
                    }
                    Err(e) => warn!("重新加载配置失败，保留旧值: {}", e),
                }
            }
            FileEventKind::Removed => {
                debug!("文件removed: {}", filename);
                let mut files = self.lock_files();
                files.touch(filename);
                files.entries.remove(filename);
            }
        }
    }

    fn begin_scan(&self) {
        self.lock_files().touched_during_scan = Some(HashSet::new());
    }

    fn end_scan(&self) {
        self.lock_files().touched_during_scan = None;
    }

    /// 合并扫描结果，扫描期间已被事件处理过的文件以事件为准
    fn merge_scanned(&self, filename: String, parsed: ParsedFile) -> bool {
        let mut files = self.lock_files();
        let touched = files
            .touched_during_scan
            .as_ref()
            .is_some_and(|touched| touched.contains(&filename));
        if touched {
            return false;
        }
        files.entries.insert(filename, parsed);
        true
    }

    fn clear(&self) {
        self.lock_files().entries.clear();
    }
}

/// 监控状态：每个缓存实例最多监控一个目录
struct WatchState<W> {
    directory: Option<PathBuf>,
    watcher: W,
}

/// 事件驱动的目录配置缓存
///
/// 状态机：`Idle --watch_directory 成功--> Watching`，`Watching` 在实例生命周期内不再改变。
pub struct ConfigCache<L = KeyValueLoader, W = PlatformWatcher>
where
    L: FileLoader,
    W: DirectoryWatcher,
{
    state: Arc<CacheState<L>>,
    watch: Mutex<WatchState<W>>,
}

impl ConfigCache {
    /// 使用 key=value 加载器和当前平台的监控器创建缓存
    pub fn new() -> Self {
        Self::with_parts(KeyValueLoader::new(), PlatformWatcher::default())
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, W> ConfigCache<L, W>
where
    L: FileLoader,
    W: DirectoryWatcher,
{
    /// 使用指定的加载器和监控器创建缓存
    pub fn with_parts(loader: L, watcher: W) -> Self {
        Self {
            state: Arc::new(CacheState::new(loader)),
            watch: Mutex::new(WatchState {
                directory: None,
                watcher,
            }),
        }
    }

    fn lock_watch(&self) -> MutexGuard<'_, WatchState<W>> {
        self.watch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 开始监控目录并加载其中所有常规文件
    ///
    /// 已在监控、监控器启动失败或目录无法枚举时返回 `false`，失败后实例保持空闲。
    pub fn watch_directory(&self, path: impl AsRef<Path>) -> bool {
        match self.try_watch_directory(path) {
            Ok(()) => true,
            Err(e) => {
                error!("监控配置目录失败: {}", e);
                false
            }
        }
    }

    /// 同 [`watch_directory`](Self::watch_directory)，返回具体错误
    ///
    /// 监控器先于扫描启动，保证扫描期间的变更不会丢失；
    /// 扫描期间被事件处理过的文件不会被扫描结果覆盖或复活。
    pub fn try_watch_directory(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = path.as_ref();
        let mut watch = self.lock_watch();

        if let Some(directory) = &watch.directory {
            warn!("缓存已在监控目录: {}", directory.display());
            return Err(already_watching(directory));
        }

        self.state.begin_scan();

        let handler: EventHandler = {
            let state = Arc::clone(&self.state);
            let directory = path.to_path_buf();
            Box::new(move |event: FileEvent| state.apply_event(&directory, event))
        };

        if let Err(e) = watch.watcher.start(path, handler) {
            self.state.end_scan();
            return Err(e);
        }

        let entries = match regular_files(path) {
            Ok(entries) => entries,
            Err(e) => {
                watch.watcher.stop();
                self.state.end_scan();
                self.state.clear();
                return Err(e);
            }
        };

        let mut loaded = 0usize;
        for entry in entries {
            let parsed = self.state.loader.load_or_default(&entry.path);
            if self.state.merge_scanned(entry.filename, parsed) {
                loaded += 1;
            }
        }

        self.state.end_scan();
        watch.directory = Some(path.to_path_buf());

        info!("已加载 {} 个配置文件: {}", loaded, path.display());
        Ok(())
    }

    /// 查询配置值
    ///
    /// 文件或键不存在时返回空字符串，与配置为空值无法区分。
    pub fn load(&self, file: &str, key: &str) -> String {
        let files = self.state.lock_files();
        files
            .entries
            .get(file)
            .and_then(|parsed| parsed.get(key))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// 处理一个文件事件
    ///
    /// 监控线程直接使用同一逻辑；未监控目录时事件被忽略。
    pub fn handle_event(&self, event: FileEvent) {
        match self.watched_directory() {
            Some(directory) => self.state.apply_event(&directory, event),
            None => debug!("未监控任何目录，忽略事件: {}", event),
        }
    }

    /// 当前监控的目录
    pub fn watched_directory(&self) -> Option<PathBuf> {
        self.lock_watch().directory.clone()
    }

    pub fn is_watching(&self) -> bool {
        self.lock_watch().directory.is_some()
    }

    /// 已缓存的文件名（排序）
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock_files().entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// 单个文件解析结果的副本
    pub fn snapshot(&self, file: &str) -> Option<ParsedFile> {
        self.state.lock_files().entries.get(file).cloned()
    }
}

impl<L, W> Drop for ConfigCache<L, W>
where
    L: FileLoader,
    W: DirectoryWatcher,
{
    fn drop(&mut self) {
        self.watch
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .watcher
            .stop();
    }
}
