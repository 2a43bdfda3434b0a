//! 非Linux平台的监控后端
//!
//! 由 `notify` 的 `RecommendedWatcher`（Windows 上为 ReadDirectoryChangesW，
//! macOS 上为 FSEvents）产生原生事件，专用线程从通道中取出并翻译。
//! 释放 `RecommendedWatcher` 会断开通道，这就是后台线程的关闭信号。

use crate::error::WatchError;
use crate::watcher::{already_watching, DirectoryWatcher, EventHandler, FileEvent};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

const THREAD_NAME: &str = "confwatch-notify";

struct Worker {
    directory: PathBuf,
    watcher: RecommendedWatcher,
    thread: JoinHandle<()>,
}

/// 基于 `notify` 的目录监控器
#[derive(Default)]
pub struct NotifyWatcher {
    worker: Option<Worker>,
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryWatcher for NotifyWatcher {
    fn start(&mut self, path: &Path, handler: EventHandler) -> Result<(), WatchError> {
        if let Some(worker) = &self.worker {
            warn!("目录监控器已在运行: {}", worker.directory.display());
            return Err(already_watching(&worker.directory));
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())
            .map_err(|e| WatchError::Backend(format!("创建文件监控器失败: {e}")))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Backend(format!("监控目录失败 {}: {e}", path.display())))?;

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_loop(rx, handler))
            .map_err(WatchError::SpawnThread)?;

        info!("开始监控目录: {}", path.display());
        self.worker = Some(Worker {
            directory: path.to_path_buf(),
            watcher,
            thread,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        drop(worker.watcher);
        if worker.thread.join().is_err() {
            error!("监控线程异常退出: {}", worker.directory.display());
        }

        info!("目录监控已停止: {}", worker.directory.display());
    }

    fn watched_directory(&self) -> Option<&Path> {
        self.worker.as_ref().map(|worker| worker.directory.as_path())
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(rx: mpsc::Receiver<notify::Result<Event>>, handler: EventHandler) {
    for res in rx {
        match res {
            Ok(event) => {
                for file_event in translate(&event) {
                    handler(file_event);
                }
            }
            Err(e) => warn!("文件监控事件错误: {}", e),
        }
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// 翻译一条原生事件，重命名拆分为旧名删除和新名创建
fn translate(event: &Event) -> Vec<FileEvent> {
    let names = event.paths.iter().filter_map(|path| file_name(path));

    match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        EventKind::Create(_) => names.map(FileEvent::created).collect(),
        EventKind::Remove(_) => names.map(FileEvent::removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            names.map(FileEvent::removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            names.map(FileEvent::created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::new();
            if let Some(old) = event.paths.first().and_then(|path| file_name(path)) {
                events.push(FileEvent::removed(old));
            }
            if let Some(new) = event.paths.get(1).and_then(|path| file_name(path)) {
                events.push(FileEvent::created(new));
            }
            events
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|path| {
                let name = file_name(path)?;
                Some(if path.is_file() {
                    FileEvent::created(name)
                } else {
                    FileEvent::removed(name)
                })
            })
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .filter_map(|path| file_name(path))
            .map(FileEvent::changed)
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
