//! Linux inotify 监控后端
//!
//! 后台线程用 poll 同时等待 inotify 描述符和 eventfd 关闭信号，
//! 每次读取一个缓冲区的原生记录，逐条翻译成事件后同步调用处理器。

use crate::error::WatchError;
use crate::watcher::{already_watching, DirectoryWatcher, EventHandler, FileEvent, RecordIter};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use nix::unistd::read;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// `struct inotify_event` 固定头部长度（wd, mask, cookie, len）
const HEADER_LEN: usize = 16;

/// 读缓冲区大小，必须容纳头部加 NAME_MAX + 1
const BUFFER_LEN: usize = 4096;

/// 监控线程名称
const THREAD_NAME: &str = "confwatch-inotify";

/// poll 出错后重试前的等待时间
const POLL_RETRY_DELAY: Duration = Duration::from_millis(100);

fn watch_mask() -> AddWatchFlags {
    AddWatchFlags::IN_CREATE
        | AddWatchFlags::IN_DELETE
        | AddWatchFlags::IN_MODIFY
        | AddWatchFlags::IN_CLOSE_WRITE
        | AddWatchFlags::IN_MOVED_FROM
        | AddWatchFlags::IN_MOVED_TO
}

/// 运行中的后台线程及其关闭信号
struct Worker {
    directory: PathBuf,
    shutdown: Arc<EventFd>,
    thread: JoinHandle<()>,
}

/// 基于 inotify 的目录监控器
#[derive(Default)]
pub struct InotifyWatcher {
    worker: Option<Worker>,
}

impl InotifyWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryWatcher for InotifyWatcher {
    fn start(&mut self, path: &Path, handler: EventHandler) -> Result<(), WatchError> {
        if let Some(worker) = &self.worker {
            warn!("目录监控器已在运行: {}", worker.directory.display());
            return Err(already_watching(&worker.directory));
        }

        let inotify = Inotify::init(InitFlags::IN_CLOEXEC)
            .map_err(|e| WatchError::OpenNotifier(e.into()))?;

        inotify
            .add_watch(path, watch_mask())
            .map_err(|e| WatchError::AddWatch {
                path: path.to_path_buf(),
                source: e.into(),
            })?;

        let shutdown = Arc::new(
            EventFd::from_flags(EfdFlags::EFD_CLOEXEC)
                .map_err(|e| WatchError::ShutdownSignal(e.into()))?,
        );

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn({
                let shutdown = Arc::clone(&shutdown);
                move || run_loop(inotify, &shutdown, handler)
            })
            .map_err(WatchError::SpawnThread)?;

        info!("开始监控目录: {}", path.display());
        self.worker = Some(Worker {
            directory: path.to_path_buf(),
            shutdown,
            thread,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        if let Err(e) = worker.shutdown.write(1) {
            error!("发送关闭信号失败: {}", e);
        }
        if worker.thread.join().is_err() {
            error!("监控线程异常退出: {}", worker.directory.display());
        }

        info!("目录监控已停止: {}", worker.directory.display());
    }

    fn watched_directory(&self) -> Option<&Path> {
        self.worker.as_ref().map(|worker| worker.directory.as_path())
    }
}

impl Drop for InotifyWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 后台通知循环，inotify 描述符随循环结束释放
fn run_loop(inotify: Inotify, shutdown: &EventFd, handler: EventHandler) {
    let mut buffer = [0u8; BUFFER_LEN];

    loop {
        let mut fds = [
            PollFd::new(inotify.as_fd(), PollFlags::POLLIN),
            PollFd::new(shutdown.as_fd(), PollFlags::POLLIN),
        ];

        if wait_outcome(poll(&mut fds, PollTimeout::NONE)) == Wait::Retry {
            continue;
        }

        if is_readable(&fds[1]) {
            debug!("收到关闭信号");
            break;
        }

        if is_readable(&fds[0]) {
            match read_records(&inotify, &mut buffer) {
                Ok(len) => {
                    for event in events(&buffer[..len]) {
                        handler(event);
                    }
                }
                Err(e) => warn!("读取inotify事件失败: {}", e),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Wait {
    Ready,
    Retry,
}

/// poll 出错时线程不退出，稍后重新等待，关闭信号仍然有效
fn wait_outcome(result: nix::Result<i32>) -> Wait {
    match result {
        Ok(_) => Wait::Ready,
        Err(Errno::EINTR) => Wait::Retry,
        Err(e) => {
            error!("poll() 失败，稍后重试: {}", e);
            std::thread::sleep(POLL_RETRY_DELAY);
            Wait::Retry
        }
    }
}

fn is_readable(fd: &PollFd<'_>) -> bool {
    fd.revents()
        .is_some_and(|revents| revents.contains(PollFlags::POLLIN))
}

fn read_records(inotify: &Inotify, buffer: &mut [u8]) -> std::io::Result<usize> {
    read(inotify.as_fd(), buffer).map_err(std::io::Error::from)
}

/// 单条原生通知记录
#[derive(Debug)]
struct InotifyRecord<'a> {
    mask: AddWatchFlags,
    name: &'a [u8],
}

/// 记录总长度：头部加上 `len` 字段声明的名字长度
fn record_len(rest: &[u8]) -> Option<usize> {
    let header = rest.get(..HEADER_LEN)?;
    let name_len = u32::from_ne_bytes(header[12..16].try_into().ok()?) as usize;
    Some(HEADER_LEN + name_len)
}

impl<'a> InotifyRecord<'a> {
    fn parse(record: &'a [u8]) -> Option<Self> {
        let mask = u32::from_ne_bytes(record.get(4..8)?.try_into().ok()?);
        Some(Self {
            mask: AddWatchFlags::from_bits_truncate(mask),
            name: record.get(HEADER_LEN..)?,
        })
    }

    fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// 翻译成零个或多个事件，顺序为 删除、创建、变更
    fn translate(&self) -> Vec<FileEvent> {
        if self.mask.contains(AddWatchFlags::IN_Q_OVERFLOW) {
            warn!("inotify事件队列溢出，部分变更可能丢失");
            return Vec::new();
        }
        if self.mask.contains(AddWatchFlags::IN_IGNORED) {
            warn!("目录监控已被系统移除");
            return Vec::new();
        }
        if self.mask.contains(AddWatchFlags::IN_ISDIR) {
            return Vec::new();
        }

        let name = self.name();
        if name.trim().is_empty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self
            .mask
            .intersects(AddWatchFlags::IN_DELETE | AddWatchFlags::IN_MOVED_FROM)
        {
            events.push(FileEvent::removed(&name));
        }
        if self
            .mask
            .intersects(AddWatchFlags::IN_CREATE | AddWatchFlags::IN_MOVED_TO)
        {
            events.push(FileEvent::created(&name));
        }
        if self
            .mask
            .intersects(AddWatchFlags::IN_MODIFY | AddWatchFlags::IN_CLOSE_WRITE)
        {
            events.push(FileEvent::changed(&name));
        }
        events
    }
}

/// 把一个缓冲区的原生记录翻译成事件序列
fn events(buffer: &[u8]) -> impl Iterator<Item = FileEvent> + '_ {
    RecordIter::new(buffer, record_len)
        .filter_map(InotifyRecord::parse)
        .flat_map(|record| record.translate())
}
