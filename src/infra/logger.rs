//! # Live Log Module / 实时日志模块
//!
//! This module provides the shared line sink that container and engine
//! processes stream into while they run. Every captured line is prefixed
//! with the tag of the command that produced it, so interleaved output
//! from parallel shards stays attributable.
//!
//! 此模块提供容器和引擎进程在运行时写入的共享行接收器。
//! 每个捕获的行都以产生它的命令的标签为前缀，
//! 因此并行分片的交错输出仍然可以归属。

use colored::*;
use std::sync::{Arc, Mutex};

/// Identifies which stream of a child process a captured line came from.
/// 标识捕获的行来自子进程的哪个流。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// Short form used in the line prefix.
    /// 行前缀中使用的缩写形式。
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "out",
            StreamKind::Stderr => "err",
        }
    }
}

enum Sink {
    /// Lines go straight to the console as they arrive.
    Console,
    /// Lines accumulate in memory; used by tests to observe the stream.
    Memory(String),
}

/// A cheaply cloneable handle to the run-wide line sink.
/// Clones share the same underlying sink.
///
/// 一个可廉价克隆的运行级行接收器句柄。
/// 克隆共享同一个底层接收器。
#[derive(Clone)]
pub struct LiveLog {
    sink: Arc<Mutex<Sink>>,
}

impl LiveLog {
    /// Creates a log that prints each line to stdout.
    pub fn console() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Console)),
        }
    }

    /// Creates a log that keeps each line in memory.
    pub fn memory() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Memory(String::new()))),
        }
    }

    /// Records one line of process output under the given tag.
    /// The rendered form is `[{tag}/{out|err}] {line}`.
    ///
    /// 在给定标签下记录一行进程输出。
    /// 呈现形式为 `[{tag}/{out|err}] {line}`。
    pub fn append(&self, tag: &str, stream: StreamKind, line: &str) {
        let prefix = format!("[{}/{}]", tag, stream.as_str());
        let mut sink = self.sink.lock().expect("log sink lock poisoned");
        match &mut *sink {
            Sink::Console => println!("{} {}", prefix.dimmed(), line),
            Sink::Memory(buffer) => {
                buffer.push_str(&prefix);
                buffer.push(' ');
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    /// Returns everything recorded so far, for memory sinks only.
    /// 返回到目前为止记录的所有内容，仅适用于内存接收器。
    pub fn contents(&self) -> Option<String> {
        let sink = self.sink.lock().expect("log sink lock poisoned");
        match &*sink {
            Sink::Console => None,
            Sink::Memory(buffer) => Some(buffer.clone()),
        }
    }
}
