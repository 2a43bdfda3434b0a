//! 变长记录遍历
//!
//! 把系统通知缓冲区按每条记录自带的长度字段切分成记录序列，
//! 与记录的语义翻译解耦。

use std::iter::FusedIterator;

/// 按记录长度函数遍历字节缓冲区
///
/// `record_len` 接收剩余字节，返回首条记录的总长度；头部不完整时返回 `None`。
/// 长度为零、超出缓冲区或头部不完整时迭代结束，且不会重新开始。
pub struct RecordIter<'a, F> {
    remaining: &'a [u8],
    record_len: F,
    finished: bool,
}

impl<'a, F> RecordIter<'a, F>
where
    F: FnMut(&[u8]) -> Option<usize>,
{
    pub fn new(buffer: &'a [u8], record_len: F) -> Self {
        Self {
            remaining: buffer,
            record_len,
            finished: false,
        }
    }

    /// 尚未遍历的字节数
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl<'a, F> Iterator for RecordIter<'a, F>
where
    F: FnMut(&[u8]) -> Option<usize>,
{
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.remaining.is_empty() {
            self.finished = true;
            return None;
        }

        match (self.record_len)(self.remaining) {
            Some(len) if len > 0 && len <= self.remaining.len() => {
                let (record, rest) = self.remaining.split_at(len);
                self.remaining = rest;
                Some(record)
            }
            _ => {
                self.finished = true;
                None
            }
        }
    }
}

impl<'a, F> FusedIterator for RecordIter<'a, F> where F: FnMut(&[u8]) -> Option<usize> {}
