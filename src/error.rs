//! 库内统一错误类型。
//!
//! 所有错误均为致命错误：变换要么产出完整的 (BWT, last)，要么整体失败，
//! 不存在部分结果。

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BwtError {
    /// 输入为空、字母表上界不合法、`last` 越界等调用方错误
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 任一缓冲区扩容失败
    #[error("allocation failed: requested {requested} more {unit}")]
    Allocation { requested: usize, unit: &'static str },

    /// 内部不变量被破坏（编程错误，不是数据错误）
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// BWT 文件格式错误
    #[error("malformed bwt file: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BwtError {
    pub(crate) fn alloc(requested: usize, unit: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |_| BwtError::Allocation { requested, unit }
    }
}

pub type Result<T> = std::result::Result<T, BwtError>;
