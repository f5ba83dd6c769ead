//! 位压缩基础结构：定宽整数数组与基于它的分块双端队列。

pub mod array;
pub mod queue;

pub use array::{PackedArray, Width};
pub use queue::Queue;
