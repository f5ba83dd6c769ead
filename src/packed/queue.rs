use std::collections::VecDeque;

use crate::error::{BwtError, Result};
use crate::packed::array::{PackedArray, Width};

/// 每个块容纳的元素个数
pub const QSIZE: usize = 1024;

/// 由定长 PackedArray 块组成的双端队列。
///
/// 元素只在 `[head, tail)` 范围内有效：`head` 是首块内的起始下标，
/// `tail` 是末块内的结束下标。除首块和末块外，中间块总是满的。
/// 块一旦取空立即释放。
pub struct Queue {
    width: u8,
    blocks: VecDeque<PackedArray>,
    head: usize,
    tail: usize,
    len: usize,
}

impl Queue {
    pub fn new(width: Width) -> Self {
        Self { width: width.bits(), blocks: VecDeque::new(), head: 0, tail: 0, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 追加到队尾
    pub fn enqueue(&mut self, x: u64) -> Result<()> {
        if self.blocks.is_empty() {
            self.push_back_block()?;
            self.head = 0;
            self.tail = 0;
        } else if self.tail == QSIZE {
            self.push_back_block()?;
            self.tail = 0;
        }
        if let Some(block) = self.blocks.back_mut() {
            block.set_value(self.tail, x);
        }
        self.tail += 1;
        self.len += 1;
        Ok(())
    }

    /// 插入到队首
    pub fn enqueue_front(&mut self, x: u64) -> Result<()> {
        if self.blocks.is_empty() {
            self.push_front_block()?;
            self.head = QSIZE;
            self.tail = QSIZE;
        } else if self.head == 0 {
            self.push_front_block()?;
            self.head = QSIZE;
        }
        self.head -= 1;
        if let Some(block) = self.blocks.front_mut() {
            block.set_value(self.head, x);
        }
        self.len += 1;
        Ok(())
    }

    /// 从队首取出
    pub fn dequeue(&mut self) -> Option<u64> {
        if self.len == 0 {
            return None;
        }
        let x = self.blocks.front()?.get_value(self.head);
        self.head += 1;
        self.len -= 1;
        if self.len == 0 {
            self.blocks.clear();
            self.head = 0;
            self.tail = 0;
        } else if self.head == QSIZE {
            self.blocks.pop_front();
            self.head = 0;
        }
        Some(x)
    }

    /// 已分配块占用的堆内存
    pub fn heap_bytes(&self) -> usize {
        self.blocks.iter().map(PackedArray::heap_bytes).sum()
    }

    fn new_block(&self) -> Result<PackedArray> {
        PackedArray::new(QSIZE, Width::Bits(self.width))
    }

    fn push_back_block(&mut self) -> Result<()> {
        let block = self.new_block()?;
        self.blocks.try_reserve(1).map_err(BwtError::alloc(1, "queue blocks"))?;
        self.blocks.push_back(block);
        Ok(())
    }

    fn push_front_block(&mut self) -> Result<()> {
        let block = self.new_block()?;
        self.blocks.try_reserve(1).map_err(BwtError::alloc(1, "queue blocks"))?;
        self.blocks.push_front(block);
        Ok(())
    }
}
