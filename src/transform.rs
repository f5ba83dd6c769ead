//! 顶层变换流程：提取 → 命名 → 约简 → 递归排序 → 诱导 BWT。
//!
//! 每个阶段的缓冲区在下一阶段用完后立即释放；内存使用通过
//! [`MemoryObserver`] 上报，而不是全局计数器。

use std::fmt;
use std::io::Write;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TransformOpt;
use crate::error::{BwtError, Result};
use crate::index::bwt::{induce_bwt, inverse_bwt};
use crate::index::sa::sais_with_stats;
use crate::lms::{create_reduced_string, extract_lms_strings, sort_lms_strings, Handle};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Extract,
    Name,
    Reduce,
    Sort,
    Induce,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "extract",
            Stage::Name => "name",
            Stage::Reduce => "reduce",
            Stage::Sort => "sort",
            Stage::Induce => "induce",
        };
        f.write_str(s)
    }
}

/// 内存事件回调
pub trait MemoryObserver {
    fn on_alloc(&mut self, stage: Stage, bytes: usize);
    fn on_release(&mut self, stage: Stage, bytes: usize);
}

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MemoryObserver for NoopObserver {
    fn on_alloc(&mut self, _stage: Stage, _bytes: usize) {}
    fn on_release(&mut self, _stage: Stage, _bytes: usize) {}
}

/// 记录当前与峰值字节数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeakMemory {
    current: usize,
    peak: usize,
}

impl PeakMemory {
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn peak(&self) -> usize {
        self.peak
    }
}

impl MemoryObserver for PeakMemory {
    fn on_alloc(&mut self, _stage: Stage, bytes: usize) {
        self.current += bytes;
        self.peak = self.peak.max(self.current);
    }

    fn on_release(&mut self, _stage: Stage, bytes: usize) {
        self.current = self.current.saturating_sub(bytes);
    }
}

/// 统计峰值的同时把事件转发给调用方
struct Tracked<'a> {
    inner: &'a mut dyn MemoryObserver,
    peak: PeakMemory,
}

impl MemoryObserver for Tracked<'_> {
    fn on_alloc(&mut self, stage: Stage, bytes: usize) {
        self.peak.on_alloc(stage, bytes);
        self.inner.on_alloc(stage, bytes);
    }

    fn on_release(&mut self, stage: Stage, bytes: usize) {
        self.peak.on_release(stage, bytes);
        self.inner.on_release(stage, bytes);
    }
}

/// 报告元信息（由命令行填写）
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub input_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 一次变换的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    pub input_len: u64,
    pub alphabet_size: u32,
    pub num_substrings: u64,
    pub num_unique: u64,
    /// SA-IS 在约简串上的最大递归深度
    pub sais_depth: u64,
    /// 各阶段登记内存之和的峰值
    pub peak_bytes: u64,
    pub last: u64,
    pub opt: TransformOpt,
    pub meta: ReportMeta,
}

impl TransformReport {
    pub fn set_meta(&mut self, meta: ReportMeta) {
        self.meta = meta;
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let f = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self).map_err(|e| BwtError::Format(format!("cannot encode report: {}", e)))?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let report: Self = bincode::deserialize_from(std::io::BufReader::new(f))
            .map_err(|e| BwtError::Format(format!("cannot decode report: {}", e)))?;
        Ok(report)
    }
}

/// 变换结果
#[derive(Debug, Clone)]
pub struct BwtOutput {
    /// 长度 n，不含终止符
    pub bwt: Vec<u8>,
    pub last: u64,
    pub report: TransformReport,
}

/// 计算 BWT，返回 (BWT, last)。
pub fn transform(text: &[u8]) -> Result<(Vec<u8>, u64)> {
    let out = transform_with_opt(text, &TransformOpt::default())?;
    Ok((out.bwt, out.last))
}

pub fn transform_with_opt(text: &[u8], opt: &TransformOpt) -> Result<BwtOutput> {
    transform_observed(text, opt, &mut NoopObserver)
}

/// 带内存回调的变换
pub fn transform_observed(text: &[u8], opt: &TransformOpt, observer: &mut dyn MemoryObserver) -> Result<BwtOutput> {
    let n = text.len();
    if n == 0 {
        return Err(BwtError::InvalidInput("empty input".into()));
    }
    let mut obs = Tracked { inner: observer, peak: PeakMemory::default() };

    let mut container = extract_lms_strings(text, None, opt)?;
    let extract_bytes = container.heap_bytes();
    obs.on_alloc(Stage::Extract, extract_bytes);

    let ranking = sort_lms_strings(&mut container)?;
    let name_bytes = ranking.order.capacity() * std::mem::size_of::<Handle>();
    obs.on_alloc(Stage::Name, name_bytes);

    let reduced = create_reduced_string(&container, &ranking)?;
    let reduce_bytes = reduced.heap_bytes();
    obs.on_alloc(Stage::Reduce, reduce_bytes);

    let (k, m, u) = (container.k, container.num_substrings, container.num_unique);
    drop(ranking);
    obs.on_release(Stage::Name, name_bytes);
    let freq = std::mem::take(&mut container.freq);
    drop(container);
    obs.on_release(Stage::Extract, extract_bytes);

    let (sa1, stats) = sais_with_stats(&reduced.t1, reduced.alphabet)?;
    let sort_bytes = sa1.heap_bytes();
    obs.on_alloc(Stage::Sort, sort_bytes);
    debug!("sort: |T1|={} depth={} levels={}", reduced.t1.len(), stats.depth, stats.levels);

    let lms = reduced.sorted_lms(&sa1)?;
    drop(sa1);
    obs.on_release(Stage::Sort, sort_bytes);
    drop(reduced);
    obs.on_release(Stage::Reduce, reduce_bytes);

    let induce_bytes = lms.heap_bytes() + n + 1;
    obs.on_alloc(Stage::Induce, induce_bytes);
    let (bwt, last) = induce_bwt(text, &freq, &lms)?;
    drop(lms);
    obs.on_release(Stage::Induce, induce_bytes);

    let peak = obs.peak.peak();
    debug!("transform: n={} last={} peak_bytes={}", n, last, peak);

    let report = TransformReport {
        input_len: n as u64,
        alphabet_size: k,
        num_substrings: m as u64,
        num_unique: u as u64,
        sais_depth: stats.depth as u64,
        peak_bytes: peak as u64,
        last,
        opt: *opt,
        meta: ReportMeta::default(),
    };
    Ok(BwtOutput { bwt, last, report })
}

/// 逆变换：由 (BWT, last) 恢复原文
pub fn inverse(bwt: &[u8], last: u64) -> Result<Vec<u8>> {
    inverse_bwt(bwt, last)
}
