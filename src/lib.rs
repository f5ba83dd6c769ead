//! # flbwt
//!
//! 线性时间的 Burrows-Wheeler 变换：基于诱导排序（SA-IS），
//! 用子串去重表代替递归的后缀比较，全程使用位压缩数组。
//!
//! 本 crate 提供：
//!
//! - **LMS 提取**：一次从右向左扫描，得到频次表与 LMS 子串
//! - **子串去重与命名**：哈希表 + 变长记录 arena，排序后命名并构造约简串
//! - **SA-IS**：按运行时位宽工作的递归后缀数组构建
//! - **BWT 诱导**：用 3 × 256 个队列直接得到 BWT，不构造完整后缀数组
//!
//! ## 快速示例
//!
//! ```rust
//! use flbwt::{inverse, transform};
//!
//! let text = b"mmississiippii$";
//! let (bwt, last) = transform(text).unwrap();
//! assert_eq!(bwt, b"$iipsismmpissii");
//! assert_eq!(last, 9);
//! assert_eq!(inverse(&bwt, last).unwrap(), text.to_vec());
//! ```
//!
//! ## 模块说明
//!
//! - [`packed`] — 位压缩数组与分块队列
//! - [`lms`] — LMS 子串提取、去重、命名与约简串
//! - [`index`] — SA-IS 后缀数组、BWT 诱导与逆变换
//! - [`transform`] — 顶层流程、统计报告与内存回调
//! - [`io`] — BWT 文件读写
//! - [`util`] — 位宽与对数等工具函数

pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod lms;
pub mod packed;
pub mod transform;
pub mod util;

pub use config::TransformOpt;
pub use error::{BwtError, Result};
pub use transform::{
    inverse, transform, transform_observed, transform_with_opt, BwtOutput, MemoryObserver, NoopObserver, PeakMemory,
    ReportMeta, Stage, TransformReport,
};
