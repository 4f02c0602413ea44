//! 事件数据模块
//!
//! 定义事件数据产品并提供 JSON 文件读写。

mod format;
mod reader;

pub use format::{EnergyDeposit, Event, Hit, Point3, RawDigit, Roi, Wire};
pub use reader::{read_event, write_event};
