//! 事件文件读写
//!
//! 每个 JSON 文件保存一个事件；写出时使用 pretty 格式便于比对。

use super::format::Event;
use crate::error::{RoiError, RoiResult};
use std::fs;
use std::path::Path;

/// 读取并校验事件文件
pub fn read_event(path: &Path) -> RoiResult<Event> {
    if !path.exists() {
        return Err(RoiError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("事件文件不存在: {}", path.display()),
        )));
    }

    let text = fs::read_to_string(path)?;
    let event: Event = serde_json::from_str(&text)
        .map_err(|e| RoiError::FormatError(format!("{}: {e}", path.display())))?;
    event.validate()?;
    Ok(event)
}

/// 写出事件文件
pub fn write_event(path: &Path, event: &Event) -> RoiResult<()> {
    let text = serde_json::to_string_pretty(event)?;
    fs::write(path, text)?;
    Ok(())
}
