//! 工具模块集合
//!
//! 包含CLI、文件扫描、事件文件处理、报告格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod formatter;
pub mod parallel_processor;
pub mod processor;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStats, BatchStatsSnapshot};
pub use cli::{AppConfig, parse_args, parse_args_from, show_completion_info, show_startup_info};
pub use formatter::{format_event_report, write_output};
pub use parallel_processor::{process_batch_parallel, process_batch_serial};
pub use processor::{
    add_failed_to_batch_output, add_to_batch_output, load_processor, process_event_file,
    process_single_event_file, processed_output_path,
};
pub use scanner::{
    create_batch_output_footer, create_batch_output_header, finalize_and_write_batch_output,
    generate_batch_output_path, scan_event_files, show_batch_completion_info, show_scan_results,
};
