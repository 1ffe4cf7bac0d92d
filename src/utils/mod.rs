//! # 工具模块
//!
//! - `rows` - 输入行与导出记录的 JSON / CSV 读写

pub mod rows;

pub use rows::{
    default_output_path, load_records, load_rows, record_from_item, save_records,
    write_records_csv, RowsError,
};
