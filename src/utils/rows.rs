//! 输入行与导出记录的文件读写
//!
//! 输入行支持 JSON（对象数组或单个对象）和带表头的 CSV；导出记录使用 JSON，
//! 也可以写成 CSV 方便在表格软件中核对。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;

use crate::catalog::{CatalogItem, InputRow};
use crate::translation::ProductRecord;

/// CSV导出的固定列
pub const RECORD_COLUMNS: [&str; 8] = [
    "id",
    "title_ar",
    "descriptionHtml_ar",
    "tags",
    "title_en",
    "descriptionHtml_en",
    "original_language",
    "target_language",
];

#[derive(Error, Debug)]
pub enum RowsError {
    #[error("无法读写 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON格式错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV格式错误: {0}")]
    Csv(#[from] csv::Error),

    #[error("不支持的文件类型: {0}（可用 .json 或 .csv）")]
    UnsupportedFormat(String),

    #[error("输入结构错误: {0}")]
    InvalidShape(String),
}

fn read_file(path: &Path) -> Result<String, RowsError> {
    fs::read_to_string(path).map_err(|source| RowsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 按扩展名读取输入行
pub fn load_rows(path: &Path) -> Result<Vec<InputRow>, RowsError> {
    match extension(path).as_str() {
        "json" => parse_json_rows(&read_file(path)?),
        "csv" => parse_csv_rows(read_file(path)?.as_bytes()),
        other => Err(RowsError::UnsupportedFormat(format!(".{}", other))),
    }
}

/// JSON输入：对象数组或单个对象；非对象元素得到空行
pub fn parse_json_rows(raw: &str) -> Result<Vec<InputRow>, RowsError> {
    let value: Value = serde_json::from_str(raw)?;
    let rows = match value {
        Value::Array(items) => items.iter().map(InputRow::from_json).collect(),
        other => vec![InputRow::from_json(&other)],
    };
    Ok(rows)
}

/// CSV输入：第一行为表头
pub fn parse_csv_rows<R: std::io::Read>(reader: R) -> Result<Vec<InputRow>, RowsError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut rows: Vec<InputRow> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(headers.iter().zip(record.iter()).collect());
    }
    Ok(rows)
}

/// 读取导出记录（JSON数组）
pub fn load_records(path: &Path) -> Result<Vec<ProductRecord>, RowsError> {
    let value: Value = serde_json::from_str(&read_file(path)?)?;
    if !value.is_array() {
        return Err(RowsError::InvalidShape("记录文件必须是JSON数组".to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// 写出导出记录（带缩进的JSON），自动创建上级目录
pub fn save_records(path: &Path, records: &[ProductRecord]) -> Result<(), RowsError> {
    let io_err = |source| RowsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let serialized = serde_json::to_string_pretty(records)?;
    fs::write(path, serialized).map_err(io_err)
}

/// 以固定列写出CSV
pub fn write_records_csv<W: Write>(writer: W, records: &[ProductRecord]) -> Result<(), RowsError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RECORD_COLUMNS)?;

    for r in records {
        let tags = match &r.tags {
            Some(Value::Array(items)) => items
                .iter()
                .map(|t| t.as_str().map(str::to_string).unwrap_or_else(|| t.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        wtr.write_record([
            r.id.as_str(),
            r.title_source.as_str(),
            r.description_source.as_str(),
            tags.as_str(),
            r.title_target.as_deref().unwrap_or(""),
            r.description_target.as_deref().unwrap_or(""),
            r.original_language.as_deref().unwrap_or(""),
            r.target_language.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush().map_err(|e| RowsError::Csv(e.into()))?;
    Ok(())
}

/// 翻译结果的默认输出路径：`<stem>_translated.json`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("records");
    input.with_file_name(format!("{}_translated.json", stem))
}

/// 把目录中的商品转为待翻译的导出记录
pub fn record_from_item(item: &CatalogItem, original_language: &str, target_language: &str) -> ProductRecord {
    let mut record = ProductRecord {
        id: item.id.clone(),
        title_source: item.title.clone(),
        description_source: item.description_html.clone(),
        tags: Some(json!(item.tags)),
        title_target: Some(String::new()),
        description_target: Some(String::new()),
        original_language: Some(original_language.to_string()),
        target_language: Some(target_language.to_string()),
        ..Default::default()
    };

    let extras = [
        ("handle", json!(item.handle)),
        ("productType", json!(item.product_type)),
        ("vendor", json!(item.vendor)),
        ("status", json!(item.status)),
        ("createdAt", json!(item.created_at)),
        ("updatedAt", json!(item.updated_at)),
        ("publishedAt", json!(item.published_at)),
    ];
    for (key, value) in extras {
        record.extra.insert(key.to_string(), value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rows_accept_lists_and_single_objects() {
        let rows = parse_json_rows(r#"[{"id": 8923.0, "title_en": " Phone "}, 5]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), "8923");
        assert_eq!(rows[0].get("title_en"), "Phone");
        assert_eq!(rows[1].get("id"), "");

        let single = parse_json_rows(r#"{"id": "gid://shopify/Product/1"}"#).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn csv_rows_use_the_header() {
        let data = "id,title_en,descriptionHtml_en\n42,Phone,\"<p>a, b</p>\"\n";
        let rows = parse_csv_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), "42");
        assert_eq!(rows[0].get("descriptionHtml_en"), "<p>a, b</p>");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_rows(Path::new("products.xlsx")).unwrap_err();
        assert!(matches!(err, RowsError::UnsupportedFormat(ext) if ext == ".xlsx"));
    }

    #[test]
    fn records_survive_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("records.json");
        let mut record = ProductRecord {
            id: "gid://shopify/Product/1".into(),
            title_source: "هاتف".into(),
            title_target: Some("Phone".into()),
            ..Default::default()
        };
        record.extra.insert("vendor".into(), json!("Xiaomi"));

        save_records(&path, &[record.clone()]).unwrap();
        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded, vec![record]);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("هاتف"), "non-ASCII text is written as-is");
    }

    #[test]
    fn records_with_null_or_numeric_cells_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(
            &path,
            r#"[
                {"id": 8923, "title_ar": "هاتف", "descriptionHtml_ar": null},
                {"id": "gid://shopify/Product/2", "title_ar": null, "descriptionHtml_ar": "<p>ساعة</p>"}
            ]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "8923");
        assert_eq!(records[0].description_source, "");
        assert_eq!(records[1].title_source, "");
        assert_eq!(records[1].description_source, "<p>ساعة</p>");
    }

    #[test]
    fn records_file_must_be_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.json");
        fs::write(&path, r#"{"id": "1"}"#).unwrap();
        assert!(matches!(load_records(&path), Err(RowsError::InvalidShape(_))));
    }

    #[test]
    fn csv_export_has_fixed_columns() {
        let record = ProductRecord {
            id: "1".into(),
            tags: Some(json!(["a", "b"])),
            title_target: Some("Phone".into()),
            ..Default::default()
        };
        let mut out = Vec::new();
        write_records_csv(&mut out, &[record]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), RECORD_COLUMNS.join(","));
        assert_eq!(lines.next().unwrap(), "1,,,\"a, b\",Phone,,,");
    }

    #[test]
    fn output_path_defaults_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("data/products.json")),
            PathBuf::from("data/products_translated.json")
        );
    }

    #[test]
    fn catalog_items_become_untranslated_records() {
        let item = CatalogItem {
            id: "gid://shopify/Product/1".into(),
            title: "هاتف".into(),
            handle: "phone".into(),
            description_html: "<p>وصف</p>".into(),
            tags: vec!["new".into()],
            product_type: None,
            vendor: Some("Xiaomi".into()),
            status: Some("ACTIVE".into()),
            created_at: None,
            updated_at: None,
            published_at: None,
        };
        let record = record_from_item(&item, "ar", "en");

        assert_eq!(record.title_source, "هاتف");
        assert_eq!(record.title_target.as_deref(), Some(""));
        assert!(!record.is_translated());
        assert_eq!(record.extra["handle"], "phone");
        assert_eq!(record.original_language.as_deref(), Some("ar"));
    }
}
