//! 输入行与翻译任务

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::error::SyncError;
use crate::catalog::types::{FieldKey, ResourceId};

/// 单元格规范化：空值为空串，整数浮点去掉小数部分，字符串去掉首尾空白
pub fn normalize_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// 一行输入：列名 → 规范化后的单元格文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    cells: BTreeMap<String, String>,
}

impl InputRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Self {
        let cells = value
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_cell(v)))
                    .collect()
            })
            .unwrap_or_default();
        Self { cells }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into().trim().to_string());
    }

    /// 读取单元格，缺失时为空串
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InputRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// 列映射：ID列以及每个字段对应的列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub id_column: String,
    pub fields: Vec<(FieldKey, String)>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            fields: vec![
                (FieldKey::Title, "title_en".to_string()),
                (FieldKey::BodyHtml, "descriptionHtml_en".to_string()),
            ],
        }
    }
}

impl ColumnMapping {
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// 设置字段对应的列（替换已有映射）
    pub fn with_field(mut self, key: FieldKey, column: impl Into<String>) -> Self {
        let column = column.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = column,
            None => self.fields.push((key, column)),
        }
        self
    }

    pub fn column_for(&self, key: FieldKey) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| c.as_str())
    }
}

/// 一个条目待写入的目标语言字段值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub id: ResourceId,
    pub locale: String,
    pub values: BTreeMap<FieldKey, String>,
}

impl TranslationJob {
    pub fn new(id: ResourceId, locale: impl Into<String>) -> Self {
        Self {
            id,
            locale: locale.into(),
            values: BTreeMap::new(),
        }
    }

    /// 设置字段值；空白值会被忽略
    pub fn with_value(mut self, key: FieldKey, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(key, value.trim().to_string());
        }
        self
    }

    /// 按列映射从输入行构造任务
    pub fn from_row(row: &InputRow, mapping: &ColumnMapping, locale: &str) -> Result<Self, SyncError> {
        let raw_id = row.get(&mapping.id_column);
        if raw_id.is_empty() {
            return Err(SyncError::MissingId);
        }
        let id = ResourceId::product(raw_id).map_err(|_| SyncError::InvalidId(raw_id.to_string()))?;

        let job = mapping
            .fields
            .iter()
            .fold(Self::new(id, locale), |job, (key, column)| {
                job.with_value(*key, row.get(column))
            });
        job.validate()?;
        Ok(job)
    }

    /// 至少要有一个非空值
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.values.is_empty() {
            Err(SyncError::EmptyJob)
        } else {
            Ok(())
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.values.keys().copied()
    }

    pub fn value(&self, key: FieldKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }
}
