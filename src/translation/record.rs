//! 导出记录：翻译引擎读写的商品行

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::catalog::normalize_cell;

/// 一条商品导出记录
///
/// 未识别的列原样保留在 `extra` 中，写回文件时不会丢失。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,

    #[serde(rename = "title_ar", default, deserialize_with = "lenient_text")]
    pub title_source: String,

    #[serde(
        rename = "descriptionHtml_ar",
        default,
        deserialize_with = "lenient_text"
    )]
    pub description_source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,

    #[serde(
        rename = "title_en",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title_target: Option<String>,

    #[serde(
        rename = "descriptionHtml_en",
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description_target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 导出表里的空值和数字按文本读取，字符串保持原样
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => normalize_cell(&other),
    })
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(normalize_cell(&other)),
    })
}

impl ProductRecord {
    /// 两个目标字段是否都已填写
    pub fn is_translated(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.title_target) && filled(&self.description_target)
    }
}
