//! 目录服务的数据类型

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::error::{CatalogError, CatalogResult};

/// 商品资源ID前缀
pub const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";

/// 服务端公开的可翻译字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Title,
    BodyHtml,
    Handle,
    ProductType,
    MetaTitle,
    MetaDescription,
}

impl FieldKey {
    pub const ALL: [FieldKey; 6] = [
        FieldKey::Title,
        FieldKey::BodyHtml,
        FieldKey::Handle,
        FieldKey::ProductType,
        FieldKey::MetaTitle,
        FieldKey::MetaDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Title => "title",
            FieldKey::BodyHtml => "body_html",
            FieldKey::Handle => "handle",
            FieldKey::ProductType => "product_type",
            FieldKey::MetaTitle => "meta_title",
            FieldKey::MetaDescription => "meta_description",
        }
    }

    /// 能否通过写入占位原文来生成摘要
    pub fn is_seedable(&self) -> bool {
        matches!(self, FieldKey::Title | FieldKey::BodyHtml)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| CatalogError::UnknownFieldKey(s.to_string()))
    }
}

/// 规范化后的资源引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// 把原始商品ID规范化为 `gid://shopify/Product/<n>`
    ///
    /// 接受已有的 `gid://` 引用、纯数字，以及表格导出的整数浮点写法（如 `8923.0`）。
    pub fn product(raw: &str) -> CatalogResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CatalogError::InvalidResourceId(raw.to_string()));
        }
        if raw.starts_with("gid://") {
            return Ok(Self(raw.to_string()));
        }

        let numeric = match raw.split_once('.') {
            Some((int, frac)) if !frac.is_empty() && frac.chars().all(|c| c == '0') => int,
            Some(_) => return Err(CatalogError::InvalidResourceId(raw.to_string())),
            None => raw,
        };

        if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(format!("{}{}", PRODUCT_GID_PREFIX, numeric)))
        } else {
            Err(CatalogError::InvalidResourceId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `translatableContent` 中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableContent {
    pub key: String,
    #[serde(default)]
    pub digest: Option<String>,
}

/// 当前可用的字段摘要
///
/// 空摘要与缺失等价。服务端返回的未知字段记录在 `unknown_keys` 中，不视为错误。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestMap {
    digests: HashMap<FieldKey, String>,
    unknown: Vec<String>,
}

impl DigestMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_content(items: impl IntoIterator<Item = TranslatableContent>) -> Self {
        let mut map = Self::new();
        for item in items {
            match item.key.parse::<FieldKey>() {
                Ok(key) => map.insert(key, item.digest.unwrap_or_default()),
                Err(_) => map.unknown.push(item.key),
            }
        }
        map
    }

    /// 写入摘要；空摘要会移除已有值
    pub fn insert(&mut self, key: FieldKey, digest: impl Into<String>) {
        let digest = digest.into();
        if digest.trim().is_empty() {
            self.digests.remove(&key);
        } else {
            self.digests.insert(key, digest);
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.digests.get(&key).map(String::as_str)
    }

    pub fn has(&self, key: FieldKey) -> bool {
        self.digests.contains_key(&key)
    }

    /// 给定字段中缺少摘要的部分（保持输入顺序）
    pub fn missing<I>(&self, keys: I) -> Vec<FieldKey>
    where
        I: IntoIterator<Item = FieldKey>,
    {
        keys.into_iter().filter(|k| !self.has(*k)).collect()
    }

    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(FieldKey, S)> for DigestMap {
    fn from_iter<T: IntoIterator<Item = (FieldKey, S)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, digest) in iter {
            map.insert(key, digest);
        }
        map
    }
}

/// `translationsRegister` 的一条输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
    pub key: FieldKey,
    pub value: String,
    pub locale: String,
    pub translatable_content_digest: String,
}

/// 已登记的译文（登记响应）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredTranslation {
    pub key: String,
    pub locale: String,
}

/// 某语言下已存储的译文（校验查询）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    pub locale: String,
    #[serde(default)]
    pub outdated: bool,
}

/// 服务端返回的业务错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field: Vec<String>,
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field.join("."), self.message)
        }
    }
}

/// 要写入的主语言内容（仅写入有值的字段）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryContent {
    pub title: Option<String>,
    pub description_html: Option<String>,
}

impl PrimaryContent {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description_html.is_none()
    }

    /// 涉及的字段
    pub fn keys(&self) -> Vec<FieldKey> {
        let mut keys = Vec::new();
        if self.title.is_some() {
            keys.push(FieldKey::Title);
        }
        if self.description_html.is_some() {
            keys.push(FieldKey::BodyHtml);
        }
        keys
    }
}

/// 目录中的一个商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_keys_round_trip_through_text() {
        for key in FieldKey::ALL {
            assert_eq!(key.as_str().parse::<FieldKey>().unwrap(), key);
        }
        assert!(matches!(
            "descriptionHtml".parse::<FieldKey>(),
            Err(CatalogError::UnknownFieldKey(k)) if k == "descriptionHtml"
        ));
    }

    #[test]
    fn product_ids_are_normalized() {
        let expected = "gid://shopify/Product/8923";
        assert_eq!(ResourceId::product("8923").unwrap().as_str(), expected);
        assert_eq!(ResourceId::product(" 8923.0 ").unwrap().as_str(), expected);
        assert_eq!(ResourceId::product(expected).unwrap().as_str(), expected);

        assert!(ResourceId::product("").is_err());
        assert!(ResourceId::product("8923.5").is_err());
        assert!(ResourceId::product("my-handle").is_err());
    }

    #[test]
    fn primary_content_lists_fields_with_values() {
        assert!(PrimaryContent::default().is_empty());
        let content = PrimaryContent {
            title: None,
            description_html: Some("<p>—</p>".into()),
        };
        assert!(!content.is_empty());
        assert_eq!(content.keys(), vec![FieldKey::BodyHtml]);
    }

    #[test]
    fn empty_digests_count_as_missing() {
        let digests = DigestMap::from_content(vec![
            TranslatableContent { key: "title".into(), digest: Some("".into()) },
            TranslatableContent { key: "body_html".into(), digest: Some("d1".into()) },
            TranslatableContent { key: "handle".into(), digest: None },
            TranslatableContent { key: "seo_slug".into(), digest: Some("x".into()) },
        ]);

        assert!(!digests.has(FieldKey::Title));
        assert_eq!(digests.get(FieldKey::BodyHtml), Some("d1"));
        assert_eq!(digests.len(), 1);
        assert_eq!(digests.unknown_keys(), ["seo_slug".to_string()]);
        assert_eq!(
            digests.missing([FieldKey::Title, FieldKey::BodyHtml]),
            vec![FieldKey::Title]
        );
    }

    #[test]
    fn translation_input_uses_service_field_names() {
        let input = TranslationInput {
            key: FieldKey::BodyHtml,
            value: "<p>Phone</p>".into(),
            locale: "en".into(),
            translatable_content_digest: "d1".into(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["key"], "body_html");
        assert_eq!(json["translatableContentDigest"], "d1");
    }

    #[test]
    fn catalog_item_parses_timestamps() {
        let item: CatalogItem = serde_json::from_str(
            r#"{"id":"gid://shopify/Product/1","title":"هاتف","handle":"phone",
                "descriptionHtml":"<p>وصف</p>","tags":["new"],"productType":null,
                "vendor":"Xiaomi","status":"ACTIVE","createdAt":"2024-05-01T10:00:00Z",
                "updatedAt":"2024-06-01T10:00:00Z","publishedAt":null}"#,
        )
        .unwrap();
        assert_eq!(item.tags, vec!["new"]);
        assert!(item.created_at.is_some());
        assert!(item.published_at.is_none());
    }
}
