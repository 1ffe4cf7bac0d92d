//! HTML片段的轻量处理：纯文本提取与标签结构比对

use std::sync::OnceLock;

use regex::Regex;

use crate::translation::error::{TranslationError, TranslationResult};

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern).unwrap_or_else(|e| panic!("内置正则无效 {}: {}", pattern, e))
    })
}

fn tag_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, r"<[^>]+>")
}

fn whitespace_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, r"\s+")
}

fn element_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(&CELL, r"<\s*(/?)\s*([A-Za-z][A-Za-z0-9:-]*)([^>]*)>")
}

fn attribute_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached(
        &CELL,
        r#"([^\s=/"'>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    )
}

/// 去掉所有标签并压缩空白
pub fn html_to_text(html: &str) -> String {
    let without_tags = tag_regex().replace_all(html, " ");
    collapse_whitespace(&without_tags)
}

/// 把连续空白压缩为一个空格并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

/// 按字符数截断
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// 片段中一个标签的规范化表示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub closing: bool,
    pub name: String,
    /// 按名称排序的 (属性名, 属性值)
    pub attributes: Vec<(String, String)>,
}

impl std::fmt::Display for TagToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}{}", if self.closing { "/" } else { "" }, self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

/// 提取有序的标签序列
pub fn tag_signature(html: &str) -> Vec<TagToken> {
    element_regex()
        .captures_iter(html)
        .map(|caps| {
            let closing = !caps[1].is_empty();
            let name = caps[2].to_lowercase();
            let raw_attrs = caps[3].trim().trim_end_matches('/');

            let mut attributes: Vec<(String, String)> = attribute_regex()
                .captures_iter(raw_attrs)
                .map(|a| {
                    let value = a
                        .get(2)
                        .or_else(|| a.get(3))
                        .or_else(|| a.get(4))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    (a[1].to_lowercase(), value)
                })
                .collect();
            attributes.sort();

            TagToken {
                closing,
                name,
                attributes,
            }
        })
        .collect()
}

/// 检查译文是否保留了原文的全部标签和属性（顺序一致）
pub fn verify_structure(source: &str, translated: &str) -> TranslationResult<()> {
    let expected = tag_signature(source);
    let actual = tag_signature(translated);

    if let Some(pos) = expected.iter().zip(actual.iter()).position(|(a, b)| a != b) {
        return Err(TranslationError::StructureMismatch(format!(
            "第 {} 个标签不一致: 原文 {} / 译文 {}",
            pos + 1,
            expected[pos],
            actual[pos]
        )));
    }

    if expected.len() != actual.len() {
        return Err(TranslationError::StructureMismatch(format!(
            "标签数量不一致: 原文 {} 个 / 译文 {} 个",
            expected.len(),
            actual.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_whitespace() {
        assert_eq!(
            html_to_text("<p>هاتف <strong>شاومي</strong></p>\n<ul><li>360</li></ul>"),
            "هاتف شاومي 360"
        );
        assert_eq!(html_to_text("   "), "");
    }

    #[test]
    fn truncates_by_characters() {
        let arabic = "شاومي".repeat(40);
        let cut = truncate_chars(&arabic, 150);
        assert_eq!(cut.chars().count(), 150);
        assert_eq!(truncate_chars("short", 150), "short");
    }

    #[test]
    fn signature_normalizes_attributes() {
        let sig = tag_signature(r#"<p class="a" id='x'><br/><img src=y.png alt=""></p>"#);
        assert_eq!(sig.len(), 4);
        assert_eq!(sig[0].name, "p");
        assert_eq!(
            sig[0].attributes,
            vec![("class".to_string(), "a".to_string()), ("id".to_string(), "x".to_string())]
        );
        assert_eq!(sig[1].name, "br");
        assert!(sig[1].attributes.is_empty());
        assert_eq!(sig[2].attributes.len(), 2);
        assert!(sig[3].closing);
    }

    #[test]
    fn identical_structure_passes() {
        let source = r#"<p translate="no">نص <b>عريض</b></p>"#;
        let translated = r#"<p translate='no'>Text <b>bold</b></p>"#;
        assert!(verify_structure(source, translated).is_ok());
    }

    #[test]
    fn changed_attribute_fails() {
        let source = r#"<a href="/ar/page">رابط</a>"#;
        let translated = r#"<a href="/en/page">link</a>"#;
        let err = verify_structure(source, translated).unwrap_err();
        assert!(matches!(err, TranslationError::StructureMismatch(_)));
    }

    #[test]
    fn dropped_tag_fails() {
        let source = "<p>a</p><p>b</p>";
        let translated = "<p>a b</p>";
        assert!(verify_structure(source, translated).is_err());
    }
}
