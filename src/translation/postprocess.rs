//! 译文规范化
//!
//! 对成功翻译的HTML做确定性的字符串改写。各步骤可单独开关，按固定顺序执行：
//! 单位 → 品牌 → 措辞 → 删除元信息段落 → 去掉 `translate="no"` 属性。
//! 品牌改写必须先于段落删除，否则包含原文品牌名的段落可能在规范化之前被删掉。
//! 每条规则对自身的输出都是幂等的。

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

/// 品牌名对照表（原文写法 → 拉丁字母规范写法）
pub const BRAND_MAP: &[(&str, &str)] = &[
    ("شاومي", "Xiaomi"),
    ("سامسونج", "Samsung"),
    ("ابل", "Apple"),
    ("أبل", "Apple"),
    ("هواوي", "Huawei"),
    ("انكر", "Anker"),
];

/// 需要删除的元信息段落标签
const META_LABELS: &[&str] = &[
    "Product name in Arabic",
    "Product name in English",
    "اسم المنتج بالعربي",
    "اسم المنتج بالإنجليزي",
];

/// 规范化选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostprocessOptions {
    pub normalize_units: bool,
    pub normalize_brands: bool,
    pub fix_phrasing: bool,
    pub drop_meta: bool,
    pub strip_translate_no: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self {
            normalize_units: true,
            normalize_brands: true,
            fix_phrasing: true,
            drop_meta: true,
            strip_translate_no: false,
        }
    }
}

fn build(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .unwrap_or_else(|e| panic!("内置正则无效 {}: {}", pattern, e))
}

/// (正则, 替换模板)
type Rule = (Regex, &'static str);

fn unit_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (build(r"\b360\s*degrees?\b", true), "360°"),
            (build(r"(-?\d+)\s*degrees?\s*Celsius", true), "${1}°C"),
            (build(r"\b(\d+)\s*grams?\b", true), "${1} g"),
            (build(r"\b(\d+)\s*millimeters?\b", true), "${1} mm"),
            (build(r"(\d)mm\b", true), "${1} mm"),
        ]
    })
}

fn ampersand_rule() -> &'static Rule {
    static RULE: OnceLock<Rule> = OnceLock::new();
    RULE.get_or_init(|| (build(r"\b(C400)\s+and\s+(C200)\b", false), "${1} & ${2}"))
}

fn phrasing_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (
                build(r"Works with Google Home\s+and\s+Alexa", true),
                "Works with Google Home & Amazon Alexa",
            ),
            (
                build(r"\((?:Assumed|Not mentioned)[^)]*\)", true),
                "Not specified",
            ),
            (build(r">Input<", false), ">Power input<"),
            (build(r">Wireless connection<", true), ">Wireless<"),
            (build(r">Item dimensions<", true), ">Dimensions<"),
        ]
    })
}

/// 每个品牌三条规则：`Brand: X`、`<strong>Brand:</strong> X`、独立出现的词
fn brand_rules() -> &'static [(Regex, String)] {
    static RULES: OnceLock<Vec<(Regex, String)>> = OnceLock::new();
    RULES.get_or_init(|| {
        BRAND_MAP
            .iter()
            .flat_map(|(source, canonical)| {
                let escaped = regex::escape(source);
                [
                    (
                        build(&format!(r"Brand:\s*{}\b", escaped), true),
                        format!("Brand: {}", canonical),
                    ),
                    (
                        build(&format!(r"<strong>Brand:</strong>\s*{}\b", escaped), true),
                        format!("<strong>Brand:</strong> {}", canonical),
                    ),
                    (build(&format!(r"\b{}\b", escaped), false), canonical.to_string()),
                ]
            })
            .collect()
    })
}

fn meta_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        META_LABELS
            .iter()
            .map(|label| {
                build(
                    &format!(
                        r"<p[^>]*>\s*(?:<strong>)?\s*{}\s*:.*?</p>",
                        regex::escape(label)
                    ),
                    true,
                )
            })
            .collect()
    })
}

fn blank_lines() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| build(r"\n{2,}", false))
}

fn translate_no_attr() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| build(r#"\s*translate\s*=\s*"(?:no|false)""#, true))
}

fn space_between_tags() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| build(r">\s+</", false))
}

fn apply(rules: &[Rule], text: &str) -> String {
    rules.iter().fold(text.to_string(), |acc, (re, rep)| {
        re.replace_all(&acc, *rep).into_owned()
    })
}

/// 数字与单位的规范写法
pub fn normalize_units_symbols(text: &str) -> String {
    apply(unit_rules(), text)
}

/// 把原文品牌名替换为拉丁字母写法
pub fn normalize_brand_names(html: &str) -> String {
    brand_rules()
        .iter()
        .fold(html.to_string(), |acc, (re, rep)| {
            re.replace_all(&acc, regex::NoExpand(rep)).into_owned()
        })
}

/// 两个型号之间的 "and" 改为 "&"
pub fn join_model_codes(text: &str) -> String {
    let (re, rep) = ampersand_rule();
    re.replace_all(text, *rep).into_owned()
}

/// 固定措辞修正
pub fn normalize_phrasing(html: &str) -> String {
    apply(phrasing_rules(), &join_model_codes(html))
}

/// 删除重复说明商品名的元信息段落
pub fn drop_meta_lines(html: &str) -> String {
    let stripped = meta_rules()
        .iter()
        .fold(html.to_string(), |acc, re| re.replace_all(&acc, "").into_owned());
    blank_lines().replace_all(&stripped, "\n").into_owned()
}

/// 去掉 `translate="no"` / `translate="false"` 属性
pub fn strip_translate_no_attr(html: &str) -> String {
    translate_no_attr().replace_all(html, "").into_owned()
}

/// 按固定顺序执行全部已开启的规范化步骤
pub fn postprocess_html(html: &str, options: &PostprocessOptions) -> String {
    let mut out = html.to_string();
    if options.normalize_units {
        out = normalize_units_symbols(&out);
    }
    if options.normalize_brands {
        out = normalize_brand_names(&out);
    }
    if options.fix_phrasing {
        out = normalize_phrasing(&out);
    }
    if options.drop_meta {
        out = drop_meta_lines(&out);
    }
    if options.strip_translate_no {
        out = strip_translate_no_attr(&out);
    }
    space_between_tags().replace_all(&out, "></").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_are_canonicalized() {
        assert_eq!(normalize_units_symbols("rotates 360 degrees"), "rotates 360°");
        assert_eq!(normalize_units_symbols("360 Degree view"), "360° view");
        assert_eq!(
            normalize_units_symbols("works down to -10 degrees Celsius"),
            "works down to -10°C"
        );
        assert_eq!(normalize_units_symbols("weighs 250 grams"), "weighs 250 g");
        assert_eq!(normalize_units_symbols("1 gram"), "1 g");
        assert_eq!(normalize_units_symbols("78 millimeters"), "78 mm");
        assert_eq!(normalize_units_symbols("78mm wide"), "78 mm wide");
    }

    #[test]
    fn brands_are_canonicalized() {
        assert_eq!(
            normalize_brand_names("<p><strong>Brand:</strong> شاومي</p>"),
            "<p><strong>Brand:</strong> Xiaomi</p>"
        );
        assert_eq!(normalize_brand_names("Brand: هواوي"), "Brand: Huawei");
        assert_eq!(normalize_brand_names("brand:سامسونج"), "Brand: Samsung");
        assert_eq!(normalize_brand_names("هاتف أبل الجديد"), "هاتف Apple الجديد");
        // 词的一部分不替换
        assert_eq!(normalize_brand_names("الابلاغ"), "الابلاغ");
    }

    #[test]
    fn phrasing_fixups() {
        assert_eq!(normalize_phrasing("C400 and C200"), "C400 & C200");
        assert_eq!(
            normalize_phrasing("Works with Google Home and Alexa"),
            "Works with Google Home & Amazon Alexa"
        );
        assert_eq!(
            normalize_phrasing("<td>(Assumed based on the model)</td>"),
            "<td>Not specified</td>"
        );
        assert_eq!(
            normalize_phrasing("<td>(not mentioned)</td>"),
            "<td>Not specified</td>"
        );
        assert_eq!(
            normalize_phrasing("<th>Input</th><th>Wireless connection</th><th>Item dimensions</th>"),
            "<th>Power input</th><th>Wireless</th><th>Dimensions</th>"
        );
    }

    #[test]
    fn meta_paragraphs_are_dropped() {
        let html = "<p><strong>Product name in Arabic:</strong> هاتف</p>\n\n<p>Keep me</p>\n<p>اسم المنتج بالإنجليزي: Phone</p>";
        assert_eq!(drop_meta_lines(html), "\n<p>Keep me</p>\n");
    }

    #[test]
    fn translate_attribute_is_optional() {
        let html = r#"<span translate="no">Xiaomi</span>"#;
        let kept = postprocess_html(html, &PostprocessOptions::default());
        assert_eq!(kept, html);

        let stripped = postprocess_html(
            html,
            &PostprocessOptions {
                strip_translate_no: true,
                ..Default::default()
            },
        );
        assert_eq!(stripped, "<span>Xiaomi</span>");
    }

    #[test]
    fn brand_runs_before_meta_removal() {
        let html = "<p>Brand: شاومي</p><p>Product name in English: Phone</p>";
        let out = postprocess_html(html, &PostprocessOptions::default());
        assert_eq!(out, "<p>Brand: Xiaomi</p>");
    }

    #[test]
    fn disabled_steps_leave_text_alone() {
        let options = PostprocessOptions {
            normalize_units: false,
            normalize_brands: false,
            fix_phrasing: false,
            drop_meta: false,
            strip_translate_no: false,
        };
        let html = "<p>شاومي 360 degrees</p>";
        assert_eq!(postprocess_html(html, &options), html);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let options = PostprocessOptions {
            strip_translate_no: true,
            ..Default::default()
        };
        let samples = [
            "<p>Xiaomi camera rotates 360 degrees, 78mm, 250 grams, -10 degrees Celsius</p>",
            "<p><strong>Brand:</strong> شاومي</p><p>Product name in Arabic: كاميرا</p>\n\n\n<p>C400 and C200</p>",
            r#"<table><tr><th>Input</th><td>(Assumed 5V)</td></tr></table> <p translate="no">Works with Google Home and Alexa</p>"#,
            "<ul>\n  <li>  </li>\n</ul>",
        ];

        for sample in samples {
            let once = postprocess_html(sample, &options);
            let twice = postprocess_html(&once, &options);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }
}
