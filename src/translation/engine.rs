//! 翻译引擎
//!
//! 把源语言的标题和HTML描述翻译为目标语言。每次远程调用都经过三层包装：
//!
//! - **缓存**: 以 (调用类型, 模型, 角色指令, 用户消息) 的指纹查询，命中则不发请求
//! - **重试**: 临时错误按 [`RetryPolicy`] 指数退避
//! - **校验**: HTML译文必须保留原文的标签和属性，否则视为失败
//!
//! 描述翻译失败时会退回到纯文本翻译，最后统一经过 [`postprocess_html`] 规范化。

use crate::translation::cache::{CacheKey, TranslationCache};
use crate::translation::client::{ChatBackend, ChatRequest};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::markup::{collapse_whitespace, html_to_text, truncate_chars, verify_structure};
use crate::translation::postprocess::{join_model_codes, postprocess_html, PostprocessOptions};
use crate::translation::record::ProductRecord;
use crate::translation::retry::RetryPolicy;

/// 远程调用类型，参与缓存指纹计算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Html,
    Text,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Html => "translate_html",
            CallKind::Text => "translate_text",
        }
    }
}

/// 翻译器配置
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// 源语言名称（用于角色指令）
    pub source_language: String,
    /// 目标语言名称
    pub target_language: String,
    /// HTML翻译的token上限
    pub html_max_tokens: u32,
    /// 纯文本翻译的token上限
    pub text_max_tokens: u32,
    pub temperature: f32,
    /// 标题最大字符数
    pub title_max_chars: usize,
    /// 是否校验HTML译文的标签结构
    pub verify_structure: bool,
    /// 标题翻译失败时是否退回源文本
    pub passthrough_on_failure: bool,
    pub postprocess: PostprocessOptions,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_language: "Arabic".to_string(),
            target_language: "English".to_string(),
            html_max_tokens: 2000,
            text_max_tokens: 400,
            temperature: 0.0,
            title_max_chars: 150,
            verify_structure: true,
            passthrough_on_failure: true,
            postprocess: PostprocessOptions::default(),
        }
    }
}

impl TranslatorConfig {
    /// 按语言代码（如 `ar`、`en-GB`）设置源语言和目标语言
    pub fn for_locales(source: &str, target: &str) -> Self {
        Self {
            source_language: language_name(source),
            target_language: language_name(target),
            ..Self::default()
        }
    }
}

/// 语言代码对应的英文名称，未知代码原样返回
pub fn language_name(code: &str) -> String {
    let primary = code
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or(code)
        .to_lowercase();
    let name = match primary.as_str() {
        "ar" => "Arabic",
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "tr" => "Turkish",
        "ru" => "Russian",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "fa" => "Persian",
        "ur" => "Urdu",
        "he" => "Hebrew",
        _ => return code.to_string(),
    };
    name.to_string()
}

/// 两类调用的角色指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInstructions {
    pub html: String,
    pub text: String,
}

impl RoleInstructions {
    pub fn for_languages(source: &str, target: &str) -> Self {
        let html = format!(
            "You are a precise technical translator.\n\
             Translate {source} to {target}.\n\
             RULES:\n\
             • Translate ONLY human-visible text. Preserve ALL HTML tags/attributes/order exactly.\n\
             • Do NOT add, remove, or infer features/specs.\n\
             • Keep numbers/units/measurements exactly.\n\
             • Do NOT translate brand names or model codes; leave them verbatim.\n\
             • Return ONLY the translated HTML string."
        );
        let text = format!(
            "Translate {source} to {target} precisely. No additions. Keep numbers/units. \
             Do not translate brands/models."
        );
        Self { html, text }
    }
}

impl Default for RoleInstructions {
    fn default() -> Self {
        Self::for_languages("Arabic", "English")
    }
}

/// 翻译统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslatorStats {
    /// 实际发出的远程调用次数（包括重试）
    pub remote_calls: usize,
    pub cache_hits: usize,
    pub characters_sent: usize,
    pub characters_received: usize,
    /// 最终失败的调用次数
    pub failed_calls: usize,
    /// 描述走纯文本降级的次数
    pub fallbacks: usize,
}

/// 单条记录的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// 已有译文，未发起任何调用
    Skipped,
    Translated,
}

/// 一批记录的处理汇总
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub translated: usize,
    pub skipped: usize,
    /// (记录序号, 记录ID, 错误)
    pub failures: Vec<(usize, String, TranslationError)>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.translated + self.skipped + self.failed()
    }
}

/// 翻译器
pub struct Translator<B: ChatBackend> {
    backend: B,
    cache: TranslationCache,
    retry: RetryPolicy,
    config: TranslatorConfig,
    roles: RoleInstructions,
    stats: TranslatorStats,
}

impl<B: ChatBackend> Translator<B> {
    pub fn new(backend: B, cache: TranslationCache) -> Self {
        Self::with_config(backend, cache, TranslatorConfig::default())
    }

    pub fn with_config(backend: B, cache: TranslationCache, config: TranslatorConfig) -> Self {
        let roles = RoleInstructions::for_languages(&config.source_language, &config.target_language);
        Self {
            backend,
            cache,
            retry: RetryPolicy::default(),
            config,
            roles,
            stats: TranslatorStats::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn roles(&self) -> &RoleInstructions {
        &self.roles
    }

    pub fn stats(&self) -> &TranslatorStats {
        &self.stats
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 立即把缓存写回磁盘
    pub fn flush_cache(&mut self) -> TranslationResult<()> {
        self.cache.flush()
    }

    /// 带缓存和重试的一次远程调用
    ///
    /// `validate` 在写入缓存之前执行，未通过校验的译文不会被缓存。
    fn cached_call<V>(
        &mut self,
        kind: CallKind,
        system: &str,
        user: &str,
        max_tokens: u32,
        validate: V,
    ) -> TranslationResult<String>
    where
        V: Fn(&str) -> TranslationResult<()>,
    {
        let fingerprint = CacheKey {
            kind: kind.as_str(),
            model: &self.backend.profile().model,
            system,
            user,
        }
        .fingerprint();

        if let Some(hit) = self.cache.get(&fingerprint) {
            tracing::debug!("缓存命中 {} ({}...)", kind.as_str(), &fingerprint[..12]);
            self.stats.cache_hits += 1;
            return Ok(hit);
        }

        let request = ChatRequest::new(system, user)
            .with_max_tokens(max_tokens)
            .with_temperature(self.config.temperature);

        let backend = &self.backend;
        let mut calls = 0;
        let result = self.retry.run(|_| {
            calls += 1;
            backend.complete(&request)
        });
        self.stats.remote_calls += calls;
        self.stats.characters_sent += system.chars().count() + user.chars().count();

        let output = match result {
            Ok(raw) => raw.trim().to_string(),
            Err(e) => {
                self.stats.failed_calls += 1;
                return Err(e);
            }
        };
        self.stats.characters_received += output.chars().count();

        if output.is_empty() {
            self.stats.failed_calls += 1;
            return Err(TranslationError::EmptyOutput);
        }
        if let Err(e) = validate(&output) {
            self.stats.failed_calls += 1;
            return Err(e);
        }

        self.cache.put(fingerprint, output.clone());
        Ok(output)
    }

    /// 翻译纯文本；空白输入直接返回空字符串
    pub fn translate_text(&mut self, source: &str, role: &str) -> TranslationResult<String> {
        if source.trim().is_empty() {
            return Ok(String::new());
        }
        let max_tokens = self.config.text_max_tokens;
        self.cached_call(CallKind::Text, role, source, max_tokens, |_| Ok(()))
    }

    /// 翻译HTML片段，保留全部标签和属性
    pub fn translate_html(&mut self, source_html: &str, role: &str) -> TranslationResult<String> {
        if source_html.trim().is_empty() {
            return Ok(String::new());
        }

        let user = format!(
            "Task: Translate the inner text of this HTML snippet from {} to {}.\n\
             Return only the translated HTML (same tags & attributes):\n\n{}",
            self.config.source_language, self.config.target_language, source_html
        );
        let max_tokens = self.config.html_max_tokens;
        let check = self.config.verify_structure;

        self.cached_call(CallKind::Html, role, &user, max_tokens, |output| {
            if check {
                verify_structure(source_html, output)
            } else {
                Ok(())
            }
        })
    }

    /// 翻译标题：提取纯文本后翻译，压缩空白并截断
    pub fn translate_title(&mut self, source_html: &str) -> TranslationResult<String> {
        let text = html_to_text(source_html);
        if text.is_empty() {
            return Ok(String::new());
        }

        let role = self.roles.text.clone();
        let translated = self.translate_text(&text, &role)?;
        let polished = collapse_whitespace(&join_model_codes(&translated));
        Ok(truncate_chars(&polished, self.config.title_max_chars))
    }

    /// 翻译描述；HTML翻译失败时退回纯文本翻译并包一层 `<p>`
    pub fn translate_description(&mut self, source_html: &str) -> TranslationResult<String> {
        if source_html.trim().is_empty() {
            return Ok(String::new());
        }

        let role = self.roles.html.clone();
        let translated = match self.translate_html(source_html, &role) {
            Ok(html) => html,
            Err(e) => {
                if e.is_unusable_output() {
                    tracing::warn!("HTML译文不可用，改用纯文本翻译: {}", e);
                } else {
                    tracing::warn!("HTML翻译失败，改用纯文本翻译: {}", e);
                }
                self.stats.fallbacks += 1;
                self.fallback_description(source_html)?
            }
        };

        Ok(postprocess_html(&translated, &self.config.postprocess))
    }

    fn fallback_description(&mut self, source_html: &str) -> TranslationResult<String> {
        let role = self.roles.text.clone();
        match self.translate_text(&html_to_text(source_html), &role) {
            Ok(plain) if plain.is_empty() => Ok(String::new()),
            Ok(plain) => Ok(format!("<p>{}</p>", plain)),
            Err(TranslationError::EmptyOutput) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// 处理一条记录
    ///
    /// 两个目标字段都已填写且未指定 `force` 时跳过。标题失败可按配置退回源文本；
    /// 描述失败时返回错误，已写入的标题保留。
    pub fn process_record(
        &mut self,
        record: &mut ProductRecord,
        force: bool,
    ) -> TranslationResult<RecordStatus> {
        if record.is_translated() && !force {
            return Ok(RecordStatus::Skipped);
        }

        if !record.title_source.trim().is_empty() {
            match self.translate_title(&record.title_source) {
                Ok(title) => record.title_target = Some(title),
                Err(e) if self.config.passthrough_on_failure => {
                    tracing::warn!("标题翻译失败，保留源文本: {}", e);
                    record.title_target = Some(html_to_text(&record.title_source));
                }
                Err(e) => return Err(e.with_context(format!("标题 {}", record.id))),
            }
        }

        if !record.description_source.trim().is_empty() {
            let description = self.translate_description(&record.description_source)?;
            record.description_target = Some(description);
        }

        Ok(RecordStatus::Translated)
    }

    /// 依次处理全部记录；单条失败不会中断整批
    pub fn process_records(&mut self, records: &mut [ProductRecord], force: bool) -> BatchSummary {
        let total = records.len();
        let mut summary = BatchSummary::default();

        for (i, record) in records.iter_mut().enumerate() {
            match self.process_record(record, force) {
                Ok(RecordStatus::Skipped) => {
                    tracing::info!("• {}/{} 跳过（已有译文） {}", i + 1, total, record.id);
                    summary.skipped += 1;
                }
                Ok(RecordStatus::Translated) => {
                    tracing::info!("• {}/{} 已翻译 {}", i + 1, total, record.id);
                    summary.translated += 1;
                }
                Err(e) => {
                    tracing::error!("• {}/{} 翻译失败 {}: {}", i + 1, total, record.id, e);
                    summary.failures.push((i, record.id.clone(), e));
                }
            }

            // 逐条落盘，进程被中断时已完成的译文不会丢失
            if let Err(e) = self.cache.flush() {
                tracing::warn!("缓存保存失败: {}", e);
            }
        }

        tracing::info!(
            "翻译完成: {} 条已翻译, {} 条跳过, {} 条失败 (远程调用 {} 次, 缓存命中率 {:.0}%)",
            summary.translated,
            summary.skipped,
            summary.failed(),
            self.stats.remote_calls,
            self.cache.stats().hit_rate() * 100.0
        );
        summary
    }
}
