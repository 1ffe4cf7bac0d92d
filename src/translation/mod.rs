//! 翻译模块
//!
//! 把商品标题和HTML描述从源语言翻译为目标语言：
//! - **client**: 对话补全服务客户端与模型能力描述
//! - **retry**: 临时错误的指数退避重试
//! - **cache**: 基于内容指纹的磁盘缓存
//! - **markup**: 纯文本提取与HTML结构校验
//! - **postprocess**: 译文的确定性规范化
//! - **engine**: 组合以上部分的翻译器
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use catalog_translate::translation::{OpenAiChatClient, TranslationCache, Translator};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiChatClient::new("sk-...", "gpt-4o-mini", None)?;
//! let cache = TranslationCache::open(".translation_cache.json");
//! let mut translator = Translator::new(client, cache);
//!
//! let title = translator.translate_title("هاتف شاومي")?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod engine;
pub mod error;
pub mod markup;
pub mod postprocess;
pub mod record;
pub mod retry;

pub use cache::{CacheKey, CacheStats, TranslationCache};
pub use client::{ChatBackend, ChatRequest, ModelProfile, OpenAiChatClient, TokenParam};
pub use engine::{
    language_name, BatchSummary, CallKind, RecordStatus, RoleInstructions, Translator,
    TranslatorConfig, TranslatorStats,
};
pub use error::{TranslationError, TranslationResult};
pub use postprocess::{postprocess_html, PostprocessOptions};
pub use record::ProductRecord;
pub use retry::RetryPolicy;
