//! # Catalog Translate
//!
//! 商品目录翻译与译文登记工具库。
//!
//! ## 模块组织
//!
//! - `translation` - 带缓存、重试和译文规范化的翻译引擎
//! - `catalog` - GraphQL Admin API 客户端与摘要同步流程
//! - `utils` - 输入行与导出记录的文件读写
//! - `env` - 环境变量配置

pub mod catalog;
pub mod env;
pub mod translation;
pub mod utils;

pub use catalog::{DigestSynchronizer, ShopifyClient, ShopifyConfig, SyncOptions};
pub use translation::{OpenAiChatClient, TranslationCache, Translator, TranslatorConfig};
