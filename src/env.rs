//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。启动时先读取工作目录下的 `.env`，
//! 进程环境中已有的同名变量优先。

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::catalog::ShopifyConfig;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 读取 `.env` 文件（不存在时忽略）
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => {
            tracing::debug!("已加载 {}", path.display());
            Some(path)
        }
        Err(_) => None,
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.trim().to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }

    /// 原文语言代码
    pub struct OriginalLanguage;
    impl EnvVar<String> for OriginalLanguage {
        const NAME: &'static str = "ORIGINAL_LANGUAGE";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("ar".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Source language code of the catalog content";

        fn parse(value: &str) -> EnvResult<String> {
            parse_locale(value, Self::NAME)
        }
    }

    /// 目标语言代码
    pub struct TargetLanguage;
    impl EnvVar<String> for TargetLanguage {
        const NAME: &'static str = "TARGET_LANGUAGE";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("en".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Target locale code (e.g. en, en-GB)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_locale(value, Self::NAME)
        }
    }
}

/// 店铺相关环境变量
pub mod shopify {
    use super::*;

    /// 店铺域名
    pub struct StoreDomain;
    impl EnvVar<String> for StoreDomain {
        const NAME: &'static str = "SHOPIFY_STORE_DOMAIN";
        const DEFAULT: Option<String> = None; // 无默认值，必须设置
        const DESCRIPTION: &'static str = "Store domain, e.g. your-shop.myshopify.com";

        fn parse(value: &str) -> EnvResult<String> {
            parse_required(value, Self::NAME)
        }
    }

    /// Admin API 访问令牌
    pub struct AccessToken;
    impl EnvVar<String> for AccessToken {
        const NAME: &'static str = "SHOPIFY_ADMIN_ACCESS_TOKEN";
        const DEFAULT: Option<String> = None; // 无默认值，必须设置
        const DESCRIPTION: &'static str =
            "Admin API access token (scopes: read_translations, write_translations, write_products for seeding)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_required(value, Self::NAME)
        }
    }

    /// API版本
    pub struct ApiVersion;
    impl EnvVar<String> for ApiVersion {
        const NAME: &'static str = "SHOPIFY_API_VERSION";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::catalog::client::DEFAULT_API_VERSION.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Admin API version (YYYY-MM)";

        fn parse(value: &str) -> EnvResult<String> {
            let version = value.trim();
            let valid = version.len() == 7
                && version.as_bytes()[4] == b'-'
                && version
                    .chars()
                    .enumerate()
                    .all(|(i, c)| i == 4 || c.is_ascii_digit());
            if valid || version == "unstable" {
                Ok(version.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid API version '{}'. Use YYYY-MM or 'unstable'", value),
                })
            }
        }
    }
}

/// 翻译服务相关环境变量
pub mod openai {
    use super::*;

    /// API密钥
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "OPENAI_API_KEY";
        const DEFAULT: Option<String> = None; // 无默认值，必须设置
        const DESCRIPTION: &'static str = "API key for the chat-completions service";

        fn parse(value: &str) -> EnvResult<String> {
            parse_required(value, Self::NAME)
        }
    }

    /// 模型名称
    pub struct Model;
    impl EnvVar<String> for Model {
        const NAME: &'static str = "OPENAI_MODEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::client::DEFAULT_MODEL.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Model used for translation";

        fn parse(value: &str) -> EnvResult<String> {
            parse_required(value, Self::NAME)
        }
    }

    /// API地址
    pub struct BaseUrl;
    impl EnvVar<String> for BaseUrl {
        const NAME: &'static str = "OPENAI_BASE_URL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::client::DEFAULT_BASE_URL.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Base URL of an OpenAI-compatible API";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存文件路径
    pub struct Path;
    impl EnvVar<Option<PathBuf>> for Path {
        const NAME: &'static str = "TRANSLATION_CACHE";
        const DEFAULT: Option<Option<PathBuf>> = None;

        fn get() -> EnvResult<Option<PathBuf>> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(Some(PathBuf::from(".translation_cache.json"))),
            }
        }
        const DESCRIPTION: &'static str = "Translation cache file (empty disables persistence)";

        fn parse(value: &str) -> EnvResult<Option<PathBuf>> {
            let path = value.trim();
            Ok((!path.is_empty()).then(|| PathBuf::from(path)))
        }
    }
}

/// 辅助函数
fn parse_required(value: &str, var_name: &str) -> EnvResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value cannot be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

fn parse_locale(value: &str, var_name: &str) -> EnvResult<String> {
    let locale = value.trim();
    let valid = !locale.is_empty()
        && locale
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(locale.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid locale '{}'. Use codes like en, ar, en-GB", value),
        })
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if secret.chars().count() > 10 {
        format!("{}…", visible)
    } else {
        "[configured]".to_string()
    }
}

/// 目录同步所需配置
#[derive(Debug, Clone)]
pub struct CatalogEnv {
    pub store_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub target_language: String,
}

impl CatalogEnv {
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            store_domain: shopify::StoreDomain::get()?,
            access_token: shopify::AccessToken::get()?,
            api_version: shopify::ApiVersion::get()?,
            target_language: core::TargetLanguage::get()?,
        })
    }

    pub fn shopify_config(&self) -> ShopifyConfig {
        ShopifyConfig::new(&self.store_domain, &self.access_token)
            .with_api_version(&self.api_version)
    }

    /// 输出配置摘要（隐藏敏感信息）
    pub fn log_summary(&self) {
        tracing::info!("店铺: {} (API {})", self.store_domain, self.api_version);
        tracing::info!("访问令牌: {}", mask(&self.access_token));
        tracing::info!("目标语言: {}", self.target_language);
    }
}

/// 翻译所需配置
#[derive(Debug, Clone)]
pub struct TranslatorEnv {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub cache_path: Option<PathBuf>,
    pub original_language: String,
    pub target_language: String,
}

impl TranslatorEnv {
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            api_key: openai::ApiKey::get()?,
            model: openai::Model::get()?,
            base_url: openai::BaseUrl::get()?,
            cache_path: cache::Path::get()?,
            original_language: core::OriginalLanguage::get()?,
            target_language: core::TargetLanguage::get()?,
        })
    }

    /// 输出配置摘要（隐藏敏感信息）
    pub fn log_summary(&self) {
        tracing::info!("模型: {} ({})", self.model, self.base_url);
        tracing::info!("API密钥: {}", mask(&self.api_key));
        tracing::info!("语言: {} → {}", self.original_language, self.target_language);
        match &self.cache_path {
            Some(path) => tracing::info!("缓存: {}", path.display()),
            None => tracing::info!("缓存: OFF"),
        }
    }
}

fn doc_line(name: &str, description: &str, default: &str) -> String {
    format!("- `{}`: {} (default: {})\n", name, description, default)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");
    docs.push_str("Values are read from the process environment, then from `.env` in the working directory.\n");

    docs.push_str("\n## Core Configuration\n\n");
    docs.push_str(&doc_line(core::LogLevel::NAME, core::LogLevel::DESCRIPTION, "info"));
    docs.push_str(&doc_line(core::NoColor::NAME, core::NoColor::DESCRIPTION, "unset"));
    docs.push_str(&doc_line(core::OriginalLanguage::NAME, core::OriginalLanguage::DESCRIPTION, "ar"));
    docs.push_str(&doc_line(core::TargetLanguage::NAME, core::TargetLanguage::DESCRIPTION, "en"));

    docs.push_str("\n## Store Configuration\n\n");
    docs.push_str(&doc_line(shopify::StoreDomain::NAME, shopify::StoreDomain::DESCRIPTION, "required"));
    docs.push_str(&doc_line(shopify::AccessToken::NAME, shopify::AccessToken::DESCRIPTION, "required"));
    docs.push_str(&doc_line(
        shopify::ApiVersion::NAME,
        shopify::ApiVersion::DESCRIPTION,
        crate::catalog::client::DEFAULT_API_VERSION,
    ));

    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&doc_line(openai::ApiKey::NAME, openai::ApiKey::DESCRIPTION, "required"));
    docs.push_str(&doc_line(
        openai::Model::NAME,
        openai::Model::DESCRIPTION,
        crate::translation::client::DEFAULT_MODEL,
    ));
    docs.push_str(&doc_line(
        openai::BaseUrl::NAME,
        openai::BaseUrl::DESCRIPTION,
        crate::translation::client::DEFAULT_BASE_URL,
    ));

    docs.push_str("\n## Cache Configuration\n\n");
    docs.push_str(&doc_line(cache::Path::NAME, cache::Path::DESCRIPTION, ".translation_cache.json"));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_locale_validation() {
        assert_eq!(core::TargetLanguage::parse(" en-GB ").unwrap(), "en-GB");
        assert_eq!(core::OriginalLanguage::parse("ar").unwrap(), "ar");

        assert!(core::TargetLanguage::parse("").is_err());
        assert!(core::TargetLanguage::parse("en_GB").is_err());
        assert!(core::TargetLanguage::parse("en-").is_err());
    }

    #[test]
    fn test_api_version_validation() {
        assert!(shopify::ApiVersion::parse("2025-07").is_ok());
        assert!(shopify::ApiVersion::parse("unstable").is_ok());

        assert!(shopify::ApiVersion::parse("2025-7").is_err());
        assert!(shopify::ApiVersion::parse("latest").is_err());
    }

    #[test]
    fn test_required_values() {
        assert!(shopify::AccessToken::parse("   ").is_err());
        assert_eq!(openai::ApiKey::parse(" sk-test ").unwrap(), "sk-test");
    }

    #[test]
    fn test_url_validation() {
        assert!(openai::BaseUrl::parse("http://localhost:8080/v1").is_ok());
        assert!(openai::BaseUrl::parse("api.openai.com").is_err());
    }

    #[test]
    fn test_empty_cache_path_disables_persistence() {
        assert_eq!(cache::Path::parse("").unwrap(), None);
        assert_eq!(
            cache::Path::parse("cache/tr.json").unwrap(),
            Some(PathBuf::from("cache/tr.json"))
        );
    }

    #[test]
    fn test_secret_masking() {
        assert_eq!(mask("shpat_1234567890abcdef"), "shpat_…");
        assert_eq!(mask("short"), "[configured]");
    }

    #[test]
    fn test_catalog_env_loading() {
        env::set_var("SHOPIFY_STORE_DOMAIN", "demo.myshopify.com");
        env::set_var("SHOPIFY_ADMIN_ACCESS_TOKEN", "shpat_test");
        env::set_var("SHOPIFY_API_VERSION", "2024-10");

        let config = CatalogEnv::from_env().unwrap();
        assert_eq!(config.store_domain, "demo.myshopify.com");
        assert_eq!(
            config.shopify_config().endpoint().unwrap().as_str(),
            "https://demo.myshopify.com/admin/api/2024-10/graphql.json"
        );

        env::remove_var("SHOPIFY_STORE_DOMAIN");
        env::remove_var("SHOPIFY_ADMIN_ACCESS_TOKEN");
        env::remove_var("SHOPIFY_API_VERSION");

        let err = CatalogEnv::from_env().unwrap_err();
        assert_eq!(err.variable, "SHOPIFY_STORE_DOMAIN");
    }

    #[test]
    fn test_docs_list_every_variable() {
        let docs = generate_env_docs();
        for name in [
            "LOG_LEVEL",
            "NO_COLOR",
            "ORIGINAL_LANGUAGE",
            "TARGET_LANGUAGE",
            "SHOPIFY_STORE_DOMAIN",
            "SHOPIFY_ADMIN_ACCESS_TOKEN",
            "SHOPIFY_API_VERSION",
            "OPENAI_API_KEY",
            "OPENAI_MODEL",
            "OPENAI_BASE_URL",
            "TRANSLATION_CACHE",
        ] {
            assert!(docs.contains(name), "{} missing from docs", name);
        }
    }
}
