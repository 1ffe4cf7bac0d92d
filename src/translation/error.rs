//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型，并区分可重试的临时错误与需要立即上报的永久错误

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误（连接失败、超时等，由HTTP层负责）
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 速率限制错误 (HTTP 429)
    #[error("请求速率过快，已达到限制: {0}")]
    RateLimitExceeded(String),

    /// 服务过载 (HTTP 503 / 529)
    #[error("翻译服务过载: {0}")]
    ServiceOverloaded(String),

    /// 翻译服务返回的其他HTTP错误
    #[error("翻译服务错误 (HTTP {status}): {message}")]
    ServiceError { status: u16, message: String },

    /// 缓存错误
    #[error("缓存错误: {0}")]
    CacheError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 翻译服务返回了空结果
    #[error("翻译结果为空")]
    EmptyOutput,

    /// 译文的标签结构与原文不一致
    #[error("HTML结构不一致: {0}")]
    StructureMismatch(String),

    /// 临时错误重试次数耗尽
    #[error("翻译失败，已尝试 {attempts} 次: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TranslationError>,
    },
}

impl TranslationError {
    /// 根据HTTP状态码构造错误
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            429 => TranslationError::RateLimitExceeded(message),
            503 | 529 => TranslationError::ServiceOverloaded(message),
            _ => TranslationError::ServiceError { status, message },
        }
    }

    /// 检查错误是否为临时错误（限流、过载、5xx），只有临时错误才会重试
    pub fn is_transient(&self) -> bool {
        match self {
            TranslationError::RateLimitExceeded(_) => true,
            TranslationError::ServiceOverloaded(_) => true,
            TranslationError::ServiceError { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// 翻译结果不可用（空结果或结构被破坏），调用方应走降级路径
    pub fn is_unusable_output(&self) -> bool {
        matches!(
            self,
            TranslationError::EmptyOutput | TranslationError::StructureMismatch(_)
        )
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        match self {
            TranslationError::ConfigError(msg) => {
                TranslationError::ConfigError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::NetworkError(msg) => {
                TranslationError::NetworkError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::CacheError(msg) => {
                TranslationError::CacheError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::ParseError(msg) => {
                TranslationError::ParseError(format!("{} (上下文: {})", msg, context))
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            TranslationError::from_status(status.as_u16(), error.to_string())
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::CacheError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_transient_kinds() {
        assert!(TranslationError::from_status(429, "slow down").is_transient());
        assert!(TranslationError::from_status(503, "busy").is_transient());
        assert!(TranslationError::from_status(500, "boom").is_transient());
        assert!(TranslationError::from_status(504, "gateway").is_transient());

        assert!(!TranslationError::from_status(400, "bad request").is_transient());
        assert!(!TranslationError::from_status(401, "bad key").is_transient());
        assert!(!TranslationError::NetworkError("reset".into()).is_transient());
        assert!(!TranslationError::EmptyOutput.is_transient());
    }

    #[test]
    fn exhausted_retries_are_not_retried_again() {
        let err = TranslationError::RetriesExhausted {
            attempts: 6,
            last: Box::new(TranslationError::from_status(429, "")),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains('6'));
    }

    #[test]
    fn context_is_appended() {
        let err = TranslationError::ParseError("empty".into()).with_context("title");
        assert_eq!(err.to_string(), "解析错误: empty (上下文: title)");
    }
}
