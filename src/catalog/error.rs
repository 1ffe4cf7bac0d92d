//! 商品目录服务与摘要同步的错误类型

use thiserror::Error;

use crate::catalog::types::{FieldKey, UserError};

/// 目录服务调用错误
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("HTTP请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("目录服务返回 HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL错误: {0}")]
    GraphQl(String),

    #[error("响应缺少数据: {0}")]
    MissingData(String),

    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("未知的可翻译字段: {0}")]
    UnknownFieldKey(String),

    #[error("{operation} 被拒绝: {}", format_user_errors(.errors))]
    Rejected {
        operation: &'static str,
        errors: Vec<UserError>,
    },

    #[error("无效的资源ID: {0:?}（只接受数字或 gid:// 引用；按 handle 查找请用 fetch --handle）")]
    InvalidResourceId(String),
}

fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// 单个条目同步失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 输入数据不完整或不合法
    Validation,
    /// 轮询期间摘要始终没有出现
    DigestUnavailable,
    /// 服务端拒绝了写入
    Rejected,
    /// 调用本身失败（网络、HTTP、GraphQL）
    Remote,
}

/// 单个条目的同步错误
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("缺少商品ID")]
    MissingId,

    #[error("无效的商品ID: {0:?}（只接受数字或 gid:// 引用；按 handle 查找请用 fetch --handle）")]
    InvalidId(String),

    #[error("没有需要写入的译文")]
    EmptyJob,

    #[error("字段 {key} 缺少摘要（原文为空或尚未建立索引）")]
    MissingDigest { key: FieldKey },

    #[error("轮询 {attempts} 次后摘要仍未就绪: {}（请 30-60 秒后重试）", join_keys(.missing))]
    DigestTimeout {
        attempts: u32,
        missing: Vec<FieldKey>,
    },

    #[error("写入占位原文失败: {0}")]
    Seed(#[source] CatalogError),

    #[error("登记译文失败: {0}")]
    Register(#[source] CatalogError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn join_keys(keys: &[FieldKey]) -> String {
    keys.iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SyncError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::MissingId
            | SyncError::InvalidId(_)
            | SyncError::EmptyJob
            | SyncError::MissingDigest { .. } => FailureKind::Validation,
            SyncError::DigestTimeout { .. } => FailureKind::DigestUnavailable,
            SyncError::Seed(e) | SyncError::Register(e) | SyncError::Catalog(e) => match e {
                CatalogError::Rejected { .. } => FailureKind::Rejected,
                CatalogError::InvalidResourceId(_) => FailureKind::Validation,
                _ => FailureKind::Remote,
            },
        }
    }
}
