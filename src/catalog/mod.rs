//! 商品目录同步
//!
//! - **client**: GraphQL Admin API 客户端与 [`CatalogService`] 抽象
//! - **types**: 字段键、资源ID、摘要表等数据类型
//! - **job**: 输入行到翻译任务的映射
//! - **sync**: 带摘要依赖处理的译文登记流程

pub mod client;
pub mod error;
pub mod job;
pub mod sync;
pub mod types;

pub use client::{CatalogService, ShopifyClient, ShopifyConfig};
pub use error::{CatalogError, CatalogResult, FailureKind, SyncError};
pub use job::{normalize_cell, ColumnMapping, InputRow, TranslationJob};
pub use sync::{
    build_payload, BatchReport, DigestSynchronizer, ItemFailure, ItemOutcome, SyncOptions,
    SyncStage, SyncSuccess,
};
pub use types::{
    CatalogItem, DigestMap, FieldKey, PrimaryContent, RegisteredTranslation, ResourceId,
    TranslatableContent, TranslationInput, TranslationRecord, UserError,
};
