//! 摘要同步
//!
//! 每次写入译文都必须带上当前主语言内容的摘要。单个条目的处理流程：
//!
//! 1. 读取当前摘要
//! 2. 检查任务中每个有值的字段是否都有摘要
//! 3. 缺失且允许时写入占位原文，然后轮询直到摘要出现
//! 4. 组装 `(key, value, locale, digest)` 列表并一次性登记
//! 5. 回读该语言的译文并记录日志
//!
//! 登记和回读都不重试。批处理中任何单个条目的错误都不会中断整批。

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::catalog::client::CatalogService;
use crate::catalog::error::SyncError;
use crate::catalog::job::{ColumnMapping, InputRow, TranslationJob};
use crate::catalog::types::{
    DigestMap, FieldKey, PrimaryContent, RegisteredTranslation, ResourceId, TranslationInput,
    TranslationRecord,
};

/// 同步选项
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 目标语言代码
    pub locale: String,
    /// 摘要缺失时是否写入占位原文
    pub ensure_base: bool,
    pub base_title: String,
    pub base_description: String,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    /// 登记后是否回读
    pub verify: bool,
    pub mapping: ColumnMapping,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            ensure_base: false,
            base_title: "—".to_string(),
            base_description: "<p>—</p>".to_string(),
            poll_interval: Duration::from_millis(700),
            poll_attempts: 20,
            verify: true,
            mapping: ColumnMapping::default(),
        }
    }
}

/// 条目处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    ResolveJob,
    FetchDigests,
    CheckCompleteness,
    SeedPrimary,
    PollForDigests,
    BuildPayload,
    Register,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::ResolveJob => "resolve",
            SyncStage::FetchDigests => "fetch-digests",
            SyncStage::CheckCompleteness => "check",
            SyncStage::SeedPrimary => "seed",
            SyncStage::PollForDigests => "poll",
            SyncStage::BuildPayload => "build",
            SyncStage::Register => "register",
        };
        f.write_str(name)
    }
}

/// 条目失败：出错阶段与原因
#[derive(Debug)]
pub struct ItemFailure {
    pub stage: SyncStage,
    pub error: SyncError,
}

impl ItemFailure {
    fn at(stage: SyncStage) -> impl FnOnce(SyncError) -> Self {
        move |error| Self { stage, error }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}

/// 条目成功时的结果
#[derive(Debug, Clone, Default)]
pub struct SyncSuccess {
    /// 写入过占位原文的字段
    pub seeded: Vec<FieldKey>,
    pub registered: Vec<RegisteredTranslation>,
    pub verified: Vec<TranslationRecord>,
}

/// 单个条目的处理报告
#[derive(Debug)]
pub struct ItemOutcome {
    /// 输入中的序号（从1开始）
    pub index: usize,
    pub id: Option<ResourceId>,
    pub result: Result<SyncSuccess, ItemFailure>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 整批处理报告
#[derive(Debug, Default)]
pub struct BatchReport {
    pub ok: usize,
    pub failed: usize,
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| !item.is_ok())
    }
}

/// 为任务中每个有值的字段组装登记输入
///
/// 缺少摘要的字段会导致 [`SyncError::MissingDigest`]。
pub fn build_payload(
    job: &TranslationJob,
    digests: &DigestMap,
) -> Result<Vec<TranslationInput>, SyncError> {
    job.values
        .iter()
        .map(|(key, value)| -> Result<TranslationInput, SyncError> {
            let digest = digests
                .get(*key)
                .ok_or(SyncError::MissingDigest { key: *key })?;
            Ok(TranslationInput {
                key: *key,
                value: value.clone(),
                locale: job.locale.clone(),
                translatable_content_digest: digest.to_string(),
            })
        })
        .collect()
}

/// 摘要同步器
pub struct DigestSynchronizer<C: CatalogService> {
    catalog: C,
    options: SyncOptions,
}

impl<C: CatalogService> DigestSynchronizer<C> {
    pub fn new(catalog: C, options: SyncOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// 处理一个任务
    pub fn sync_job(&self, job: &TranslationJob) -> Result<SyncSuccess, ItemFailure> {
        let mut digests = self
            .catalog
            .fetch_digests(&job.id)
            .map_err(|e| ItemFailure::at(SyncStage::FetchDigests)(e.into()))?;

        let missing = digests.missing(job.keys());
        let mut seeded = Vec::new();

        if !missing.is_empty() {
            let unresolvable = if self.options.ensure_base {
                missing.iter().copied().find(|k| !k.is_seedable())
            } else {
                missing.first().copied()
            };
            if let Some(key) = unresolvable {
                tracing::debug!(
                    "    缺少摘要: {}",
                    missing.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
                );
                return Err(ItemFailure {
                    stage: SyncStage::CheckCompleteness,
                    error: SyncError::MissingDigest { key },
                });
            }

            let content = self.placeholder_for(&missing);
            tracing::info!(
                "    缺少摘要 → 写入占位原文: {}",
                content.keys().iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
            );
            self.catalog
                .update_primary_content(&job.id, &content)
                .map_err(|e| ItemFailure::at(SyncStage::SeedPrimary)(SyncError::Seed(e)))?;
            seeded = missing;

            digests = self.poll_for_digests(&job.id, &seeded)?;
        }

        let payload = build_payload(job, &digests).map_err(ItemFailure::at(SyncStage::BuildPayload))?;

        let registered = self
            .catalog
            .register_translations(&job.id, &payload)
            .map_err(|e| ItemFailure::at(SyncStage::Register)(SyncError::Register(e)))?;

        if registered.is_empty() {
            tracing::info!("    已存储: （服务端未返回）");
        } else {
            let stored: Vec<String> = registered
                .iter()
                .map(|t| format!("{}@{}", t.key, t.locale))
                .collect();
            tracing::info!("    已存储: {}", stored.join(", "));
        }

        let verified = if self.options.verify {
            self.verify(&job.id, &job.locale)
        } else {
            Vec::new()
        };

        Ok(SyncSuccess {
            seeded,
            registered,
            verified,
        })
    }

    fn placeholder_for(&self, keys: &[FieldKey]) -> PrimaryContent {
        PrimaryContent {
            title: keys
                .contains(&FieldKey::Title)
                .then(|| self.options.base_title.clone()),
            description_html: keys
                .contains(&FieldKey::BodyHtml)
                .then(|| self.options.base_description.clone()),
        }
    }

    /// 等待指定字段的摘要出现
    fn poll_for_digests(
        &self,
        id: &ResourceId,
        keys: &[FieldKey],
    ) -> Result<DigestMap, ItemFailure> {
        let mut still_missing = keys.to_vec();

        for attempt in 1..=self.options.poll_attempts {
            if !self.options.poll_interval.is_zero() {
                thread::sleep(self.options.poll_interval);
            }

            let digests = self
                .catalog
                .fetch_digests(id)
                .map_err(|e| ItemFailure::at(SyncStage::PollForDigests)(e.into()))?;

            still_missing = digests.missing(keys.iter().copied());
            if still_missing.is_empty() {
                tracing::debug!("    第 {} 次轮询后摘要就绪", attempt);
                return Ok(digests);
            }
        }

        Err(ItemFailure {
            stage: SyncStage::PollForDigests,
            error: SyncError::DigestTimeout {
                attempts: self.options.poll_attempts,
                missing: still_missing,
            },
        })
    }

    /// 回读译文；失败只记录警告
    fn verify(&self, id: &ResourceId, locale: &str) -> Vec<TranslationRecord> {
        match self.catalog.fetch_translations(id, locale) {
            Ok(rows) if rows.is_empty() => {
                tracing::warn!("    回读 → 无记录，请确认已发布的语言代码 ({})", locale);
                rows
            }
            Ok(rows) => {
                for row in &rows {
                    let value: String = row
                        .value
                        .as_deref()
                        .unwrap_or("")
                        .chars()
                        .take(120)
                        .collect::<String>()
                        .replace('\n', " ");
                    tracing::info!(
                        "      {} [{}]{}: {}",
                        row.key,
                        row.locale,
                        if row.outdated { " (outdated)" } else { "" },
                        value
                    );
                }
                rows
            }
            Err(e) => {
                tracing::warn!("    回读失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 处理一行输入
    pub fn sync_row(&self, index: usize, row: &InputRow) -> ItemOutcome {
        let job = match TranslationJob::from_row(row, &self.options.mapping, &self.options.locale) {
            Ok(job) => job,
            Err(error) => {
                return ItemOutcome {
                    index,
                    id: None,
                    result: Err(ItemFailure {
                        stage: SyncStage::ResolveJob,
                        error,
                    }),
                }
            }
        };

        tracing::info!("[{}] 商品: {} → locale={}", index, job.id, job.locale);
        ItemOutcome {
            index,
            id: Some(job.id.clone()),
            result: self.sync_job(&job),
        }
    }

    /// 依次处理全部输入行
    pub fn run_batch(&self, rows: &[InputRow]) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, row) in rows.iter().enumerate() {
            let outcome = self.sync_row(i + 1, row);
            match &outcome.result {
                Ok(_) => report.ok += 1,
                Err(failure) => {
                    tracing::error!("[{}] 失败 {}", outcome.index, failure);
                    report.failed += 1;
                }
            }
            report.items.push(outcome);
        }

        tracing::info!("完成. OK={} FAIL={}", report.ok, report.failed);
        report
    }
}
