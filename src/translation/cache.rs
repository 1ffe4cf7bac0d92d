//! 翻译结果磁盘缓存
//!
//! 以请求参数的内容指纹为键，保存已生成的译文。构造时一次性读入缓存文件，
//! 对象被销毁时（包括出错提前返回的路径）把完整映射写回磁盘；批量翻译时每处理完一条记录也会写回一次。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::translation::error::{TranslationError, TranslationResult};

/// 缓存键：调用类型、模型、角色指令和用户消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey<'a> {
    pub kind: &'a str,
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
}

impl CacheKey<'_> {
    /// 计算内容指纹（SHA-256 十六进制）
    ///
    /// 指纹输入是按键名排序的紧凑JSON对象，格式与已有缓存文件保持一致。
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "{{\"m\": {}, \"sys\": {}, \"t\": {}, \"usr\": {}}}",
            json_string(self.model),
            json_string(self.system),
            json_string(self.kind),
            json_string(self.user),
        );
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub inserts: usize,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f32 / total as f32
        } else {
            0.0
        }
    }
}

/// 翻译缓存
#[derive(Debug)]
pub struct TranslationCache {
    path: Option<PathBuf>,
    entries: HashMap<String, String>,
    dirty: bool,
    stats: CacheStats,
}

impl TranslationCache {
    /// 仅内存缓存，不落盘
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: HashMap::new(),
            dirty: false,
            stats: CacheStats::default(),
        }
    }

    /// 打开缓存文件；文件不存在时得到空缓存，内容损坏时记录警告并从空缓存开始
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("缓存文件 {} 无法读取，使用空缓存: {}", path.display(), e);
                HashMap::new()
            }
        };

        tracing::debug!("已加载 {} 条缓存 ({})", entries.len(), path.display());

        Self {
            path: Some(path),
            entries,
            dirty: false,
            stats: CacheStats::default(),
        }
    }

    /// 根据可选路径创建缓存：`None` 或空路径表示不落盘
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(p) if !p.as_os_str().is_empty() => Self::open(p),
            _ => Self::in_memory(),
        }
    }

    fn load(path: &Path) -> TranslationResult<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// 查询缓存（精确匹配）
    pub fn get(&mut self, fingerprint: &str) -> Option<String> {
        match self.entries.get(fingerprint) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// 写入缓存
    pub fn put(&mut self, fingerprint: String, value: String) {
        self.entries.insert(fingerprint, value);
        self.stats.inserts += 1;
        self.dirty = true;
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 把完整映射写回缓存文件
    pub fn flush(&mut self) -> TranslationResult<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, serialized).map_err(|e| {
            TranslationError::CacheError(format!("写入 {} 失败: {}", path.display(), e))
        })?;

        tracing::debug!("缓存已写入 {} ({} 条)", path.display(), self.entries.len());
        self.dirty = false;
        Ok(())
    }
}

impl Drop for TranslationCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("缓存保存失败: {}", e);
        }
    }
}
