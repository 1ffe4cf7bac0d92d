// 集成测试公共模块
//
// 提供目录服务和翻译服务的内存替身

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use catalog_translate::catalog::{
    CatalogError, CatalogResult, CatalogService, DigestMap, FieldKey, InputRow, PrimaryContent,
    RegisteredTranslation, ResourceId, SyncOptions, TranslationInput, TranslationRecord, UserError,
};
use catalog_translate::translation::{
    ChatBackend, ChatRequest, ModelProfile, TranslationError, TranslationResult,
};

/// 内存中的目录服务
///
/// 每个资源有一串摘要快照，每次读取消耗一个，最后一个会一直重复。
#[derive(Default)]
pub struct FakeCatalog {
    digests: RefCell<HashMap<String, VecDeque<DigestMap>>>,
    pub digest_fetches: Cell<usize>,
    pub seeded: RefCell<Vec<(ResourceId, PrimaryContent)>>,
    pub registered: RefCell<Vec<(ResourceId, Vec<TranslationInput>)>>,
    pub register_errors: Vec<UserError>,
    pub seed_errors: Vec<UserError>,
    pub verify_fails: bool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个摘要快照
    pub fn with_digests(self, id: &str, digests: &[(FieldKey, &str)]) -> Self {
        let id = ResourceId::product(id).unwrap().to_string();
        let snapshot: DigestMap = digests.iter().map(|(k, d)| (*k, *d)).collect();
        self.digests
            .borrow_mut()
            .entry(id)
            .or_default()
            .push_back(snapshot);
        self
    }

    pub fn rejecting_register(mut self, message: &str) -> Self {
        self.register_errors.push(UserError {
            field: vec!["translations".to_string()],
            message: message.to_string(),
        });
        self
    }

    pub fn rejecting_seed(mut self, message: &str) -> Self {
        self.seed_errors.push(UserError {
            field: vec!["title".to_string()],
            message: message.to_string(),
        });
        self
    }

    pub fn failing_verify(mut self) -> Self {
        self.verify_fails = true;
        self
    }

    pub fn registered_for(&self, id: &str) -> Vec<TranslationInput> {
        let id = ResourceId::product(id).unwrap();
        self.registered
            .borrow()
            .iter()
            .filter(|(rid, _)| *rid == id)
            .flat_map(|(_, inputs)| inputs.clone())
            .collect()
    }
}

impl CatalogService for FakeCatalog {
    fn fetch_digests(&self, id: &ResourceId) -> CatalogResult<DigestMap> {
        self.digest_fetches.set(self.digest_fetches.get() + 1);
        let mut all = self.digests.borrow_mut();
        let queue = match all.get_mut(id.as_str()) {
            Some(queue) => queue,
            None => return Ok(DigestMap::new()),
        };
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap_or_default())
        }
    }

    fn fetch_translations(
        &self,
        id: &ResourceId,
        locale: &str,
    ) -> CatalogResult<Vec<TranslationRecord>> {
        if self.verify_fails {
            return Err(CatalogError::GraphQl("Throttled".to_string()));
        }
        Ok(self
            .registered
            .borrow()
            .iter()
            .filter(|(rid, _)| rid == id)
            .flat_map(|(_, inputs)| inputs.clone())
            .filter(|input| input.locale == locale)
            .map(|input| TranslationRecord {
                key: input.key.to_string(),
                value: Some(input.value),
                locale: input.locale,
                outdated: false,
            })
            .collect())
    }

    fn update_primary_content(
        &self,
        id: &ResourceId,
        content: &PrimaryContent,
    ) -> CatalogResult<()> {
        if !self.seed_errors.is_empty() {
            return Err(CatalogError::Rejected {
                operation: "productUpdate",
                errors: self.seed_errors.clone(),
            });
        }
        self.seeded.borrow_mut().push((id.clone(), content.clone()));
        Ok(())
    }

    fn register_translations(
        &self,
        id: &ResourceId,
        translations: &[TranslationInput],
    ) -> CatalogResult<Vec<RegisteredTranslation>> {
        if !self.register_errors.is_empty() {
            return Err(CatalogError::Rejected {
                operation: "translationsRegister",
                errors: self.register_errors.clone(),
            });
        }
        self.registered
            .borrow_mut()
            .push((id.clone(), translations.to_vec()));
        Ok(translations
            .iter()
            .map(|t| RegisteredTranslation {
                key: t.key.to_string(),
                locale: t.locale.clone(),
            })
            .collect())
    }
}

/// 不等待的同步选项
pub fn fast_options() -> SyncOptions {
    SyncOptions {
        poll_interval: std::time::Duration::ZERO,
        ..SyncOptions::default()
    }
}

pub fn row(id: &str, title: &str, description: &str) -> InputRow {
    InputRow::new()
        .with("id", id)
        .with("title_en", title)
        .with("descriptionHtml_en", description)
}

/// 按顺序返回预设结果的翻译服务；预设用完后返回用户消息中的原文
pub struct ScriptedBackend {
    profile: ModelProfile,
    replies: RefCell<VecDeque<TranslationResult<String>>>,
    pub requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<TranslationResult<String>>) -> Self {
        Self {
            profile: ModelProfile::for_model("gpt-4o-mini"),
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatBackend for ScriptedBackend {
    fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    fn complete(&self, request: &ChatRequest) -> TranslationResult<String> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(reply) => reply,
            None => Ok(request
                .user
                .rsplit("\n\n")
                .next()
                .unwrap_or(&request.user)
                .to_string()),
        }
    }
}

pub fn overloaded() -> TranslationResult<String> {
    Err(TranslationError::from_status(529, "overloaded"))
}
