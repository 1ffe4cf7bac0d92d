//! 目录服务客户端
//!
//! 通过 GraphQL Admin API 读取字段摘要、写入主语言内容、登记和回读译文。
//! 非 2xx 状态和顶层 `errors` 都视为本次调用失败，这一层不做重试。

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::types::{
    CatalogItem, DigestMap, PrimaryContent, RegisteredTranslation, ResourceId,
    TranslatableContent, TranslationInput, TranslationRecord, UserError,
};

/// 默认API版本
pub const DEFAULT_API_VERSION: &str = "2025-07";
/// 访问令牌请求头
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const QUERY_DIGESTS: &str = r#"query($id: ID!) {
  translatableResource(resourceId: $id) {
    translatableContent { key digest }
  }
}"#;

pub const QUERY_VERIFY: &str = r#"query($id: ID!, $locale: String!) {
  translatableResource(resourceId: $id) {
    translations(locale: $locale) { key value locale outdated }
  }
}"#;

pub const MUT_REGISTER: &str = r#"mutation RegisterTranslations($resourceId: ID!, $translations: [TranslationInput!]!) {
  translationsRegister(resourceId: $resourceId, translations: $translations) {
    userErrors { field message }
    translations { key locale }
  }
}"#;

pub const MUT_UPDATE_PRIMARY: &str = r#"mutation UpdatePrimary($input: ProductInput!) {
  productUpdate(input: $input) {
    product { id title descriptionHtml }
    userErrors { field message }
  }
}"#;

const PRODUCT_FIELDS: &str =
    "id title handle descriptionHtml tags productType vendor createdAt updatedAt status publishedAt";

fn product_by_id_query() -> String {
    format!("query GetProductById($id: ID!) {{\n  product(id: $id) {{ {} }}\n}}", PRODUCT_FIELDS)
}

fn product_by_handle_query() -> String {
    format!(
        "query GetProductByHandle($handle: String!) {{\n  product(handle: $handle) {{ {} }}\n}}",
        PRODUCT_FIELDS
    )
}

/// 摘要同步所需的目录服务操作
pub trait CatalogService {
    /// 读取当前可翻译字段的摘要
    fn fetch_digests(&self, id: &ResourceId) -> CatalogResult<DigestMap>;

    /// 读取某语言下已存储的译文
    fn fetch_translations(&self, id: &ResourceId, locale: &str)
        -> CatalogResult<Vec<TranslationRecord>>;

    /// 写入主语言内容
    fn update_primary_content(&self, id: &ResourceId, content: &PrimaryContent)
        -> CatalogResult<()>;

    /// 一次性登记全部译文
    fn register_translations(
        &self,
        id: &ResourceId,
        translations: &[TranslationInput],
    ) -> CatalogResult<Vec<RegisteredTranslation>>;
}

/// 店铺连接配置
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub store_domain: String,
    pub access_token: String,
    pub api_version: String,
}

impl ShopifyConfig {
    pub fn new(store_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            store_domain: store_domain.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// 检查必填项
    pub fn validate(&self) -> CatalogResult<()> {
        let mut missing = Vec::new();
        if self.store_domain.trim().is_empty() {
            missing.push("SHOPIFY_STORE_DOMAIN");
        }
        if self.access_token.trim().is_empty() {
            missing.push("SHOPIFY_ADMIN_ACCESS_TOKEN");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Config(format!("缺少 {}", missing.join(", "))))
        }
    }

    /// `https://{store}/admin/api/{version}/graphql.json`
    pub fn endpoint(&self) -> CatalogResult<Url> {
        let domain = self
            .store_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let raw = format!(
            "https://{}/admin/api/{}/graphql.json",
            domain,
            self.api_version.trim()
        );
        Url::parse(&raw).map_err(|e| CatalogError::Config(format!("无效的店铺地址 {}: {}", raw, e)))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Value>,
}

/// 非 2xx 响应直接作为错误返回，响应体不再解析
fn check_status(status: StatusCode, body: String) -> CatalogResult<String> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(CatalogError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// 解析 GraphQL 响应信封
fn decode<T: DeserializeOwned>(body: &str) -> CatalogResult<T> {
    let envelope: GraphQlResponse<T> = serde_json::from_str(body)?;

    if let Some(errors) = envelope.errors {
        let empty = errors.is_null() || errors.as_array().is_some_and(|a| a.is_empty());
        if !empty {
            return Err(CatalogError::GraphQl(errors.to_string()));
        }
    }

    envelope
        .data
        .ok_or_else(|| CatalogError::MissingData("data".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DigestsData {
    translatable_resource: Option<DigestsResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DigestsResource {
    #[serde(default)]
    translatable_content: Option<Vec<TranslatableContent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyData {
    translatable_resource: Option<VerifyResource>,
}

#[derive(Debug, Deserialize)]
struct VerifyResource {
    #[serde(default)]
    translations: Option<Vec<TranslationRecord>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterData {
    translations_register: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    product_update: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    #[serde(default)]
    user_errors: Option<Vec<UserError>>,
    #[serde(default)]
    translations: Option<Vec<RegisteredTranslation>>,
}

impl MutationPayload {
    fn into_result(
        self,
        operation: &'static str,
    ) -> CatalogResult<Vec<RegisteredTranslation>> {
        let errors = self.user_errors.unwrap_or_default();
        if errors.is_empty() {
            Ok(self.translations.unwrap_or_default())
        } else {
            Err(CatalogError::Rejected { operation, errors })
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductData {
    product: Option<CatalogItem>,
}

fn digests_from(data: DigestsData, id: &ResourceId) -> CatalogResult<DigestMap> {
    let resource = data
        .translatable_resource
        .ok_or_else(|| CatalogError::MissingData(format!("找不到资源 {}", id)))?;
    let digests = DigestMap::from_content(resource.translatable_content.unwrap_or_default());

    if !digests.unknown_keys().is_empty() {
        tracing::debug!("忽略未知的可翻译字段: {}", digests.unknown_keys().join(", "));
    }
    Ok(digests)
}

/// GraphQL Admin API 客户端
pub struct ShopifyClient {
    http: reqwest::blocking::Client,
    endpoint: Url,
    access_token: String,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig) -> CatalogResult<Self> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.trim().to_string(),
        })
    }

    /// 发送一条 GraphQL 文档
    pub fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> CatalogResult<T> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()?;

        let status = response.status();
        let body = check_status(status, response.text()?)?;
        decode(&body)
    }

    /// 按ID读取商品
    pub fn fetch_product(&self, id: &ResourceId) -> CatalogResult<Option<CatalogItem>> {
        tracing::info!("读取商品 {}", id);
        let data: ProductData = self.execute(&product_by_id_query(), json!({ "id": id }))?;
        Ok(data.product)
    }

    /// 按 handle 读取商品
    pub fn fetch_product_by_handle(&self, handle: &str) -> CatalogResult<Option<CatalogItem>> {
        tracing::info!("读取商品 handle={}", handle);
        let data: ProductData =
            self.execute(&product_by_handle_query(), json!({ "handle": handle }))?;
        Ok(data.product)
    }
}

impl CatalogService for ShopifyClient {
    fn fetch_digests(&self, id: &ResourceId) -> CatalogResult<DigestMap> {
        let data: DigestsData = self.execute(QUERY_DIGESTS, json!({ "id": id }))?;
        digests_from(data, id)
    }

    fn fetch_translations(
        &self,
        id: &ResourceId,
        locale: &str,
    ) -> CatalogResult<Vec<TranslationRecord>> {
        let data: VerifyData =
            self.execute(QUERY_VERIFY, json!({ "id": id, "locale": locale }))?;
        Ok(data
            .translatable_resource
            .and_then(|r| r.translations)
            .unwrap_or_default())
    }

    fn update_primary_content(
        &self,
        id: &ResourceId,
        content: &PrimaryContent,
    ) -> CatalogResult<()> {
        if content.is_empty() {
            return Ok(());
        }
        tracing::debug!("写入主语言内容: {:?}", content.keys());

        let mut input = Map::new();
        input.insert("id".to_string(), json!(id));
        if let Some(title) = &content.title {
            input.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &content.description_html {
            input.insert("descriptionHtml".to_string(), json!(description));
        }

        let data: UpdateData = self.execute(MUT_UPDATE_PRIMARY, json!({ "input": input }))?;
        data.product_update
            .ok_or_else(|| CatalogError::MissingData("productUpdate".to_string()))?
            .into_result("productUpdate")
            .map(|_| ())
    }

    fn register_translations(
        &self,
        id: &ResourceId,
        translations: &[TranslationInput],
    ) -> CatalogResult<Vec<RegisteredTranslation>> {
        let data: RegisterData = self.execute(
            MUT_REGISTER,
            json!({ "resourceId": id, "translations": translations }),
        )?;
        data.translations_register
            .ok_or_else(|| CatalogError::MissingData("translationsRegister".to_string()))?
            .into_result("translationsRegister")
    }
}
