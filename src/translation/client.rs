//! 翻译生成服务客户端
//!
//! 对话式补全接口的统一请求构造：不同模型族的参数差异（是否支持 temperature、
//! token上限字段名）由 [`ModelProfile`] 在配置阶段一次性确定。

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::translation::error::{TranslationError, TranslationResult};

/// 默认API地址
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// 默认模型
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// 请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// token上限参数名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenParam {
    /// `max_tokens`
    MaxTokens,
    /// `max_completion_tokens`（推理类模型）
    MaxCompletionTokens,
}

impl TokenParam {
    pub fn field_name(&self) -> &'static str {
        match self {
            TokenParam::MaxTokens => "max_tokens",
            TokenParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

/// 模型能力描述
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub model: String,
    pub supports_temperature: bool,
    pub token_param: TokenParam,
}

impl ModelProfile {
    /// 根据模型名称推断能力
    pub fn for_model(model: &str) -> Self {
        let name = model.trim().to_lowercase();
        let reasoning = ["gpt-5", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| name.starts_with(prefix));

        if reasoning {
            Self {
                model: model.trim().to_string(),
                supports_temperature: false,
                token_param: TokenParam::MaxCompletionTokens,
            }
        } else {
            Self {
                model: model.trim().to_string(),
                supports_temperature: true,
                token_param: TokenParam::MaxTokens,
            }
        }
    }

    /// 构造请求体
    pub fn build_body(&self, request: &ChatRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.model));
        body.insert(
            "messages".to_string(),
            json!([
                ChatMessage::system(&request.system),
                ChatMessage::user(&request.user),
            ]),
        );
        if self.supports_temperature {
            body.insert("temperature".to_string(), json!(request.temperature));
        }
        body.insert(
            self.token_param.field_name().to_string(),
            json!(request.max_tokens),
        );
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }
}

/// 一次补全请求：角色指令 + 用户消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            max_tokens: 2000,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// 翻译生成后端
pub trait ChatBackend {
    /// 当前模型的能力描述
    fn profile(&self) -> &ModelProfile;

    /// 执行一次补全，返回生成的文本
    fn complete(&self, request: &ChatRequest) -> TranslationResult<String>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI 兼容的对话补全客户端
pub struct OpenAiChatClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    profile: ModelProfile,
}

impl OpenAiChatClient {
    /// 创建客户端
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> TranslationResult<Self> {
        if api_key.trim().is_empty() {
            return Err(TranslationError::ConfigError(
                "缺少翻译服务API密钥".to_string(),
            ));
        }

        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("无法创建HTTP客户端: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base),
            api_key: api_key.trim().to_string(),
            profile: ModelProfile::for_model(model),
        })
    }
}

impl ChatBackend for OpenAiChatClient {
    fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    fn complete(&self, request: &ChatRequest) -> TranslationResult<String> {
        let body = self.profile.build_body(request);
        tracing::debug!(model = %self.profile.model, "发送补全请求");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let body = check_status(status, response.text()?)?;
        parse_completion(&body)
    }
}

/// 非 2xx 状态按状态码分类：429、5xx 为临时错误，其余为永久错误
fn check_status(status: StatusCode, body: String) -> TranslationResult<String> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(TranslationError::from_status(status.as_u16(), body))
    }
}

/// 取第一个候选的文本，没有候选时为空串
fn parse_completion(body: &str) -> TranslationResult<String> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| TranslationError::ParseError(format!("补全响应格式错误: {}", e)))?;

    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}
