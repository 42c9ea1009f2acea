//! LLM API 客户端 - 基础设施层
//!
//! 只暴露"发送两条消息，拿回一条回复"的能力，不认识作文和评分规则。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（Groq 等），通过 `llm_api_base_url` 切换

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 一次聊天请求
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    /// 系统指令
    pub system_message: String,
    /// 用户内容
    pub user_message: String,
    pub temperature: f32,
}

/// 一次聊天回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    /// API 返回的 token 总数（可能缺失）
    pub total_tokens: Option<u64>,
}

/// 聊天后端
///
/// 任何能"提交 system + user 两条消息并返回一条文本回复"的服务都可以实现它。
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError>;
}

/// 基于 async-openai 的聊天客户端
pub struct OpenAiChatClient {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiChatClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            timeout: config.request_timeout(),
        }
    }

    fn build_messages(
        request: &ChatRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let build_failed = |e: async_openai::error::OpenAIError| LlmError::RequestBuildFailed {
            model: request.model.clone(),
            source: Box::new(e),
        };

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_message.as_str())
            .build()
            .map_err(build_failed)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_message.as_str())
            .build()
            .map_err(build_failed)?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError> {
        debug!("调用 LLM API，模型: {}", request.model);
        debug!("用户消息长度: {} 字符", request.user_message.chars().count());

        let messages = Self::build_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed {
                model: request.model.clone(),
                source: Box::new(e),
            })?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(chat_request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时 ({} 秒)", self.timeout.as_secs());
                LlmError::Timeout {
                    model: request.model.clone(),
                    secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                LlmError::ApiCallFailed {
                    model: request.model.clone(),
                    source: Box::new(e),
                }
            })?;

        debug!("LLM API 调用成功");

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::EmptyResponse {
                model: request.model.clone(),
            })?;
        let content = choice
            .message
            .content
            .clone()
            .ok_or_else(|| LlmError::EmptyContent {
                model: request.model.clone(),
            })?;

        Ok(ChatReply {
            content,
            total_tokens: response.usage.map(|u| u64::from(u.total_tokens)),
        })
    }
}
