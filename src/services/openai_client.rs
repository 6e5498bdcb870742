use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;

/// One `generate` call is the cost unit the orchestrator accounts for.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, anyhow::Error>;
}

pub struct OpenaiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenaiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        OpenaiClient {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl GenerationClient for OpenaiClient {
    async fn generate(&self, prompt: &str) -> Result<String, anyhow::Error> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .max_tokens(4000_u32)
            .build()?;

        let response = self.client.chat().create(request).await?;
        log::debug!("Provider response: {:?}", response);

        let first_choice = response
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No choices in provider response"))?
            .message
            .content
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No content in provider response"))?;

        Ok(first_choice)
    }
}
