//! HTTP implementations of [`VisionAnalyzer`].

use crate::config::{Config, VisionProvider};
use crate::prompt_loader::Prompts;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use guidedog_core::analyzer::VisionAnalyzer;
use guidedog_types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, FindObjectRequest,
    FindObjectResponse, HazardAnalysisRequest, SceneDescriptionRequest, SceneDescriptionResponse,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Returned when the model answers a hazard request with no content at all.
const CLEAR_PATH: &str = r#"{"warning": "", "threatLevel": "none"}"#;
const HAZARD_TEMPERATURE: f32 = 0.2;

/// Builds the analyzer selected by `VISION_PROVIDER`.
pub fn from_config(config: &Config, prompts: Prompts) -> Arc<dyn VisionAnalyzer> {
    match config.vision_provider {
        VisionProvider::Chat => Arc::new(ChatVisionClient::new(
            config.vision_api_key.clone(),
            &config.vision_api_base,
            &config.vision_model,
            prompts,
        )),
        VisionProvider::Gateway => Arc::new(GatewayVisionClient::new(
            config.vision_api_key.clone(),
            &config.vision_api_base,
        )),
    }
}

/// Calls a chat-completions endpoint directly with the loaded prompts.
pub struct ChatVisionClient {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    prompts: Prompts,
}

impl ChatVisionClient {
    pub fn new(api_key: SecretString, base_url: &str, model: &str, prompts: Prompts) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            prompts,
        }
    }

    pub fn hazard_request(&self, image_data: &str, search_target: Option<&str>) -> ChatCompletionRequest {
        let instruction = match search_target {
            Some(target) => format!(
                "Check the path ahead for hazards and guide me to {target}. Respond in JSON only."
            ),
            None => "Analyze this image for immediate hazards in my path. Respond in JSON only."
                .to_string(),
        };
        ChatCompletionRequest::new(&self.model)
            .with_message(ChatMessage::system(&self.prompts.hazards(search_target)))
            .with_message(ChatMessage::user_parts(vec![
                ContentPart::text(&instruction),
                ContentPart::image(image_data),
            ]))
            .with_temperature(HAZARD_TEMPERATURE)
    }

    pub fn scene_request(&self, image_data: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new(&self.model)
            .with_message(ChatMessage::system(&self.prompts.scene()))
            .with_message(ChatMessage::user_parts(vec![
                ContentPart::text("What is in front of me?"),
                ContentPart::image(image_data),
            ]))
    }

    pub fn find_object_request(&self, image_data: &str, query: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new(&self.model)
            .with_message(ChatMessage::system(&self.prompts.find_object(query)))
            .with_message(ChatMessage::user_parts(vec![
                ContentPart::image(image_data),
                ContentPart::text(&format!(
                    "Find: {query}. Describe location using clock position and distance if found."
                )),
            ]))
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .context("Vision request failed")?
            .error_for_status()
            .context("Vision endpoint returned an error")?
            .json::<ChatCompletionResponse>()
            .await
            .context("Vision response was not a chat completion")?;
        Ok(response.first_content().map(str::to_string))
    }
}

#[async_trait]
impl VisionAnalyzer for ChatVisionClient {
    async fn analyze_hazards(
        &self,
        image_data: String,
        search_target: Option<String>,
    ) -> Result<String> {
        let request = self.hazard_request(&image_data, search_target.as_deref());
        let content = self.complete(&request).await?;
        tracing::debug!("Hazard response: {:?}", content);
        Ok(content.unwrap_or_else(|| CLEAR_PATH.to_string()))
    }

    async fn describe_scene(&self, image_data: String) -> Result<String> {
        self.complete(&self.scene_request(&image_data))
            .await?
            .ok_or_else(|| anyhow!("No scene description from vision model"))
    }

    async fn find_object(&self, image_data: String, query: String) -> Result<String> {
        self.complete(&self.find_object_request(&image_data, &query))
            .await?
            .ok_or_else(|| anyhow!("No search result from vision model"))
    }
}

/// Posts the plain request bodies to a hosted analysis gateway.
pub struct GatewayVisionClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl GatewayVisionClient {
    pub fn new(api_key: SecretString, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, function: &str) -> String {
        format!("{}/{}", self.base_url, function)
    }

    async fn post<B: serde::Serialize + ?Sized>(&self, function: &str, body: &B) -> Result<reqwest::Response> {
        self.client
            .post(self.url(function))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .with_context(|| format!("{function} request failed"))?
            .error_for_status()
            .with_context(|| format!("{function} returned an error"))
    }
}

#[async_trait]
impl VisionAnalyzer for GatewayVisionClient {
    async fn analyze_hazards(
        &self,
        image_data: String,
        search_target: Option<String>,
    ) -> Result<String> {
        let mut request = HazardAnalysisRequest::new(&image_data);
        if let Some(target) = search_target.as_deref() {
            request = request.with_search_target(target);
        }
        // raw body: malformed payloads are handled by the report parser
        self.post("detect-hazards", &request)
            .await?
            .text()
            .await
            .context("Failed to read detect-hazards body")
    }

    async fn describe_scene(&self, image_data: String) -> Result<String> {
        let response = self
            .post("analyze-scene", &SceneDescriptionRequest::new(&image_data))
            .await?
            .json::<SceneDescriptionResponse>()
            .await
            .context("Unexpected analyze-scene body")?;
        Ok(response.description)
    }

    async fn find_object(&self, image_data: String, query: String) -> Result<String> {
        let response = self
            .post("find-object", &FindObjectRequest::new(&image_data, &query))
            .await?
            .json::<FindObjectResponse>()
            .await
            .context("Unexpected find-object body")?;
        Ok(response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FRAME: &str = "data:image/jpeg;base64,AAAA";

    fn prompts() -> Prompts {
        let templates: HashMap<String, String> = [
            ("hazards", "Generic hazard prompt"),
            ("hazards_search", "Hazards plus guidance to {search_query}"),
            ("scene", "Scene prompt"),
            ("find_object", "Locate {search_query}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Prompts::from_map(templates).unwrap()
    }

    fn chat_client() -> ChatVisionClient {
        ChatVisionClient::new(
            SecretString::from("sk-test".to_string()),
            "https://api.openai.com/v1/",
            "gpt-4o",
            prompts(),
        )
    }

    #[test]
    fn hazard_request_body() {
        let body = serde_json::to_value(chat_client().hazard_request(FRAME, None)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Generic hazard prompt");
        assert_eq!(body["messages"][1]["content"][0]["type"], "text");
        assert_eq!(body["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(body["messages"][1]["content"][1]["image_url"]["url"], FRAME);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn search_mode_uses_search_prompt() {
        let request = chat_client().hazard_request(FRAME, Some("the bus stop"));
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(
            body["messages"][0]["content"],
            "Hazards plus guidance to the bus stop"
        );
    }

    #[test]
    fn one_shot_requests() {
        let client = chat_client();
        let scene = serde_json::to_value(client.scene_request(FRAME)).unwrap();
        assert_eq!(scene["messages"][0]["content"], "Scene prompt");
        assert!(scene.get("temperature").is_none());

        let find = serde_json::to_value(client.find_object_request(FRAME, "keys")).unwrap();
        assert_eq!(find["messages"][0]["content"], "Locate keys");
        assert_eq!(find["messages"][1]["content"][0]["image_url"]["url"], FRAME);
    }

    #[test]
    fn endpoints() {
        assert_eq!(chat_client().endpoint, "https://api.openai.com/v1/chat/completions");
        let gateway = GatewayVisionClient::new(
            SecretString::from("k".to_string()),
            "https://example.supabase.co/functions/v1/",
        );
        assert_eq!(
            gateway.url("detect-hazards"),
            "https://example.supabase.co/functions/v1/detect-hazards"
        );
    }

    #[tokio::test]
    #[ignore = "needs VISION_API_KEY and network access"]
    async fn live_hazard_analysis() -> Result<()> {
        let config = Config::from_env()?;
        let prompts = Prompts::load(&std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts"))?;
        let analyzer = from_config(&config, prompts);
        // 1x1 white pixel
        let frame = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQEASABIAAD/2wBDAP//////////////////////////////////////////////////////////////////////////////////////wgALCAABAAEBAREA/8QAFBABAAAAAAAAAAAAAAAAAAAAAP/aAAgBAQABPxA=";
        let raw = analyzer.analyze_hazards(frame.to_string(), None).await?;
        assert!(!raw.is_empty());
        Ok(())
    }
}
