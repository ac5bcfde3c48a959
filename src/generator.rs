use crate::gemini::{ContentProvider, GeminiError};
use crate::models::{BuildRequest, PCBuild};
use crate::prompt::GenerationPlan;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, error};

pub const MISSING_KEY_MESSAGE: &str = "Missing API key. Set API_KEY or GEMINI_API_KEY in the environment.";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Configuration(String),
    #[error("The request was blocked due to safety settings: {0}")]
    SafetyBlocked(String),
    #[error("Empty response from model")]
    EmptyResponse,
    #[error("Invalid response format from model: {0}")]
    InvalidFormat(String),
    #[error("Provider error: {0}")]
    Provider(String),
}

impl GenerateError {
    /// Status used by the hosted endpoint.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerateError::EmptyResponse | GenerateError::InvalidFormat(_) => StatusCode::BAD_GATEWAY,
            GenerateError::Configuration(_)
            | GenerateError::SafetyBlocked(_)
            | GenerateError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Sorts a raw provider failure message into a failure kind.
///
/// Heuristic: Gemini reports policy rejections only through its message
/// wording, so any message containing `SAFETY` counts as a safety block.
/// If that wording changes, blocks silently degrade to [`GenerateError::Provider`].
pub fn classify_provider_error(message: &str) -> GenerateError {
    if message.contains("SAFETY") {
        GenerateError::SafetyBlocked(message.to_string())
    } else {
        GenerateError::Provider(message.to_string())
    }
}

impl From<GeminiError> for GenerateError {
    fn from(err: GeminiError) -> Self {
        classify_provider_error(&err.to_string())
    }
}

/// Owns the provider handle and the resolved model; built once at startup and shared.
pub struct BuildGenerator<P: ?Sized> {
    provider: Arc<P>,
    model: String,
}

impl<P: ContentProvider + ?Sized> BuildGenerator<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs one generation round trip. Never retries; each failure is terminal for this call.
    pub async fn generate(&self, request: &BuildRequest) -> Result<Vec<PCBuild>, GenerateError> {
        if !self.provider.is_configured() {
            error!("❌ Refusing to call provider without credentials");
            return Err(GenerateError::Configuration(MISSING_KEY_MESSAGE.into()));
        }

        let plan = GenerationPlan::new(self.model.as_str(), request);
        info!("🚀 Generating {} build(s) for {} {} with {}", request.count, request.budget, request.currency, plan.model);

        let text = match self.provider.generate_content(&plan).await {
            Ok(text) => text,
            Err(e) => {
                error!("❌ Provider call failed: {}", e);
                return Err(e.into());
            }
        };

        let builds = parse_builds(text.as_deref()).inspect_err(|e| error!("❌ {}", e))?;
        info!("✅ Model returned {} build(s)", builds.len());
        Ok(builds)
    }
}

/// Validates a raw model reply and decodes its `builds` array.
///
/// Only the top-level shape is checked: `builds` must be an array of objects.
/// Subfields are the response schema's business and decode leniently.
pub fn parse_builds(text: Option<&str>) -> Result<Vec<PCBuild>, GenerateError> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return Err(GenerateError::EmptyResponse),
    };

    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| GenerateError::Provider(format!("malformed model output: {e}")))?;

    let Some(Value::Array(items)) = parsed.get("builds") else {
        return Err(GenerateError::InvalidFormat("expected a `builds` array".into()));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(GenerateError::InvalidFormat(format!("build {i} is not an object")));
            }
            PCBuild::deserialize(item)
                .map_err(|e| GenerateError::InvalidFormat(format!("build {i}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, ComponentType, GamePerformance, PerformanceTier, Purpose};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(Option<String>),
        Fail(fn() -> GeminiError),
    }

    struct MockProvider {
        configured: bool,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn replying(reply: Reply) -> Arc<Self> {
            Arc::new(Self { configured: true, reply, calls: AtomicUsize::new(0) })
        }

        fn text(body: &str) -> Arc<Self> {
            Self::replying(Reply::Text(Some(body.to_string())))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentProvider for MockProvider {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate_content(&self, plan: &GenerationPlan) -> Result<Option<String>, GeminiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(plan.prompt.contains("1500 USD"));
            match &self.reply {
                Reply::Text(t) => Ok(t.clone()),
                Reply::Fail(make) => Err(make()),
            }
        }
    }

    fn request() -> BuildRequest {
        BuildRequest {
            budget: 1500.0,
            currency: "USD".into(),
            count: 1,
            purpose: Purpose::Gaming,
            performance_tier: PerformanceTier::MidRange,
            notes: None,
        }
    }

    async fn run(provider: Arc<MockProvider>) -> (Result<Vec<PCBuild>, GenerateError>, usize) {
        let generator = BuildGenerator::new(provider.clone(), "gemini-2.5-flash");
        let result = generator.generate(&request()).await;
        (result, provider.calls())
    }

    #[tokio::test]
    async fn empty_builds_is_ok() {
        let (result, calls) = run(MockProvider::text(r#"{"builds": []}"#)).await;
        assert!(result.unwrap().is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn missing_builds_is_invalid_format() {
        let (result, _) = run(MockProvider::text(r#"{"items": []}"#)).await;
        assert!(matches!(result, Err(GenerateError::InvalidFormat(_))));

        let (result, _) = run(MockProvider::text(r#"{"builds": {"a": 1}}"#)).await;
        assert!(matches!(result, Err(GenerateError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn non_object_build_is_invalid_format() {
        let (result, _) = run(MockProvider::text(r#"{"builds": [42]}"#)).await;
        assert!(matches!(result, Err(GenerateError::InvalidFormat(ref m)) if m.starts_with("build 0")));
    }

    #[tokio::test]
    async fn empty_body_is_empty_response() {
        let (result, _) = run(MockProvider::text("")).await;
        assert!(matches!(result, Err(GenerateError::EmptyResponse)));

        let (result, _) = run(MockProvider::replying(Reply::Text(None))).await;
        assert!(matches!(result, Err(GenerateError::EmptyResponse)));
    }

    #[tokio::test]
    async fn whitespace_body_is_malformed_output() {
        let (result, _) = run(MockProvider::text("   ")).await;
        assert!(matches!(result, Err(GenerateError::Provider(ref m)) if m.starts_with("malformed model output")));
    }

    #[tokio::test]
    async fn build_missing_subfields_is_returned() {
        let body = json!({"builds": [
            {
                "buildName": "Half Done",
                "totalPrice": 1100,
                "currency": "USD",
                "averageFps": "110",
                "components": [{"type": "CPU", "name": "Ryzen 5 7600"}],
                "performance": "Good 1080p."
            },
            {"buildName": "Second", "totalPrice": 1400, "currency": "USD"}
        ]});
        let (result, _) = run(MockProvider::text(&body.to_string())).await;
        let builds = result.unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].build_name, "Half Done");
        assert_eq!(builds[0].average_fps, 110.0);
        assert_eq!(builds[0].target_resolution, "");
        assert!(builds[0].game_performance.is_empty());
        assert_eq!(builds[0].components[0].price, None);
        assert_eq!(builds[1].total_price, 1400.0);
        assert!(builds[1].components.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_provider_error() {
        let (result, _) = run(MockProvider::text("{\"builds\": [")).await;
        assert!(matches!(result, Err(GenerateError::Provider(ref m)) if m.starts_with("malformed model output")));
    }

    #[tokio::test]
    async fn safety_errors_are_classified() {
        let (result, _) = run(MockProvider::replying(Reply::Fail(|| {
            GeminiError::Blocked("prompt blocked, blockReason: SAFETY".into())
        })))
        .await;
        assert!(matches!(result, Err(GenerateError::SafetyBlocked(_))));

        let (result, _) = run(MockProvider::replying(Reply::Fail(|| GeminiError::Http("status=503 body=overloaded".into())))).await;
        match result {
            Err(GenerateError::Provider(msg)) => assert_eq!(msg, "HTTP error: status=503 body=overloaded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn classification_is_substring_based() {
        assert!(matches!(classify_provider_error("[400] finishReason SAFETY"), GenerateError::SafetyBlocked(_)));
        assert!(matches!(classify_provider_error("safety"), GenerateError::Provider(_)));
        match classify_provider_error("quota exceeded") {
            GenerateError::Provider(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credential_never_calls_provider() {
        let provider = Arc::new(MockProvider {
            configured: false,
            reply: Reply::Text(Some(r#"{"builds": []}"#.into())),
            calls: AtomicUsize::new(0),
        });
        let (result, calls) = run(provider).await;
        assert!(matches!(result, Err(GenerateError::Configuration(_))));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn well_formed_build_round_trips() {
        let payload = json!({
            "builds": [{
                "buildName": "The Budget Beast",
                "totalPrice": 1487.5,
                "currency": "USD",
                "estimatedWattage": 520,
                "targetResolution": "1440p",
                "averageFps": 112,
                "components": [
                    {
                        "type": "CPU",
                        "name": "AMD Ryzen 5 7600",
                        "price": 199.99,
                        "priceLink": "https://www.amazon.com/s?k=AMD+Ryzen+5+7600&tag=deazlly-20",
                        "specs": "6C/12T, 5.1GHz boost",
                        "powerDraw": 65
                    },
                    {
                        "type": "Case",
                        "name": "Fractal Pop Air",
                        "price": 79,
                        "priceLink": "https://www.amazon.com/s?k=Fractal+Pop+Air&tag=deazlly-20",
                        "specs": "ATX mid tower"
                    }
                ],
                "performance": "Smooth 1440p gaming at high settings.",
                "gamePerformance": [
                    {"gameName": "Fortnite", "fps": "140-160 FPS", "settings": "1440p High"}
                ]
            }]
        });

        let (result, _) = run(MockProvider::text(&payload.to_string())).await;
        let builds = result.unwrap();
        assert_eq!(builds.len(), 1);

        let expected = PCBuild {
            id: None,
            build_name: "The Budget Beast".into(),
            total_price: 1487.5,
            currency: "USD".into(),
            estimated_wattage: Some(520.0),
            target_resolution: "1440p".into(),
            average_fps: 112.0,
            components: vec![
                Component {
                    kind: ComponentType::Cpu,
                    name: "AMD Ryzen 5 7600".into(),
                    price: Some(199.99),
                    price_link: Some("https://www.amazon.com/s?k=AMD+Ryzen+5+7600&tag=deazlly-20".into()),
                    specs: Some("6C/12T, 5.1GHz boost".into()),
                    power_draw: Some(65.0),
                },
                Component {
                    kind: ComponentType::Case,
                    name: "Fractal Pop Air".into(),
                    price: Some(79.0),
                    price_link: Some("https://www.amazon.com/s?k=Fractal+Pop+Air&tag=deazlly-20".into()),
                    specs: Some("ATX mid tower".into()),
                    power_draw: None,
                },
            ],
            performance: "Smooth 1440p gaming at high settings.".into(),
            game_performance: vec![GamePerformance {
                game_name: "Fortnite".into(),
                fps: "140-160 FPS".into(),
                settings: "1440p High".into(),
            }],
        };
        assert_eq!(builds[0], expected);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(GenerateError::EmptyResponse.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(GenerateError::InvalidFormat("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(GenerateError::Configuration("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(GenerateError::Provider("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
