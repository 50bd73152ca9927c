//! Ad-variant generation: one completion call per requested platform, parsed
//! into at most three lines of copy each, assembled into numbered variants.

use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    llm::{ChatMessage, ChatRequest, CompletionProvider, ProviderError, Role},
    models::{AdVariant, GenerationRequest, Platform, SkippedPlatform},
};

pub const MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f32 = 0.8;
pub const MAX_LINES_PER_PLATFORM: usize = 3;
const FALLBACK_PRODUCT: &str = "a product shown in the image";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("completion provider failed for {platform}: {source}")]
    Provider { platform: Platform, #[source] source: ProviderError },
}

/// What to do when one platform's provider call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Skip the platform and keep going.
    #[default]
    Lenient,
    /// Fail the whole request on the first provider error.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub variants: Vec<AdVariant>,
    pub skipped: Vec<SkippedPlatform>,
}

pub struct VariantGenerator {
    provider: Arc<dyn CompletionProvider>,
    call_timeout: Duration,
    policy: FailurePolicy,
}

impl VariantGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, call_timeout: Duration, policy: FailurePolicy) -> Self {
        Self { provider, call_timeout, policy }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerationError> {
        validate(request)?;

        let description = request.product_description.as_deref();
        let mut lines: Vec<(Platform, String)> = Vec::new();
        let mut skipped = Vec::new();

        for &platform in &request.platforms {
            info!("🎯 Generating ad copy for platform '{}'", platform);
            match self.call_provider(platform, description).await {
                Ok(Some(text)) => {
                    let parsed = parse_completion(&text);
                    if parsed.is_empty() {
                        warn!("⚠️ Provider returned no usable lines for '{}'", platform);
                    }
                    lines.extend(parsed.into_iter().map(|l| (platform, l)));
                }
                Ok(None) => warn!("⚠️ Provider returned no content for '{}'", platform),
                Err(e) => match self.policy {
                    FailurePolicy::Strict => {
                        error!("❌ Provider call failed for '{}': {}", platform, e);
                        return Err(GenerationError::Provider { platform, source: e });
                    }
                    FailurePolicy::Lenient => {
                        error!("❌ Provider call failed for '{}', skipping platform: {}", platform, e);
                        skipped.push(SkippedPlatform { platform, reason: e.to_string() });
                    }
                },
            }
        }

        let variants = assemble_variants(&request.image_reference, lines);
        info!("✅ Generated {} variants across {} platforms ({} skipped)", variants.len(), request.platforms.len(), skipped.len());
        Ok(GenerationOutcome { variants, skipped })
    }

    async fn call_provider(&self, platform: Platform, description: Option<&str>) -> Result<Option<String>, ProviderError> {
        let prompt = build_prompt(platform, description);
        match tokio::time::timeout(self.call_timeout, self.provider.complete_chat(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
        }
    }
}

fn validate(request: &GenerationRequest) -> Result<(), GenerationError> {
    if request.image_reference.trim().is_empty() {
        return Err(GenerationError::InvalidRequest("Missing required fields: imageUrl".into()));
    }
    if request.platforms.is_empty() {
        return Err(GenerationError::InvalidRequest("Missing required fields: platforms".into()));
    }
    Ok(())
}

pub fn build_prompt(platform: Platform, product_description: Option<&str>) -> ChatRequest {
    let name = platform.display_name();
    let product = product_description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(FALLBACK_PRODUCT);

    let system = format!(
        "You are an expert ad copywriter specializing in {name} ads. \
         Create compelling, platform-specific ad copy that drives conversions."
    );
    let user = format!(
        "Create 2-3 different ad text variations for {name} for this product: {product}.\n\n\
         Each variation should:\n\
         - Be optimized for {name}'s audience and format\n\
         - Include a strong call-to-action\n\
         - Be engaging and conversion-focused\n\
         - Match {name}'s tone and style\n\n\
         Return only the text variations, one per line, with no extra commentary."
    );

    ChatRequest {
        messages: vec![
            ChatMessage { role: Role::System, content: system },
            ChatMessage { role: Role::User, content: user },
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

/// Splits a completion into at most three cleaned lines of ad copy.
pub fn parse_completion(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .take(MAX_LINES_PER_PLATFORM)
        .map(|line| strip_enumeration(line.trim()).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Removes a leading `<digits>. ` marker. The dot must be followed by whitespace
/// or end the line, so text like "3.5x faster" is left alone.
fn strip_enumeration(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    match rest.strip_prefix('.') {
        Some(after) if after.is_empty() || after.starts_with(char::is_whitespace) => after,
        _ => line,
    }
}

pub fn assemble_variants(image_reference: &str, lines: Vec<(Platform, String)>) -> Vec<AdVariant> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, (platform, text))| AdVariant {
            id: format!("variant_{}", i + 1),
            image_reference: image_reference.to_string(),
            text_overlay: text,
            platform,
            selected: false,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    pub(crate) enum Scripted {
        Text(&'static str),
        Empty,
        Fail,
        Hang,
    }

    /// Replays scripted responses in order and records every prompt it saw.
    pub(crate) struct FakeProvider {
        script: Mutex<VecDeque<Scripted>>,
        pub calls: Mutex<Vec<ChatRequest>>,
    }

    impl FakeProvider {
        pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete_chat(&self, request: &ChatRequest) -> Result<Option<String>, ProviderError> {
            self.calls.lock().push(request.clone());
            let next = self.script.lock().pop_front();
            match next {
                Some(Scripted::Text(t)) => Ok(Some(t.to_string())),
                Some(Scripted::Empty) | None => Ok(None),
                Some(Scripted::Fail) => Err(ProviderError::Status { status: 429, body: "rate limited".into() }),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(None)
                }
            }
        }
    }

    fn generator(provider: Arc<FakeProvider>, policy: FailurePolicy) -> VariantGenerator {
        VariantGenerator::new(provider, Duration::from_secs(5), policy)
    }

    fn request(platforms: Vec<Platform>) -> GenerationRequest {
        GenerationRequest {
            image_reference: "img-1".into(),
            platforms,
            product_description: None,
        }
    }

    fn texts(outcome: &GenerationOutcome) -> Vec<(&str, &str, Platform)> {
        outcome
            .variants
            .iter()
            .map(|v| (v.id.as_str(), v.text_overlay.as_str(), v.platform))
            .collect()
    }

    #[tokio::test]
    async fn single_platform_scenario() {
        let provider = FakeProvider::new(vec![Scripted::Text("1. Buy now!\n\nGreat deal today\n3. Limited stock")]);
        let outcome = generator(provider.clone(), FailurePolicy::Lenient)
            .generate(&request(vec![Platform::Instagram]))
            .await
            .unwrap();

        assert_eq!(
            texts(&outcome),
            vec![
                ("variant_1", "Buy now!", Platform::Instagram),
                ("variant_2", "Great deal today", Platform::Instagram),
                ("variant_3", "Limited stock", Platform::Instagram),
            ]
        );
        assert!(outcome.variants.iter().all(|v| v.image_reference == "img-1" && !v.selected));
        assert_eq!(provider.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn empty_platforms_is_invalid_and_makes_no_calls() {
        let provider = FakeProvider::new(vec![]);
        let err = generator(provider.clone(), FailurePolicy::Lenient)
            .generate(&request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_image_is_invalid_and_makes_no_calls() {
        let provider = FakeProvider::new(vec![]);
        let mut req = request(vec![Platform::Tiktok]);
        req.image_reference = "   ".into();
        let err = generator(provider.clone(), FailurePolicy::Lenient).generate(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn one_call_per_platform_in_order_even_when_some_fail() {
        let provider = FakeProvider::new(vec![Scripted::Fail, Scripted::Empty, Scripted::Text("ok")]);
        let platforms = vec![Platform::Tiktok, Platform::Instagram, Platform::Farcaster];
        generator(provider.clone(), FailurePolicy::Lenient)
            .generate(&request(platforms))
            .await
            .unwrap();

        let calls = provider.calls.lock();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].messages[0].content.contains("TikTok"));
        assert!(calls[1].messages[0].content.contains("Instagram"));
        assert!(calls[2].messages[0].content.contains("Farcaster"));
    }

    #[tokio::test]
    async fn failing_platform_is_skipped_under_lenient_policy() {
        let provider = FakeProvider::new(vec![Scripted::Fail, Scripted::Text("\n  Shop the drop  \n")]);
        let outcome = generator(provider, FailurePolicy::Lenient)
            .generate(&request(vec![Platform::Instagram, Platform::Tiktok]))
            .await
            .unwrap();

        assert_eq!(texts(&outcome), vec![("variant_1", "Shop the drop", Platform::Tiktok)]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].platform, Platform::Instagram);
    }

    #[tokio::test]
    async fn strict_policy_surfaces_provider_error() {
        let provider = FakeProvider::new(vec![Scripted::Text("fine"), Scripted::Fail]);
        let err = generator(provider, FailurePolicy::Strict)
            .generate(&request(vec![Platform::Instagram, Platform::Tiktok]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Provider { platform: Platform::Tiktok, .. }));
    }

    #[tokio::test]
    async fn empty_content_everywhere_is_a_valid_empty_result() {
        let provider = FakeProvider::new(vec![Scripted::Empty, Scripted::Text("\n \n\t\n")]);
        let outcome = generator(provider, FailurePolicy::Strict)
            .generate(&request(vec![Platform::Instagram, Platform::Tiktok]))
            .await
            .unwrap();
        assert!(outcome.variants.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_provider_error() {
        let provider = FakeProvider::new(vec![Scripted::Hang]);
        let gen = VariantGenerator::new(provider, Duration::from_millis(20), FailurePolicy::Strict);
        let err = gen.generate(&request(vec![Platform::Instagram])).await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider { source: ProviderError::Timeout(_), .. }));
        assert!(err.to_string().contains("timed out after 20ms"), "{err}");
    }

    #[tokio::test]
    async fn duplicate_platforms_each_cost_a_call() {
        let provider = FakeProvider::new(vec![Scripted::Text("a\nb"), Scripted::Text("1. c")]);
        let outcome = generator(provider.clone(), FailurePolicy::Lenient)
            .generate(&request(vec![Platform::Instagram, Platform::Instagram]))
            .await
            .unwrap();

        assert_eq!(provider.calls.lock().len(), 2);
        assert_eq!(
            texts(&outcome),
            vec![
                ("variant_1", "a", Platform::Instagram),
                ("variant_2", "b", Platform::Instagram),
                ("variant_3", "c", Platform::Instagram),
            ]
        );
    }

    #[tokio::test]
    async fn ids_run_across_platforms() {
        let provider = FakeProvider::new(vec![Scripted::Text("a\nb\nc\nd\ne"), Scripted::Text("1. f\n2. g")]);
        let outcome = generator(provider, FailurePolicy::Lenient)
            .generate(&request(vec![Platform::Instagram, Platform::Tiktok]))
            .await
            .unwrap();
        let ids: Vec<&str> = outcome.variants.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["variant_1", "variant_2", "variant_3", "variant_4", "variant_5"]);
        assert_eq!(outcome.variants[3].text_overlay, "f");
        assert_eq!(outcome.variants[3].platform, Platform::Tiktok);
    }

    #[test]
    fn prompt_carries_platform_description_and_sampling() {
        let prompt = build_prompt(Platform::Tiktok, Some("  eco water bottle "));
        assert_eq!(prompt.max_tokens, 500);
        assert_eq!(prompt.temperature, 0.8);
        assert_eq!(prompt.messages[0].role, Role::System);
        assert!(prompt.messages[0].content.contains("specializing in TikTok ads"));
        assert!(prompt.messages[0].content.contains("drives conversions"));
        assert_eq!(prompt.messages[1].role, Role::User);
        assert!(prompt.messages[1].content.contains("for this product: eco water bottle."));
        assert!(prompt.messages[1].content.contains("call-to-action"));
        assert!(prompt.messages[1].content.contains("one per line"));
    }

    #[test]
    fn prompt_falls_back_when_description_blank() {
        for desc in [None, Some(""), Some("   ")] {
            let prompt = build_prompt(Platform::Instagram, desc);
            assert!(prompt.messages[1].content.contains("a product shown in the image"));
        }
    }

    #[test]
    fn parse_keeps_at_most_three_non_blank_lines() {
        assert_eq!(parse_completion("one\n\n two \r\n\nthree\nfour"), vec!["one", "two", "three"]);
    }

    #[test]
    fn parse_strips_enumeration_markers() {
        assert_eq!(parse_completion("1. Alpha\n23.   Beta\n  4. Gamma"), vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(parse_completion("3.5x faster charging"), vec!["3.5x faster charging"]);
        assert_eq!(parse_completion("2024 is here"), vec!["2024 is here"]);
    }

    #[test]
    fn marker_without_following_space_is_kept() {
        assert_eq!(parse_completion("1.Buy now"), vec!["1.Buy now"]);
        assert_eq!(parse_completion("1.\tBuy now"), vec!["Buy now"]);
    }

    #[test]
    fn marker_only_line_is_dropped() {
        assert_eq!(parse_completion("1.\n2. Real copy"), vec!["Real copy"]);
    }
}
