use serde::{Serialize, Deserialize};
use std::fmt;

/// Social destination a variant is written for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Farcaster,
}

impl Platform {
    /// Wire identifier, also used in fabricated post URLs.
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Farcaster => "farcaster",
        }
    }

    /// Human-facing name used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Farcaster => "Farcaster",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub image_reference: String,
    pub platforms: Vec<Platform>,
    pub product_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdVariant {
    pub id: String,
    #[serde(rename = "imageUrl")]
    pub image_reference: String,
    pub text_overlay: String,
    #[serde(rename = "platformSpec", alias = "platform")]
    pub platform: Platform,
    #[serde(default)]
    pub selected: bool,
}

/// Body of `POST /api/generate-variants`. Fields are optional on the wire so a
/// missing field is reported as a request error instead of a parse failure.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVariantsBody {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default)]
    pub product_description: Option<String>,
}

impl GenerateVariantsBody {
    pub fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            image_reference: self.image_url.unwrap_or_default(),
            platforms: self.platforms.unwrap_or_default(),
            product_description: self.product_description,
        }
    }
}

/// A platform whose provider call failed and therefore contributed no variants.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SkippedPlatform {
    pub platform: Platform,
    pub reason: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct GenerateVariantsResponse {
    pub success: bool,
    pub variants: Vec<AdVariant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedPlatform>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CampaignGenerateRequest {
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default)]
    pub product_description: Option<String>,
}
