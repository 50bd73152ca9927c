//! Simulated social posting. Nothing leaves the process: each selected variant
//! waits a fixed delay and receives a fabricated post URL.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::info;

use crate::models::{AdVariant, Platform};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostToSocialRequest {
    #[serde(default)]
    pub variants: Option<Vec<AdVariant>>,
    /// Accepted for UI compatibility; the simulation does not use them.
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default)]
    pub access_tokens: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostResult {
    pub variant_id: String,
    pub platform: Platform,
    pub success: bool,
    pub post_url: Option<String>,
    pub post_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PostToSocialResponse {
    pub success: bool,
    pub posts: Vec<PostResult>,
    pub message: String,
}

impl PostToSocialResponse {
    pub fn from_posts(posts: Vec<PostResult>) -> Self {
        let message = format!("Successfully posted {} variants", posts.len());
        Self { success: true, posts, message }
    }
}

pub struct MockPoster {
    delay: Duration,
}

impl MockPoster {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Posts every selected variant in order; unselected variants are ignored.
    pub async fn post_selected(&self, variants: &[AdVariant]) -> Vec<PostResult> {
        let mut results = Vec::new();
        for variant in variants.iter().filter(|v| v.selected) {
            results.push(self.post_one(variant).await);
        }
        info!("📣 Simulated posting of {} of {} variants", results.len(), variants.len());
        results
    }

    async fn post_one(&self, variant: &AdVariant) -> PostResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let millis = Utc::now().timestamp_millis();
        let platform = variant.platform.id();
        info!("Posted {} to {}", variant.id, platform);
        PostResult {
            variant_id: variant.id.clone(),
            platform: variant.platform,
            success: true,
            post_url: Some(format!("https://{platform}.com/post/{millis}")),
            post_id: Some(format!("{platform}_{millis}")),
            error: None,
        }
    }
}
