use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AdVariant, Platform};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Generating,
    Ready,
    Posted,
}

/// Completion signals that move a campaign between statuses.
#[derive(Debug, Clone)]
pub enum CampaignEvent {
    GenerationStarted { platforms: Vec<Platform> },
    GenerationCompleted { variants: Vec<AdVariant> },
    GenerationFailed,
    Posted,
}

impl CampaignEvent {
    fn name(&self) -> &'static str {
        match self {
            CampaignEvent::GenerationStarted { .. } => "generation_started",
            CampaignEvent::GenerationCompleted { .. } => "generation_completed",
            CampaignEvent::GenerationFailed => "generation_failed",
            CampaignEvent::Posted => "posted",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("cannot apply {event} while campaign is {from:?}")]
    InvalidTransition { from: CampaignStatus, event: &'static str },
    #[error("no variants selected")]
    NothingSelected,
    #[error("variant not found: {0}")]
    UnknownVariant(String),
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub original_image: String,
    pub platforms: Vec<Platform>,
    pub variants: Vec<AdVariant>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(original_image: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            original_image,
            platforms: Vec::new(),
            variants: Vec::new(),
            status: CampaignStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn selected_variants(&self) -> Vec<AdVariant> {
        self.variants.iter().filter(|v| v.selected).cloned().collect()
    }

    /// Returns the campaign after `event`, or an error leaving the caller's copy untouched.
    pub fn apply(self, event: CampaignEvent) -> Result<Campaign, CampaignError> {
        use CampaignStatus::*;
        let from = self.status;
        let invalid = |event: &CampaignEvent| CampaignError::InvalidTransition { from, event: event.name() };

        let next = match (from, event) {
            (Draft | Ready, CampaignEvent::GenerationStarted { platforms }) => Campaign {
                platforms,
                variants: Vec::new(),
                status: Generating,
                ..self
            },
            (Generating, CampaignEvent::GenerationCompleted { variants }) => Campaign { variants, status: Ready, ..self },
            (Generating, CampaignEvent::GenerationFailed) => Campaign { status: Draft, ..self },
            (Ready, CampaignEvent::Posted) => {
                if !self.variants.iter().any(|v| v.selected) {
                    return Err(CampaignError::NothingSelected);
                }
                Campaign { status: Posted, ..self }
            }
            (_, event) => return Err(invalid(&event)),
        };
        Ok(Campaign { updated_at: Utc::now(), ..next })
    }

    pub fn toggle_variant(mut self, variant_id: &str) -> Result<Campaign, CampaignError> {
        if self.status != CampaignStatus::Ready {
            return Err(CampaignError::InvalidTransition { from: self.status, event: "toggle_variant" });
        }
        let variant = self
            .variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .ok_or_else(|| CampaignError::UnknownVariant(variant_id.to_string()))?;
        variant.selected = !variant.selected;
        self.updated_at = Utc::now();
        Ok(self)
    }
}
