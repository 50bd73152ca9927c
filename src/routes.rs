use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    campaign::{Campaign, CampaignEvent},
    error::ApiError,
    generator::VariantGenerator,
    models::{CampaignGenerateRequest, CreateCampaignRequest, GenerateVariantsBody, GenerateVariantsResponse, GenerationRequest},
    social::{MockPoster, PostResult, PostToSocialRequest, PostToSocialResponse},
    upload::{image_reference, too_large_message, validate_upload, UploadConfig, UploadResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
    pub generator: Arc<VariantGenerator>,
    pub poster: Arc<MockPoster>,
    pub upload: Arc<UploadConfig>,
}

impl AppState {
    pub fn new(generator: VariantGenerator, poster: MockPoster, upload: UploadConfig) -> Self {
        Self {
            campaigns: Arc::default(),
            generator: Arc::new(generator),
            poster: Arc::new(poster),
            upload: Arc::new(upload),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Leave headroom for multipart framing around a maximum-size image.
    let body_limit = state.upload.max_bytes + 1024 * 1024;

    Router::new()
        .route("/health", get(health))
        .route("/api/generate-variants", post(generate_variants))
        .route("/api/upload-image", post(upload_image))
        .route("/api/post-to-social", post(post_to_social))
        .route("/api/campaigns", post(create_campaign))
        .route("/api/campaigns/:id", get(get_campaign))
        .route("/api/campaigns/:id/generate", post(generate_for_campaign))
        .route("/api/campaigns/:id/variants/:variant_id/toggle", post(toggle_variant))
        .route("/api/campaigns/:id/post", post(post_campaign))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn generate_variants(
    State(state): State<AppState>,
    body: Result<Json<GenerateVariantsBody>, JsonRejection>,
) -> Result<Json<GenerateVariantsResponse>, ApiError> {
    let Json(body) = body?;
    let request = body.into_request();

    tracing::info!("🚀 Generating variants for {} platforms", request.platforms.len());
    let outcome = state.generator.generate(&request).await?;

    Ok(Json(GenerateVariantsResponse {
        success: true,
        variants: outcome.variants,
        skipped: outcome.skipped,
    }))
}

pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let max_bytes = state.upload.max_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().unwrap_or("image").to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;

        validate_upload(content_type.as_deref(), data.len(), max_bytes)
            .map_err(ApiError::InvalidRequest)?;

        let image_url = image_reference(&state.upload, &file_name);
        tracing::info!("🖼️ Accepted upload '{}' ({} bytes) as {}", file_name, data.len(), image_url);
        return Ok(Json(UploadResponse {
            success: true,
            image_url,
            message: "Image uploaded successfully".to_string(),
        }));
    }

    Err(ApiError::InvalidRequest("No image file provided".into()))
}

/// Body-limit failures while streaming a field are reported as an oversized upload.
fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::InvalidRequest(too_large_message(max_bytes))
    } else {
        ApiError::InvalidRequest(e.body_text())
    }
}

pub async fn post_to_social(
    State(state): State<AppState>,
    body: Result<Json<PostToSocialRequest>, JsonRejection>,
) -> Result<Json<PostToSocialResponse>, ApiError> {
    let Json(body) = body?;
    let variants = body.variants.unwrap_or_default();
    if variants.is_empty() {
        return Err(ApiError::InvalidRequest("No variants to post".into()));
    }

    tracing::info!(
        "📣 Posting {} variants (platforms: {:?}, {} access tokens supplied)",
        variants.len(),
        body.platforms.unwrap_or_default(),
        body.access_tokens.map_or(0, |t| t.len())
    );
    let posts = state.poster.post_selected(&variants).await;
    Ok(Json(PostToSocialResponse::from_posts(posts)))
}

pub async fn create_campaign(
    State(state): State<AppState>,
    body: Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let Json(body) = body?;
    let image = body
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Missing required fields: imageUrl".into()))?;

    let campaign = Campaign::new(image);
    state.campaigns.write().insert(campaign.id, campaign.clone());
    tracing::info!("🎯 Created campaign {}", campaign.id);
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn get_campaign(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Campaign>, ApiError> {
    state
        .campaigns
        .read()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

pub async fn generate_for_campaign(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: Result<Json<CampaignGenerateRequest>, JsonRejection>,
) -> Result<Json<Campaign>, ApiError> {
    let Json(body) = body?;
    let platforms = body.platforms.unwrap_or_default();
    if platforms.is_empty() {
        return Err(ApiError::InvalidRequest("Missing required fields: platforms".into()));
    }

    // Mark as generating before releasing the lock so a concurrent request sees a conflict.
    let image = {
        let mut guard = state.campaigns.write();
        let campaign = guard.get(&id).cloned().ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let started = campaign.apply(CampaignEvent::GenerationStarted { platforms: platforms.clone() })?;
        let image = started.original_image.clone();
        guard.insert(id, started);
        image
    };

    let request = GenerationRequest {
        image_reference: image,
        platforms,
        product_description: body.product_description,
    };

    // The campaign is now `generating`; finish on a detached task so a dropped
    // request still applies the completing transition.
    let task = tokio::spawn(finish_generation(state, id, request));
    task.await.map_err(|e| ApiError::Internal(format!("generation task failed: {e}")))?
}

async fn finish_generation(state: AppState, id: Uuid, request: GenerationRequest) -> Result<Json<Campaign>, ApiError> {
    let result = state.generator.generate(&request).await;

    let mut guard = state.campaigns.write();
    let campaign = guard.get(&id).cloned().ok_or_else(|| ApiError::NotFound(id.to_string()))?;
    match result {
        Ok(outcome) => {
            let ready = campaign.apply(CampaignEvent::GenerationCompleted { variants: outcome.variants })?;
            guard.insert(id, ready.clone());
            tracing::info!("✅ Campaign {} ready with {} variants", id, ready.variants.len());
            Ok(Json(ready))
        }
        Err(e) => {
            let reverted = campaign.apply(CampaignEvent::GenerationFailed)?;
            guard.insert(id, reverted);
            Err(e.into())
        }
    }
}

pub async fn toggle_variant(
    Path((id, variant_id)): Path<(Uuid, String)>,
    State(state): State<AppState>,
) -> Result<Json<Campaign>, ApiError> {
    let mut guard = state.campaigns.write();
    let campaign = guard.get(&id).cloned().ok_or_else(|| ApiError::NotFound(id.to_string()))?;
    let updated = campaign.toggle_variant(&variant_id)?;
    guard.insert(id, updated.clone());
    Ok(Json(updated))
}

#[derive(Debug, Serialize)]
pub struct PostCampaignResponse {
    pub success: bool,
    pub campaign: Campaign,
    pub posts: Vec<PostResult>,
    pub message: String,
}

pub async fn post_campaign(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<PostCampaignResponse>, ApiError> {
    // Claim the campaign before any posting so concurrent posts, toggles and
    // regenerations are rejected while the simulated posts run.
    let posted = {
        let mut guard = state.campaigns.write();
        let campaign = guard.get(&id).cloned().ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let posted = campaign.apply(CampaignEvent::Posted)?;
        guard.insert(id, posted.clone());
        posted
    };

    let poster = state.poster.clone();
    let selected = posted.selected_variants();
    let posts = tokio::spawn(async move { poster.post_selected(&selected).await })
        .await
        .map_err(|e| ApiError::Internal(format!("posting task failed: {e}")))?;

    let message = format!("Successfully posted {} variants", posts.len());
    Ok(Json(PostCampaignResponse { success: true, campaign: posted, posts, message }))
}
