//! REST handlers. Every handler is a thin translation layer: parse the
//! request, send an [`EngineCommand`](crate::simulation::command::EngineCommand)
//! down the channel, await the response, serialize it. None of them touch
//! the simulation `World` directly.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::http::error::ApiError;
use crate::http::state::AppState;
use crate::simulation::action::Action;
use crate::simulation::command::EngineCommand;
use crate::simulation::espionage::MissionType;
use crate::simulation::ids::{CharacterId, FamilyTreeId, PactId, RegionId};

fn parse_id<T>(raw: &str, wrap: impl Fn(u64) -> T) -> Result<T, ApiError> {
    raw.parse::<u64>()
        .map(wrap)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid id: {raw}")))
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = state.summary.read().expect("summary lock poisoned").clone();
    Html(format!(
        r#"<!DOCTYPE html>
<html><head><title>earthwatch</title></head>
<body>
<h1>earthwatch</h1>
<p>tick {} &middot; {} &middot; {}, {}</p>
<ul>
<li>GET /world/status</li>
<li>GET /regions, /regions/:id</li>
<li>GET /species, /species/:id</li>
<li>GET /characters/:id</li>
<li>GET /families/:id</li>
<li>POST /characters/:id/actions</li>
<li>GET /ws (WebSocket owner session)</li>
</ul>
</body></html>"#,
        summary.tick, summary.era, summary.season, summary.time_of_day
    ))
}

pub async fn get_world_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = state.summary.read().expect("summary lock poisoned").clone();
    Json(summary)
}

pub async fn list_regions(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetRegions { respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let regions = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(regions))
}

pub async fn get_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let region_id = parse_id(&id, RegionId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetRegion { region_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let region = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    region.map(Json).ok_or_else(|| ApiError::NotFound(format!("region {id}")))
}

pub async fn list_species(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetSpecies { respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let species = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(species))
}

pub async fn get_species(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(target) = id.parse::<u64>() {
        let (respond_to, receiver) = oneshot::channel();
        state
            .commands
            .send(EngineCommand::GetSpecies { respond_to })
            .map_err(|_| ApiError::EngineUnavailable)?;
        let species = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
        return species
            .into_iter()
            .find(|s| s.id.0 == target)
            .map(Json)
            .ok_or_else(|| ApiError::NotFound(format!("species {id}")));
    }

    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetSpeciesByName { name: id.clone(), respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let species = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    species.map(Json).ok_or_else(|| ApiError::NotFound(format!("species {id}")))
}

pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let character_id = parse_id(&id, CharacterId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetCharacter { character_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let character = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    character.map(Json).ok_or_else(|| ApiError::NotFound(format!("character {id}")))
}

pub async fn get_family_tree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let family_tree_id = parse_id(&id, FamilyTreeId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetFamilyTree { family_tree_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let tree = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    tree.map(Json).ok_or_else(|| ApiError::NotFound(format!("family tree {id}")))
}

#[derive(Debug, Deserialize)]
pub struct ProposePactRequest {
    pub target_id: u64,
    pub offer: String,
    pub demand: String,
}

pub async fn propose_pact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ProposePactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let proposer_id = parse_id(&id, CharacterId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::ProposePact {
            proposer_id,
            target_id: CharacterId(request.target_id),
            offer: request.offer,
            demand: request.demand,
            respond_to,
        })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let outcome = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    outcome.map(Json).map_err(|err| ApiError::InvalidRequest(format!("{err:?}")))
}

pub async fn list_pacts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let character_id = parse_id(&id, CharacterId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetPactsForCharacter { character_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let pacts = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(pacts))
}

#[derive(Debug, Deserialize)]
pub struct ShareIntelRequest {
    pub to_family_id: u64,
    pub region_id: u64,
    #[serde(default = "default_intel_utility")]
    pub utility: f32,
}

fn default_intel_utility() -> f32 {
    0.5
}

pub async fn share_intel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(request): Query<ShareIntelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let from_family_id = parse_id(&id, FamilyTreeId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::ShareIntel {
            from_family_id,
            to_family_id: FamilyTreeId(request.to_family_id),
            region_id: RegionId(request.region_id),
            utility: request.utility,
            respond_to,
        })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let assessment = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(assessment))
}

#[derive(Debug, Deserialize)]
pub struct BreakPactRequest {
    pub breaker_id: u64,
}

pub async fn break_pact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<BreakPactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pact_id = parse_id(&id, PactId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::BreakPact {
            pact_id,
            breaker_id: CharacterId(request.breaker_id),
            respond_to,
        })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let outcome = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    outcome.map(|_| Json(serde_json::json!({ "broken": true }))).map_err(|err| ApiError::InvalidRequest(err.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RecordIntelAccuracyRequest {
    pub subject_family_id: u64,
    pub was_accurate: bool,
}

pub async fn record_intel_accuracy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<RecordIntelAccuracyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let observer_family_id = parse_id(&id, FamilyTreeId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::RecordIntelAccuracy {
            observer_family_id,
            subject_family_id: FamilyTreeId(request.subject_family_id),
            was_accurate: request.was_accurate,
            respond_to,
        })
        .map_err(|_| ApiError::EngineUnavailable)?;
    receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(serde_json::json!({ "recorded": true })))
}

#[derive(Debug, Deserialize)]
pub struct StartMissionRequest {
    pub mission_type: MissionType,
    pub support_character_ids: Vec<u64>,
    pub target_region_id: u64,
    pub target_family_id: Option<u64>,
}

pub async fn start_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StartMissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent_character_id = parse_id(&id, CharacterId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::StartMission {
            mission_type: request.mission_type,
            agent_character_id,
            support_character_ids: request.support_character_ids.into_iter().map(CharacterId).collect(),
            target_region_id: RegionId(request.target_region_id),
            target_family_id: request.target_family_id.map(FamilyTreeId),
            respond_to,
        })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let outcome = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    outcome.map(Json).map_err(|err| ApiError::InvalidRequest(err.to_string()))
}

pub async fn knows_heartland(
    State(state): State<Arc<AppState>>,
    Path((id, target_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let observer_family_id = parse_id(&id, FamilyTreeId)?;
    let target_family_id = parse_id(&target_id, FamilyTreeId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::KnowsHeartland { observer_family_id, target_family_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let knows = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    Ok(Json(serde_json::json!({ "knows": knows })))
}

pub async fn get_intel(
    State(state): State<Arc<AppState>>,
    Path((id, region_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let family_tree_id = parse_id(&id, FamilyTreeId)?;
    let region_id = parse_id(&region_id, RegionId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetIntel { family_tree_id, region_id, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let record = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    record.map(Json).ok_or_else(|| ApiError::NotFound(format!("no intel on region {}", region_id.0)))
}

pub async fn get_taxonomy_node(
    State(state): State<Arc<AppState>>,
    Path((rank, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let rank: crate::simulation::taxonomy::Rank =
        serde_json::from_value(serde_json::Value::String(rank.clone()))
            .map_err(|_| ApiError::InvalidRequest(format!("invalid rank: {rank}")))?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::GetTaxonomyTraitOverrides { rank, name: name.clone(), respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let overrides = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    overrides.map(Json).ok_or_else(|| ApiError::NotFound(format!("taxonomy node {name}")))
}

pub async fn submit_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<Action>,
) -> Result<impl IntoResponse, ApiError> {
    let character_id = parse_id(&id, CharacterId)?;
    let (respond_to, receiver) = oneshot::channel();
    state
        .commands
        .send(EngineCommand::SubmitAction { character_id, action, respond_to })
        .map_err(|_| ApiError::EngineUnavailable)?;
    let outcome = receiver.await.map_err(|_| ApiError::EngineUnavailable)?;
    match outcome {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err) => Err(ApiError::InvalidRequest(format!("{err:?}"))),
    }
}
