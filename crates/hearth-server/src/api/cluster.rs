//! Cluster Diagnostics Endpoints

use super::state::AppState;
use axum::{extract::State, response::Json};
use hearth_core::activation::ActivationInfo;
use hearth_core::{Member, MemberId};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub local: MemberId,
    pub version: u64,
    pub members: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct ActivationsResponse {
    pub member: MemberId,
    pub count: usize,
    pub activations: Vec<ActivationInfo>,
}

/// GET /cluster/members - the membership view this member routes with
#[tracing::instrument(skip(state))]
pub async fn get_members(State(state): State<AppState>) -> Json<MembersResponse> {
    let view = state.node.membership().current();
    Json(MembersResponse {
        local: state.node.member().clone(),
        version: view.version(),
        members: view.members().cloned().collect(),
    })
}

/// GET /cluster/activations - grains currently active on this member
#[tracing::instrument(skip(state))]
pub async fn get_activations(State(state): State<AppState>) -> Json<ActivationsResponse> {
    let activations = state.node.local_activations();
    Json(ActivationsResponse {
        member: state.node.member().clone(),
        count: activations.len(),
        activations,
    })
}
