//! Organization handlers: signup, status, archival.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{ActorId, OrgId, Organization, StatusTransition};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Organization response.
#[derive(Debug, Serialize)]
pub struct OrgResponse {
    /// Organization ID.
    pub org_id: String,
    /// Display name.
    pub name: String,
    /// Current lifecycle state.
    pub account_status: String,
    /// Whether consumption is currently permitted.
    pub credit_spending_enabled: bool,
    /// Why spending is disabled, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_reason: Option<String>,
    /// Trial start, RFC 3339.
    pub trial_started_at: String,
    /// Trial end, RFC 3339.
    pub trial_ends_at: String,
    /// Grace window end, RFC 3339, while one is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_ends_at: Option<String>,
    /// Archival timestamp, RFC 3339, once archived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

impl From<&Organization> for OrgResponse {
    fn from(org: &Organization) -> Self {
        Self {
            org_id: org.id.to_string(),
            name: org.name.clone(),
            account_status: org.account_status.as_str().to_string(),
            credit_spending_enabled: org.credit_spending_enabled,
            read_only_reason: org.read_only_reason.map(|r| r.as_str().to_string()),
            trial_started_at: org.trial_started_at.to_rfc3339(),
            trial_ends_at: org.trial_ends_at.to_rfc3339(),
            grace_period_ends_at: org.grace_period_ends_at.map(|t| t.to_rfc3339()),
            archived_at: org.archived_at.map(|t| t.to_rfc3339()),
            created_at: org.created_at.to_rfc3339(),
        }
    }
}

/// Signup request.
#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    /// Organization id from the platform. Generated when omitted.
    pub org_id: Option<String>,
    /// Display name.
    pub name: String,
}

/// Create an organization at signup.
pub async fn create_org(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreateOrgRequest>,
) -> Result<Json<OrgResponse>, ApiError> {
    let org_id = match body.org_id {
        Some(raw) => raw
            .parse::<OrgId>()
            .map_err(|_| ApiError::BadRequest("Invalid organization ID".into()))?,
        None => OrgId::generate(),
    };

    let org = state.lifecycle.create_org(org_id, body.name)?;
    Ok(Json(OrgResponse::from(&org)))
}

/// Get an organization's lifecycle state.
pub async fn get_org(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(org_id): Path<String>,
) -> Result<Json<OrgResponse>, ApiError> {
    let org_id = parse_org_id(&org_id)?;
    let org = state.lifecycle.get_org(&org_id)?;
    Ok(Json(OrgResponse::from(&org)))
}

/// Archive request.
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveRequest {
    /// The administrator performing the archival.
    pub actor_id: Option<String>,
}

/// Archive an organization. Terminal and idempotent.
pub async fn archive_org(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(org_id): Path<String>,
    body: Option<Json<ArchiveRequest>>,
) -> Result<Json<OrgResponse>, ApiError> {
    let org_id = parse_org_id(&org_id)?;
    let actor_id = body
        .and_then(|Json(b)| b.actor_id)
        .map(|raw| raw.parse::<ActorId>())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid actor ID".into()))?;

    let org = state.lifecycle.archive(&org_id, actor_id)?;
    tracing::info!(org_id = %org_id, "Organization archived");
    Ok(Json(OrgResponse::from(&org)))
}

/// Transition audit query parameters.
#[derive(Debug, Deserialize)]
pub struct TransitionsQuery {
    /// Page size (default 50).
    pub limit: Option<usize>,
    /// Records to skip.
    pub offset: Option<usize>,
}

/// One lifecycle transition audit record on the wire.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// Record ID.
    pub transition_id: String,
    /// Previous state. Absent for the signup record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// New state.
    pub to: String,
    /// What caused the transition.
    pub trigger: String,
    /// External correlation id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// The administrator responsible, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// When the transition occurred, RFC 3339.
    pub occurred_at: String,
}

impl From<&StatusTransition> for TransitionResponse {
    fn from(t: &StatusTransition) -> Self {
        Self {
            transition_id: t.id.to_string(),
            from: t.from.map(|s| s.as_str().to_string()),
            to: t.to.as_str().to_string(),
            trigger: t.trigger.as_str().to_string(),
            correlation_id: t.correlation_id.clone(),
            actor_id: t.actor_id.map(|a| a.to_string()),
            occurred_at: t.occurred_at.to_rfc3339(),
        }
    }
}

/// Transition audit response.
#[derive(Debug, Serialize)]
pub struct TransitionsResponse {
    /// Audit records, newest first.
    pub transitions: Vec<TransitionResponse>,
}

/// List lifecycle transition audit records for an organization.
pub async fn list_transitions(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(org_id): Path<String>,
    Query(query): Query<TransitionsQuery>,
) -> Result<Json<TransitionsResponse>, ApiError> {
    let org_id = parse_org_id(&org_id)?;
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);

    let transitions = state.lifecycle.transitions(&org_id, limit, offset)?;
    Ok(Json(TransitionsResponse {
        transitions: transitions.iter().map(TransitionResponse::from).collect(),
    }))
}

pub(crate) fn parse_org_id(raw: &str) -> Result<OrgId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid organization ID".into()))
}
