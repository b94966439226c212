//! HTTP handlers for the family tree API

use crate::family::{Family, Link};
use crate::graph::{Edge, GraphError, Member, MemberPatch, Node, NodeId, Person, Position, PropertyMap, PropertyValue};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

pub type SharedFamily = Arc<RwLock<Family>>;

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Graph(GraphError),
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::Graph(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Graph(err) => match err {
                GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(..) => StatusCode::NOT_FOUND,
                GraphError::SelfRelationship(_)
                | GraphError::InvalidPattern(_)
                | GraphError::InvalidRelationship(_) => StatusCode::BAD_REQUEST,
                GraphError::EdgeAlreadyExists(..) => StatusCode::CONFLICT,
                GraphError::Persistence(_)
                | GraphError::InvariantViolation(_)
                | GraphError::InconsistentState { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Graph(err) => err.to_string(),
        };
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn attributes_from_json(attributes: &Map<String, JsonValue>) -> PropertyMap {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), PropertyValue::from_json(value)))
        .collect()
}

fn attributes_to_json(attributes: &PropertyMap) -> Map<String, JsonValue> {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

fn position_json(position: Option<Position>) -> JsonValue {
    match position {
        Some(position) => json!({ "x": position.x, "y": position.y }),
        None => JsonValue::Null,
    }
}

pub fn member_json(member: &Member) -> JsonValue {
    json!({
        "id": member.id.as_u64(),
        "first_name": member.person.first_name,
        "last_name": member.person.last_name,
        "generation": member.person.generation,
        "position": position_json(member.position),
        "created_at": member.created_at,
        "attributes": attributes_to_json(&member.person.attributes),
    })
}

pub fn edge_json(edge: &Edge) -> JsonValue {
    json!({
        "id": edge.id.as_u64(),
        "source": edge.source.as_u64(),
        "target": edge.target.as_u64(),
        "relationship": edge.relationship,
    })
}

pub fn node_json(node: &Node) -> JsonValue {
    let mut value = member_json(&node.member);
    if let JsonValue::Object(fields) = &mut value {
        fields.insert(
            "relationships".to_string(),
            node.edges.iter().map(edge_json).collect(),
        );
    }
    value
}

/// Person as sent by clients
#[derive(Debug, Deserialize)]
pub struct PersonPayload {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub generation: Option<i64>,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
}

impl PersonPayload {
    fn into_person(self) -> Person {
        Person {
            first_name: self.first_name,
            last_name: self.last_name,
            generation: self.generation,
            attributes: attributes_from_json(&self.attributes),
        }
    }
}

/// Request for adding a member
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub member: PersonPayload,
    pub previous: Option<u64>,
    pub relationship: Option<i64>,
}

/// Partial member update
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub generation: Option<i64>,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
}

/// Relationship between two existing members
#[derive(Debug, Deserialize)]
pub struct RelationshipRequest {
    pub source: u64,
    pub target: u64,
    pub relationship: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub field: String,
    pub pattern: String,
}

pub async fn add_member_handler(
    State(family): State<SharedFamily>,
    Json(payload): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let link = match (payload.previous, payload.relationship) {
        (Some(previous), Some(relationship)) => Some(Link::new(NodeId::new(previous), relationship)),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "previous and relationship must be given together".to_string(),
            ))
        }
    };

    let mut family = family.write().await;
    let member = family.add_member(payload.member.into_person(), link)?;
    Ok((StatusCode::CREATED, Json(member_json(&member))))
}

pub async fn list_members_handler(State(family): State<SharedFamily>) -> ApiResult<impl IntoResponse> {
    let mut family = family.write().await;
    let nodes = family.get_all_members()?;
    Ok(Json(nodes.iter().map(node_json).collect::<Vec<_>>()))
}

pub async fn search_members_handler(
    State(family): State<SharedFamily>,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let mut family = family.write().await;
    let nodes = family.get_members_by_attribute(&params.field, &params.pattern)?;
    Ok(Json(nodes.iter().map(node_json).collect::<Vec<_>>()))
}

pub async fn get_member_handler(
    State(family): State<SharedFamily>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let id = NodeId::new(id);
    let mut family = family.write().await;
    let node = family.get_member(id)?.ok_or(GraphError::NodeNotFound(id))?;
    Ok(Json(node_json(&node)))
}

pub async fn update_member_handler(
    State(family): State<SharedFamily>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = NodeId::new(id);
    let patch = MemberPatch {
        first_name: payload.first_name,
        last_name: payload.last_name,
        generation: payload.generation,
        position: None,
        attributes: attributes_from_json(&payload.attributes),
    };

    let mut family = family.write().await;
    let node = family
        .update_member(id, &patch)?
        .ok_or(GraphError::NodeNotFound(id))?;
    Ok(Json(node_json(&node)))
}

pub async fn remove_member_handler(
    State(family): State<SharedFamily>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let id = NodeId::new(id);
    let mut family = family.write().await;
    if family.remove_member(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(GraphError::NodeNotFound(id).into())
    }
}

pub async fn add_relationship_handler(
    State(family): State<SharedFamily>,
    Json(payload): Json<RelationshipRequest>,
) -> ApiResult<impl IntoResponse> {
    let (source, target) = (NodeId::new(payload.source), NodeId::new(payload.target));
    let mut family = family.write().await;
    family.add_relationship(source, target, payload.relationship)?;
    Ok((StatusCode::CREATED, Json(relationship_pair_json(&family, source, target))))
}

pub async fn change_relationship_handler(
    State(family): State<SharedFamily>,
    Json(payload): Json<RelationshipRequest>,
) -> ApiResult<impl IntoResponse> {
    let (source, target) = (NodeId::new(payload.source), NodeId::new(payload.target));
    let mut family = family.write().await;
    family.change_relationship(source, target, payload.relationship)?;
    Ok(Json(relationship_pair_json(&family, source, target)))
}

fn relationship_pair_json(family: &Family, source: NodeId, target: NodeId) -> JsonValue {
    let store = family.store();
    json!({
        "forward": store.get_edge(source, target).map(edge_json),
        "inverse": store.get_edge(target, source).map(edge_json),
    })
}

pub async fn remove_relationship_handler(
    State(family): State<SharedFamily>,
    Path((source, target)): Path<(u64, u64)>,
) -> ApiResult<StatusCode> {
    let mut family = family.write().await;
    family.remove_relationship(NodeId::new(source), NodeId::new(target))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for system status
pub async fn status_handler(State(family): State<SharedFamily>) -> impl IntoResponse {
    let family = family.read().await;
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "storage": {
            "synced": family.store().is_synced(),
            "members": family.member_count(),
            "relationships": family.relationship_count(),
        }
    }))
}
