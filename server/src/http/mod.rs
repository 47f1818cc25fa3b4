//! HTTP Layer
//!
//! JSON handlers over the repositories. Lists and cards share one set of
//! generic handlers; `Collection` picks the repository.

mod error;

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::domain::{Board, Card, DomainError, DomainResult, List, PositionUpdate};
use crate::repository::{
    init_db, BoardRepository, DbState, Repository, SiblingHierarchyOperations,
    SiblingPositioningOperations, SiblingRepository, SiblingTable,
};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub boards: BoardRepository,
    pub lists: SiblingRepository<List>,
    pub cards: SiblingRepository<Card>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: &DbState) -> Self {
        Self {
            boards: BoardRepository::new(db.connection()),
            lists: SiblingRepository::new(db.connection()),
            cards: SiblingRepository::new(db.connection()),
        }
    }

    /// Open the database at `db_path` and build the state around it
    pub fn open(db_path: &FsPath) -> DomainResult<SharedState> {
        let db = init_db(db_path)?;
        Ok(Arc::new(Self::new(&db)))
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateBoardRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateChildRequest {
    pub title: String,
    /// Omitted means "append"
    pub position: Option<u32>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateChildRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub source_parent_id: u32,
    pub dest_parent_id: u32,
    pub new_order: u32,
}

/// A sibling kind served over HTTP
pub trait Collection: SiblingTable {
    fn repo(state: &AppState) -> &SiblingRepository<Self>;

    fn draft(parent_id: u32, req: CreateChildRequest) -> Self;

    fn patch(&mut self, req: UpdateChildRequest);
}

impl Collection for List {
    fn repo(state: &AppState) -> &SiblingRepository<Self> {
        &state.lists
    }

    fn draft(parent_id: u32, req: CreateChildRequest) -> Self {
        List::new(parent_id, req.title).at(req.position.unwrap_or(0))
    }

    fn patch(&mut self, req: UpdateChildRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
    }
}

impl Collection for Card {
    fn repo(state: &AppState) -> &SiblingRepository<Self> {
        &state.cards
    }

    fn draft(parent_id: u32, req: CreateChildRequest) -> Self {
        Card::new(parent_id, req.title)
            .with_description(req.description)
            .at(req.position.unwrap_or(0))
    }

    fn patch(&mut self, req: UpdateChildRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if req.description.is_some() {
            self.description = req.description;
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/{id}", get(get_board).delete(delete_board))
        .route(
            "/boards/{id}/lists",
            get(fetch_children::<List>).post(create_child::<List>),
        )
        .route("/boards/{id}/lists/positions", put(set_positions::<List>))
        .route(
            "/lists/{id}",
            delete(delete_child::<List>).patch(update_child::<List>),
        )
        .route("/lists/{id}/move", post(move_child::<List>))
        .route(
            "/lists/{id}/cards",
            get(fetch_children::<Card>).post(create_child::<Card>),
        )
        .route("/lists/{id}/cards/positions", put(set_positions::<Card>))
        .route(
            "/cards/{id}",
            delete(delete_child::<Card>).patch(update_child::<Card>),
        )
        .route("/cards/{id}/move", post(move_child::<Card>))
        .route("/health", get(health_check))
        .with_state(state)
}

// ── Boards ────────────────────────────────────────────────────────────

async fn list_boards(State(state): State<SharedState>) -> Result<Json<Vec<Board>>, DomainError> {
    Ok(Json(state.boards.list().await?))
}

async fn create_board(
    State(state): State<SharedState>,
    Json(req): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<Board>), DomainError> {
    let board = state.boards.create(&Board::new(req.title)).await?;
    tracing::info!(board_id = board.id, "board created");
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
) -> Result<Json<Board>, DomainError> {
    match state.boards.find_by_id(id).await? {
        Some(board) => Ok(Json(board)),
        None => Err(DomainError::NotFound(format!("board {}", id))),
    }
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
) -> Result<StatusCode, DomainError> {
    state.boards.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Lists and cards ───────────────────────────────────────────────────

async fn fetch_children<T: Collection>(
    State(state): State<SharedState>,
    Path(parent_id): Path<u32>,
) -> Result<Json<Vec<T>>, DomainError> {
    Ok(Json(T::repo(&state).children(parent_id).await?))
}

async fn create_child<T: Collection>(
    State(state): State<SharedState>,
    Path(parent_id): Path<u32>,
    Json(req): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<T>), DomainError> {
    if req.position == Some(0) {
        return Err(DomainError::InvalidInput("positions start at 1".to_string()));
    }
    let created = T::repo(&state).create(&T::draft(parent_id, req)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_child<T: Collection>(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    Json(req): Json<UpdateChildRequest>,
) -> Result<Json<T>, DomainError> {
    let repo = T::repo(&state);
    let mut entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("{} {}", T::NAME, id)))?;
    entity.patch(req);
    Ok(Json(repo.update(&entity).await?))
}

async fn delete_child<T: Collection>(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
) -> Result<StatusCode, DomainError> {
    T::repo(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_positions<T: Collection>(
    State(state): State<SharedState>,
    Path(parent_id): Path<u32>,
    Json(updates): Json<Vec<PositionUpdate>>,
) -> Result<Json<Vec<T>>, DomainError> {
    Ok(Json(T::repo(&state).bulk_set_positions(parent_id, &updates).await?))
}

async fn move_child<T: Collection>(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<T>, DomainError> {
    let moved = T::repo(&state)
        .move_to(id, req.source_parent_id, req.dest_parent_id, req.new_order)
        .await?;
    Ok(Json(moved))
}

async fn health_check() -> &'static str {
    "ok"
}
