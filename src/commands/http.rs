//! HTTP bindings for the board service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::SiblingApi;
use crate::config::BoardConfig;
use crate::error::{BoardError, BoardResult};
use crate::models::{Board, MoveIntent, Position, PositionUpdate, Sequenced};

// ========================
// Argument Structs
// ========================

#[derive(Serialize)]
struct CreateBoardArgs<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct CreateSiblingArgs<'a> {
    title: &'a str,
    position: Position,
}

#[derive(Serialize)]
struct MoveArgs {
    source_parent_id: u32,
    dest_parent_id: u32,
    new_order: Position,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// JSON client for the board service
#[derive(Debug, Clone)]
pub struct HttpBoardClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBoardClient {
    pub fn new(config: &BoardConfig) -> BoardResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub async fn list_boards(&self) -> BoardResult<Vec<Board>> {
        let response = self.http.get(self.url("boards")).send().await?;
        decode(response).await
    }

    pub async fn create_board(&self, title: &str) -> BoardResult<Board> {
        let response = self
            .http
            .post(self.url("boards"))
            .json(&CreateBoardArgs { title })
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> BoardResult<R> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

async fn check_status(response: reqwest::Response) -> BoardResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(BoardError::PersistenceFailure(format!("{}: {}", status, message)))
}

// ========================
// Commands
// ========================

#[async_trait]
impl<T> SiblingApi<T> for HttpBoardClient
where
    T: Sequenced + DeserializeOwned,
{
    async fn fetch_siblings(&self, parent_id: u32) -> BoardResult<Vec<T>> {
        let kind = T::KIND;
        let path = format!("{}/{}/{}", kind.parent_collection(), parent_id, kind.collection());
        let response = self.http.get(self.url(&path)).send().await?;
        decode(response).await
    }

    async fn create_entity(&self, parent_id: u32, title: &str, position: Position) -> BoardResult<T> {
        let kind = T::KIND;
        let path = format!("{}/{}/{}", kind.parent_collection(), parent_id, kind.collection());
        let response = self
            .http
            .post(self.url(&path))
            .json(&CreateSiblingArgs { title, position })
            .send()
            .await?;
        decode(response).await
    }

    async fn delete_entity(&self, id: u32) -> BoardResult<()> {
        let path = format!("{}/{}", T::KIND.collection(), id);
        let response = self.http.delete(self.url(&path)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn bulk_set_positions(
        &self,
        parent_id: u32,
        positions: &[PositionUpdate],
    ) -> BoardResult<Vec<T>> {
        let kind = T::KIND;
        let path = format!(
            "{}/{}/{}/positions",
            kind.parent_collection(),
            parent_id,
            kind.collection()
        );
        let response = self.http.put(self.url(&path)).json(positions).send().await?;
        decode(response).await
    }

    async fn move_single_entity(&self, intent: MoveIntent) -> BoardResult<()> {
        let path = format!("{}/{}/move", T::KIND.collection(), intent.entity_id);
        let response = self
            .http
            .post(self.url(&path))
            .json(&MoveArgs {
                source_parent_id: intent.source_parent_id,
                dest_parent_id: intent.dest_parent_id,
                new_order: intent.new_order,
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
