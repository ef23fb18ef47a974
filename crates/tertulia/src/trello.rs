//! A minimal Trello client for the board tools.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::TrelloSettings;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("{status} {body}")]
    Status { status: StatusCode, body: String },
}

/// The operations the board tools need.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Creates a card at the top of list `list_id`.
    async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        description: &str,
    ) -> Result<(), BoardError>;

    /// Returns the raw JSON array of the board's lists.
    async fn board_lists(&self) -> Result<String, BoardError>;
}

#[derive(Serialize)]
struct NewCard<'a> {
    name: &'a str,
    desc: &'a str,
    pos: &'static str,
}

pub struct TrelloClient {
    http: reqwest::Client,
    settings: TrelloSettings,
}

impl TrelloClient {
    pub fn new(settings: TrelloSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl BoardService for TrelloClient {
    async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        description: &str,
    ) -> Result<(), BoardError> {
        let resp = self
            .http
            .post(self.endpoint("/1/cards"))
            .query(&[
                ("idList", list_id),
                ("key", self.settings.api_key.as_str()),
                ("token", self.settings.token.as_str()),
                ("name", name),
                ("desc", description),
            ])
            .json(&NewCard {
                name,
                desc: description,
                pos: "top",
            })
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn board_lists(&self) -> Result<String, BoardError> {
        let path = format!("/1/boards/{}/lists", self.settings.board_id);
        let resp = self
            .http
            .get(self.endpoint(&path))
            .query(&[
                ("key", self.settings.api_key.as_str()),
                ("token", self.settings.token.as_str()),
            ])
            .send()
            .await?;
        Ok(check_status(resp).await?.text().await?)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BoardError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!("Trello answered {status}: {body}");
    Err(BoardError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client(base_url: String) -> TrelloClient {
        TrelloClient::new(TrelloSettings {
            base_url,
            api_key: "k".to_owned(),
            token: "t".to_owned(),
            board_id: "b1".to_owned(),
        })
    }

    #[tokio::test]
    async fn test_create_card() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/1/cards")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("idList".into(), "l1".into()),
                Matcher::UrlEncoded("key".into(), "k".into()),
                Matcher::UrlEncoded("token".into(), "t".into()),
                Matcher::UrlEncoded("name".into(), "Comprar pan".into()),
            ]))
            .match_body(Matcher::Json(json!({
                "name": "Comprar pan",
                "desc": "de bono",
                "pos": "top",
            })))
            .with_status(200)
            .with_body(r#"{"id":"c1"}"#)
            .create_async()
            .await;

        client(server.url())
            .create_card("l1", "Comprar pan", "de bono")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_board_lists_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/1/boards/b1/lists")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("invalid token")
            .create_async()
            .await;

        let err = client(server.url()).board_lists().await.unwrap_err();
        let BoardError::Status { status, body } = err else {
            panic!("expected a status error");
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid token");
    }
}
