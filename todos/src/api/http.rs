//! HTTP implementation of the todos resource

use super::{ApiError, ApiFuture, ApiResult, TodosApi};
use crate::config::ApiConfig;
use crate::types::{NewTodo, Todo, TodoId};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// JSON-over-HTTP client for the todos resource
#[derive(Clone, Debug)]
pub struct HttpTodosApi {
    client: Client,
    base_url: Arc<str>,
}

impl HttpTodosApi {
    /// Create a client for the resource rooted at `base_url`
    #[must_use]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client using an existing `reqwest::Client`
    #[must_use]
    pub fn with_client(client: Client, base_url: impl AsRef<str>) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        }
    }

    /// Create a client from configuration, applying the request timeout
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Base URL requests are issued against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: TodoId) -> String {
        format!("{}/todos/{id}", self.base_url)
    }
}

fn transport(error: &reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

/// Fails on non-success statuses, keeping the body for diagnostics
async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Server {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

impl TodosApi for HttpTodosApi {
    fn list_todos(&self, user_id: u64) -> ApiFuture<Vec<Todo>> {
        let request = self
            .client
            .get(format!("{}?userId={user_id}", self.collection_url()));

        Box::pin(async move {
            tracing::debug!(user_id, "GET todos");
            let response = request.send().await.map_err(|e| transport(&e))?;
            decode(response).await
        })
    }

    fn create_todo(&self, new_todo: NewTodo) -> ApiFuture<Todo> {
        let request = self.client.post(self.collection_url()).json(&new_todo);

        Box::pin(async move {
            tracing::debug!(title = %new_todo.title, "POST todo");
            let response = request.send().await.map_err(|e| transport(&e))?;
            decode(response).await
        })
    }

    fn update_todo(&self, todo: Todo) -> ApiFuture<Todo> {
        let request = self.client.patch(self.item_url(todo.id)).json(&todo);

        Box::pin(async move {
            tracing::debug!(id = %todo.id, completed = todo.completed, "PATCH todo");
            let response = request.send().await.map_err(|e| transport(&e))?;
            decode(response).await
        })
    }

    fn delete_todo(&self, id: TodoId) -> ApiFuture<()> {
        let request = self.client.delete(self.item_url(id));

        Box::pin(async move {
            tracing::debug!(%id, "DELETE todo");
            let response = request.send().await.map_err(|e| transport(&e))?;
            check_status(response).await.map(|_| ())
        })
    }
}
