//! services/cli/src/http.rs
//!
//! `ReadingApi` over HTTP. The session token travels as the `session` cookie,
//! exactly as a browser would send it.

use async_trait::async_trait;
use reading_tracker_core::{
    Book, BookSummary, NewBook, NewReadingRun, NewReadingSession, PortError, PortResult,
    ReadingApi, ReadingRun, ReadingSession,
};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// The body of every non-2xx response from the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

pub struct HttpReadingApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpReadingApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(header::COOKIE, format!("session={}", token)),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> PortResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Could not reach the API: {}", e)))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unexpected response from the API: {}", e)))
    }
}

/// Turns a non-2xx response into the matching `PortError`, keeping the
/// server's message.
async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => {
            debug!("API answered {} {}", status, body.code);
            body.message
        }
        Err(_) => status.to_string(),
    };
    Err(error_for_status(status, message))
}

fn error_for_status(status: StatusCode, message: String) -> PortError {
    match status {
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::BAD_REQUEST => PortError::Invalid(message),
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        _ => PortError::Unexpected(format!("{} ({})", message, status)),
    }
}

#[async_trait]
impl ReadingApi for HttpReadingApi {
    async fn list_books(&self, query: Option<&str>) -> PortResult<Vec<BookSummary>> {
        let mut builder = self.request(Method::GET, "/books");
        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            builder = builder.query(&[("q", q)]);
        }
        self.send(builder).await
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.send(self.request(Method::GET, &format!("/books/{}", book_id)))
            .await
    }

    async fn create_book(&self, book: &NewBook) -> PortResult<Book> {
        self.send(self.request(Method::POST, "/books").json(book))
            .await
    }

    async fn list_runs(&self, book_id: Uuid) -> PortResult<Vec<ReadingRun>> {
        self.send(
            self.request(Method::GET, "/reading-runs")
                .query(&[("bookId", book_id.to_string())]),
        )
        .await
    }

    async fn create_run(&self, run: &NewReadingRun) -> PortResult<ReadingRun> {
        self.send(self.request(Method::POST, "/reading-runs").json(run))
            .await
    }

    async fn list_sessions(&self, run_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        self.send(
            self.request(Method::GET, "/reading-sessions")
                .query(&[("runId", run_id.to_string())]),
        )
        .await
    }

    async fn create_session(&self, session: &NewReadingSession) -> PortResult<ReadingSession> {
        self.send(self.request(Method::POST, "/reading-sessions").json(session))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_port_errors() {
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "Reading run not found".to_string()),
            PortError::NotFound(m) if m == "Reading run not found"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, "[json.endPage] bad".to_string()),
            PortError::Invalid(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            PortError::Unauthorized
        ));
        assert!(matches!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_string()),
            PortError::Unexpected(_)
        ));
    }

    #[test]
    fn base_url_and_empty_tokens_are_normalized() {
        let api = HttpReadingApi::new("http://localhost:3000/", Some(String::new()))
            .expect("client builds");

        assert_eq!(api.base_url, "http://localhost:3000");
        assert_eq!(api.token, None);
    }
}
