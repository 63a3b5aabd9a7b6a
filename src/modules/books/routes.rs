//! Handlers for the `/books` resource.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use bookshelf_http::error::AppError;

use super::models::{BookListResponse, BookResponse, MessageResponse};
use super::repository::{BookRepository, RepositoryError};
use super::validation::BookRules;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateIsbn(ref isbn) => AppError::conflict(
                vec![json!({ "field": "isbn", "value": isbn })],
                err.to_string(),
            ),
            RepositoryError::Unavailable(source) => {
                AppError::Internal(anyhow::Error::new(source).context("book storage unavailable"))
            }
        }
    }
}

fn book_not_found(isbn: &str) -> AppError {
    AppError::not_found(format!("no book with isbn '{}'", isbn))
}

/// `GET /books/health`
pub async fn health_check(State(repo): State<BookRepository>) -> Result<&'static str, AppError> {
    repo.ping().await?;
    Ok("books module is healthy")
}

/// `GET /books`
pub async fn list_books(
    State(repo): State<BookRepository>,
) -> Result<Json<BookListResponse>, AppError> {
    let books = repo.list_all().await?;
    Ok(Json(BookListResponse { books }))
}

/// `GET /books/{isbn}`
pub async fn get_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    match repo.get_by_isbn(&isbn).await? {
        Some(book) => Ok(Json(BookResponse { book })),
        None => Err(book_not_found(&isbn)),
    }
}

/// `POST /books`
pub async fn create_book(
    State(repo): State<BookRepository>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload?;
    let book = BookRules::current()
        .validate_new(&payload)
        .map_err(|errors| AppError::validation(errors, "book payload is invalid"))?;

    let book = repo.insert(&book).await?;
    tracing::info!(isbn = %book.isbn, "book created");

    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

/// `PUT /books/{isbn}`
pub async fn update_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload?;
    let changes = BookRules::current()
        .validate_changes(&payload)
        .map_err(|errors| AppError::validation(errors, "book payload is invalid"))?;

    match repo.update(&isbn, &changes).await? {
        Some(book) => {
            tracing::info!(isbn = %book.isbn, "book updated");
            Ok(Json(BookResponse { book }))
        }
        None => Err(book_not_found(&isbn)),
    }
}

/// `DELETE /books/{isbn}`
pub async fn delete_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if repo.delete_by_isbn(&isbn).await? == 0 {
        return Err(book_not_found(&isbn));
    }

    tracing::info!(%isbn, "book deleted");
    Ok(Json(MessageResponse {
        message: "Book deleted",
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use bookshelf_kernel::settings::{DatabaseSettings, Settings};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let settings = Settings {
            database: DatabaseSettings::in_memory(),
            ..Settings::default()
        };
        let registry = crate::app::prepare(&settings).await.unwrap();
        bookshelf_http::build_router(&registry, &settings)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri, None).await
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        send(app, Method::POST, uri, Some(body)).await
    }

    async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        send(app, Method::PUT, uri, Some(body)).await
    }

    async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::DELETE, uri, None).await
    }

    fn sample_book() -> Value {
        json!({
            "isbn": "1234567890",
            "amazon_url": "http://a.co/eobPtX2",
            "author": "John Doe",
            "language": "English",
            "pages": 300,
            "publisher": "Test Publisher",
            "title": "Sample Book",
            "year": 2022
        })
    }

    fn updated_fields() -> Value {
        json!({
            "amazon_url": "http://amazon.com/updated_book",
            "author": "Updated Author",
            "language": "French",
            "pages": 320,
            "publisher": "Updated Publisher",
            "title": "Updated Title",
            "year": 2023
        })
    }

    async fn seeded() -> Router {
        let app = app().await;
        let (status, _) = post(&app, "/books", sample_book()).await;
        assert_eq!(status, StatusCode::CREATED);
        app
    }

    #[tokio::test]
    async fn lists_all_books() {
        let app = seeded().await;

        let (status, body) = get(&app, "/books").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "books": [sample_book()] }));
    }

    #[tokio::test]
    async fn lists_nothing_when_empty() {
        let app = app().await;

        let (status, body) = get(&app, "/books").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "books": [] }));
    }

    #[tokio::test]
    async fn gets_single_book() {
        let app = seeded().await;

        let (status, body) = get(&app, "/books/1234567890").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "book": sample_book() }));
    }

    #[tokio::test]
    async fn unknown_isbn_is_not_found() {
        let app = seeded().await;

        let (status, body) = get(&app, "/books/invalid_isbn").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn creates_book_and_reads_it_back() {
        let app = app().await;
        let new_book = json!({
            "isbn": "0987654321",
            "amazon_url": "http://amazon.com/newbook",
            "author": "Jane Smith",
            "language": "English",
            "pages": 150,
            "publisher": "New Publisher",
            "title": "New Book",
            "year": 2021
        });

        let (status, body) = post(&app, "/books", new_book.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["book"], new_book);

        let (status, body) = get(&app, "/books/0987654321").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["book"], new_book);
    }

    #[tokio::test]
    async fn create_rejects_incomplete_payload() {
        let app = app().await;

        let (status, body) = post(&app, "/books", json!({ "isbn": "short" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.contains(&json!("isbn must be at least 10 characters")));
        assert!(errors.contains(&json!("title is required")));
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let app = app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/books")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"isbn\": "))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_isbn_conflicts_and_keeps_first_row() {
        let app = seeded().await;
        let mut duplicate = sample_book();
        duplicate["title"] = json!("Impostor");

        let (status, body) = post(&app, "/books", duplicate).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");

        let (_, body) = get(&app, "/books/1234567890").await;
        assert_eq!(body["book"], sample_book());
    }

    #[tokio::test]
    async fn updates_every_mutable_field() {
        let app = seeded().await;

        let (status, body) = put(&app, "/books/1234567890", updated_fields()).await;
        assert_eq!(status, StatusCode::OK);

        let mut expected = updated_fields();
        expected["isbn"] = json!("1234567890");
        assert_eq!(body["book"], expected);

        let (_, body) = get(&app, "/books/1234567890").await;
        assert_eq!(body["book"], expected);
    }

    #[tokio::test]
    async fn update_rejects_negative_pages() {
        let app = seeded().await;

        let (status, body) = put(&app, "/books/1234567890", json!({ "pages": -10 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .contains(&json!("pages must be a non-negative integer")));

        let mut otherwise_valid = updated_fields();
        otherwise_valid["pages"] = json!(-10);
        let (status, body) = put(&app, "/books/1234567890", otherwise_valid).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], json!(["pages must be a non-negative integer"]));

        let (_, body) = get(&app, "/books/1234567890").await;
        assert_eq!(body["book"], sample_book());
    }

    #[tokio::test]
    async fn update_cannot_change_isbn() {
        let app = seeded().await;
        let mut payload = updated_fields();
        payload["isbn"] = json!("5555555555");

        let (status, body) = put(&app, "/books/1234567890", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], json!(["isbn cannot be changed"]));
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let app = app().await;

        let (status, _) = put(&app, "/books/9999999999", updated_fields()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deletes_book_then_reports_absence() {
        let app = seeded().await;

        let (status, body) = delete(&app, "/books/1234567890").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Book deleted" }));

        let (status, _) = get(&app, "/books/1234567890").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = delete(&app, "/books/1234567890").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_of_missing_book_is_not_found() {
        let app = app().await;

        let (status, _) = delete(&app, "/books/nonexistent_isbn").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closed_storage_is_internal_error() {
        let settings = Settings {
            database: DatabaseSettings::in_memory(),
            ..Settings::default()
        };
        let registry = crate::app::prepare(&settings).await.unwrap();
        let app = bookshelf_http::build_router(&registry, &settings);
        registry.stop_all().await.unwrap();

        let (status, body) = get(&app, "/books").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert!(body["error"]["trace_id"].is_string());
    }

    #[tokio::test]
    async fn health_and_docs_are_served() {
        let app = app().await;

        let (status, body) = get(&app, "/books/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("books module is healthy"));

        let (status, body) = get(&app, "/docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].is_object());
    }
}
