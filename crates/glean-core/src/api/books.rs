use super::client::ApiClient;
use super::transport::ApiRequest;
use super::types::{Book, ListBooksParams, MessageResponse, UpdateProgress};
use crate::error::Result;
use serde_json::json;

pub async fn list_books(client: &ApiClient, params: &ListBooksParams) -> Result<Vec<Book>> {
    let mut request = ApiRequest::get("books");
    if let Some(starred) = params.starred {
        request = request.query("starred", starred);
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        request = request.query("search", search);
    }
    if let Some(finished) = params.finished {
        request = request.query("finished", finished);
    }
    if let Some(started) = params.started {
        request = request.query("started", started);
    }
    client.json(request).await
}

/// `count` is only sent when positive; the server defaults to one book.
pub async fn random_books(client: &ApiClient, count: Option<u32>) -> Result<Vec<Book>> {
    let mut request = ApiRequest::get("books/random");
    if let Some(count) = count.filter(|count| *count > 0) {
        request = request.query("count", count);
    }
    client.json(request).await
}

pub async fn get_book(client: &ApiClient, book_id: i64) -> Result<Book> {
    client.json(ApiRequest::get(format!("books/{book_id}"))).await
}

pub async fn update_progress(
    client: &ApiClient,
    book_id: i64,
    progress: UpdateProgress,
) -> Result<Book> {
    let body = serde_json::to_value(progress)?;
    client
        .json(ApiRequest::patch(format!("books/{book_id}/progress")).json(body))
        .await
}

pub async fn mark_finished(client: &ApiClient, book_id: i64, finished: bool) -> Result<Book> {
    client
        .json(ApiRequest::patch(format!("books/{book_id}/finish")).json(json!({ "finished": finished })))
        .await
}

pub async fn toggle_star(client: &ApiClient, book_id: i64, starred: bool) -> Result<Book> {
    client
        .json(ApiRequest::patch(format!("books/{book_id}/star")).json(json!({ "starred": starred })))
        .await
}

pub async fn reparse_book(client: &ApiClient, book_id: i64) -> Result<Book> {
    client
        .json(ApiRequest::post(format!("books/{book_id}/reparse")))
        .await
}

/// Remove a book. With `physical` the server also deletes the file on disk.
pub async fn delete_book(client: &ApiClient, book_id: i64, physical: bool) -> Result<MessageResponse> {
    let mut request = ApiRequest::delete(format!("books/{book_id}"));
    if physical {
        request = request.query("physical", true);
    }
    client.json(request).await
}
