use super::client::ApiClient;
use super::transport::ApiRequest;
use super::types::Chapter;
use crate::error::Result;

pub async fn list_chapters(client: &ApiClient, book_id: i64) -> Result<Vec<Chapter>> {
    client
        .json(ApiRequest::get(format!("books/{book_id}/chapters")))
        .await
}

/// Chapter text. The server answers with a plain-text body, not JSON.
pub async fn chapter_content(client: &ApiClient, book_id: i64, index: usize) -> Result<String> {
    client
        .text(ApiRequest::get(format!("books/{book_id}/chapters/{index}")))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockReply, MockTransport};
    use crate::api::transport::Method;
    use serde_json::json;

    #[tokio::test]
    async fn chapter_listing_and_content() {
        let (client, transport) = MockTransport::client();
        transport
            .respond(
                Method::Get,
                "books/2/chapters",
                MockReply::json(
                    200,
                    json!([
                        {"id": 10, "book_id": 2, "title": "One", "order_index": 0},
                        {"id": 11, "book_id": 2, "title": "Two", "order_index": 1}
                    ]),
                ),
            )
            .respond(Method::Get, "books/2/chapters/1", MockReply::text(200, "It was dark."));

        let chapters = list_chapters(&client, 2).await.expect("chapters");
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].title, "Two");

        let text = chapter_content(&client, 2, 1).await.expect("content");
        assert_eq!(text, "It was dark.");
    }
}
