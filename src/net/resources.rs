//! Typed calls for the admin screens: books, loans, and users.
//!
//! Responses the screens never read (create/issue/return/card) come back
//! as raw JSON; list endpoints are parsed into their DTOs at the boundary.

#[cfg(test)]
#[path = "resources_test.rs"]
mod resources_test;

use serde_json::Value;

use super::api::{ApiClient, ApiError, RequestOptions};
use super::types::{Book, BorrowRecord, IssueRequest, NewBook, UserSummary};

fn book_path(id: i64) -> String {
    format!("/books/{id}")
}

fn return_path(record_id: i64) -> String {
    format!("/borrow/return/{record_id}")
}

fn card_path(user_id: i64) -> String {
    format!("/users/{user_id}/card")
}

impl ApiClient {
    /// `GET /books`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request or the decode.
    pub async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        self.request_json("/books", RequestOptions::get()).await
    }

    /// `POST /books`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`].
    pub async fn create_book(&self, book: &NewBook) -> Result<Value, ApiError> {
        self.request("/books", RequestOptions::post().with_json(book)?).await
    }

    /// `DELETE /books/{id}`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`].
    pub async fn delete_book(&self, id: i64) -> Result<(), ApiError> {
        self.request(&book_path(id), RequestOptions::delete()).await?;
        Ok(())
    }

    /// `GET /borrow/active`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request or the decode.
    pub async fn active_borrows(&self) -> Result<Vec<BorrowRecord>, ApiError> {
        self.request_json("/borrow/active", RequestOptions::get()).await
    }

    /// `POST /borrow/issue`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`].
    pub async fn issue_book(&self, issue: &IssueRequest) -> Result<Value, ApiError> {
        self.request("/borrow/issue", RequestOptions::post().with_json(issue)?).await
    }

    /// `POST /borrow/return/{id}`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`].
    pub async fn return_book(&self, record_id: i64) -> Result<Value, ApiError> {
        self.request(&return_path(record_id), RequestOptions::post()).await
    }

    /// `GET /users`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the request or the decode.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ApiError> {
        self.request_json("/users", RequestOptions::get()).await
    }

    /// `POST /users/{id}/card`
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`].
    pub async fn create_card(&self, user_id: i64) -> Result<Value, ApiError> {
        self.request(&card_path(user_id), RequestOptions::post()).await
    }
}
