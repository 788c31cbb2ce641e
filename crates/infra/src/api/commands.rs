//! Marketplace domain calls
//!
//! Each operation is a thin mapping onto a request descriptor dispatched
//! through the auth orchestrator. List responses are decoded through
//! [`decode_list`] here and nowhere else.

use std::path::Path;
use std::sync::Arc;

use bookmart_core::AuthOrchestrator;
use bookmart_domain::constants::UPLOAD_SELL_IMAGE_PATH;
use bookmart_domain::{
    decode_list, ApiError, RequestDescriptor, Result, Session, UploadDescriptor, UserProfile,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use urlencoding::encode;

use crate::errors::InfraError;

/// API commands for marketplace operations
pub struct MarketplaceCommands {
    auth: Arc<AuthOrchestrator>,
    upload_path: String,
}

impl MarketplaceCommands {
    /// Create a new commands instance
    ///
    /// # Arguments
    ///
    /// * `auth` - Auth orchestrator wrapping the resilient dispatcher
    pub fn new(auth: Arc<AuthOrchestrator>) -> Self {
        Self { auth, upload_path: UPLOAD_SELL_IMAGE_PATH.to_string() }
    }

    #[must_use]
    pub fn with_upload_path(mut self, upload_path: impl Into<String>) -> Self {
        self.upload_path = upload_path.into();
        self
    }

    pub fn auth(&self) -> &Arc<AuthOrchestrator> {
        &self.auth
    }

    // === Session ===

    /// Log in with a fresh host login code.
    ///
    /// # Errors
    ///
    /// See [`AuthOrchestrator::login`].
    pub async fn login(&self) -> Result<Session> {
        self.auth.login().await
    }

    /// Drop the stored token and user snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Storage` when the session cannot be cleared.
    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await
    }

    /// User snapshot stored by the last login or profile update.
    ///
    /// # Errors
    ///
    /// Returns `Storage` when the session cannot be read.
    pub async fn stored_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.auth.session().get_user().await?)
    }

    // === Profile ===

    /// Fetch the current user's profile
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    #[instrument(skip(self))]
    pub async fn get_current_user(&self) -> Result<UserProfile> {
        let body = self.call(RequestDescriptor::get("/api/me").authenticated()).await?;
        Ok(UserProfile(body))
    }

    /// Update the current user's profile and refresh the stored snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the snapshot cannot be stored
    #[instrument(skip(self, payload))]
    pub async fn update_profile(&self, payload: Value) -> Result<UserProfile> {
        let request = RequestDescriptor::put("/api/me").with_body(payload).authenticated();
        let body = self.call(request).await?;
        if body.is_object() {
            self.auth.session().set_user(Some(UserProfile(body.clone()))).await?;
        }
        Ok(UserProfile(body))
    }

    // === Catalogue ===

    /// List books for sale
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the list shape is unknown
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<Value>> {
        self.list(RequestDescriptor::get("/api/books")).await
    }

    /// Get a book by ID
    ///
    /// # Errors
    ///
    /// Returns error if the book is not found or the API request fails
    #[instrument(skip(self), fields(book_id = %id))]
    pub async fn get_item(&self, id: &str) -> Result<Value> {
        self.call(RequestDescriptor::get(format!("/api/books/{}", encode(id)))).await
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Value>> {
        self.list(RequestDescriptor::get("/api/categories")).await
    }

    /// Textbook plan for a university and school year; blank filters are
    /// left out of the query.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    #[instrument(skip(self))]
    pub async fn get_book_plan(
        &self,
        university: Option<&str>,
        school_year: Option<&str>,
    ) -> Result<Value> {
        let params: Vec<String> = [("university", university), ("schoolYear", school_year)]
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .filter(|value| !value.is_empty())
                    .map(|value| format!("{name}={}", encode(value)))
            })
            .collect();
        let path = if params.is_empty() {
            "/api/book-plan".to_string()
        } else {
            format!("/api/book-plan?{}", params.join("&"))
        };
        self.call(RequestDescriptor::get(path).authenticated()).await
    }

    // === Cart ===

    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Value> {
        self.call(RequestDescriptor::get("/api/cart").authenticated()).await
    }

    /// Add `quantity` copies of a book to the cart
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    #[instrument(skip(self, book_id))]
    pub async fn add_cart_item(&self, book_id: impl Into<Value>, quantity: u32) -> Result<Value> {
        let body = json!({ "bookId": book_id.into(), "quantity": quantity });
        self.call(RequestDescriptor::post("/api/cart/items").with_body(body).authenticated())
            .await
    }

    #[instrument(skip(self), fields(book_id = %book_id))]
    pub async fn remove_cart_item(&self, book_id: &str) -> Result<Value> {
        let path = format!("/api/cart/items/{}", encode(book_id));
        self.call(RequestDescriptor::delete(path).authenticated()).await
    }

    // === Favorites ===

    #[instrument(skip(self))]
    pub async fn list_favorites(&self) -> Result<Vec<Value>> {
        self.list(RequestDescriptor::get("/api/favorites").authenticated()).await
    }

    #[instrument(skip(self), fields(book_id = %book_id))]
    pub async fn add_favorite(&self, book_id: &str) -> Result<Value> {
        let path = format!("/api/favorites/{}", encode(book_id));
        self.call(RequestDescriptor::post(path).authenticated()).await
    }

    #[instrument(skip(self), fields(book_id = %book_id))]
    pub async fn remove_favorite(&self, book_id: &str) -> Result<Value> {
        let path = format!("/api/favorites/{}", encode(book_id));
        self.call(RequestDescriptor::delete(path).authenticated()).await
    }

    // === Orders ===

    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Value>> {
        self.list(RequestDescriptor::get("/api/orders").authenticated()).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &str) -> Result<Value> {
        let path = format!("/api/orders/{}", encode(id));
        self.call(RequestDescriptor::get(path).authenticated()).await
    }

    /// Place an order for `items`, or for the whole cart when `None`
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    #[instrument(skip(self, items))]
    pub async fn create_order(&self, items: Option<Vec<Value>>) -> Result<Value> {
        let body = items.map_or_else(|| json!({}), |items| json!({ "items": items }));
        self.call(RequestDescriptor::post("/api/orders").with_body(body).authenticated()).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &str) -> Result<Value> {
        let path = format!("/api/orders/{}/cancel", encode(id));
        self.call(RequestDescriptor::post(path).with_body(json!({})).authenticated()).await
    }

    // === Sell requests ===

    #[instrument(skip(self, payload))]
    pub async fn create_sell_request(&self, payload: Value) -> Result<Value> {
        let request = RequestDescriptor::post("/api/sell-requests").with_body(payload);
        self.call(request.authenticated()).await
    }

    #[instrument(skip(self))]
    pub async fn list_my_sell_requests(&self) -> Result<Vec<Value>> {
        self.list(RequestDescriptor::get("/api/sell-requests/mine").authenticated()).await
    }

    /// Upload a local image for a sell request
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the file cannot be read or the server's
    /// answer is not JSON, otherwise any dispatch error.
    #[instrument(skip(self, local_file_path), fields(file = %local_file_path.as_ref().display()))]
    pub async fn upload_asset(&self, local_file_path: impl AsRef<Path>) -> Result<Value> {
        let upload = UploadDescriptor::new(self.upload_path.as_str(), local_file_path.as_ref())
            .authenticated();
        self.auth.authenticated_upload(&upload).await
    }

    async fn call(&self, request: RequestDescriptor) -> Result<Value> {
        self.auth.dispatch(&request).await
    }

    async fn list(&self, request: RequestDescriptor) -> Result<Vec<Value>> {
        let body = self.call(request).await?;
        let items: Vec<Value> =
            decode_list(body).map_err(|err| ApiError::from(InfraError::from(err)))?;
        debug!(count = items.len(), "list decoded");
        Ok(items)
    }
}
