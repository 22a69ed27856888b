//! Drink handlers for the cafe service.
//!
//! Implements drink endpoints:
//!
//! - `GET /drinks` - Menu in short form (public)
//! - `GET /drinks-detail` - Menu in long form (`get:drinks-detail`)
//! - `POST /drinks` - Create drink (`post:drinks`)
//! - `PATCH /drinks/:id` - Update drink (`patch:drinks`)
//! - `DELETE /drinks/:id` - Delete drink (`delete:drinks`)
//!
//! Permissions are enforced by the route layer before these handlers run;
//! handlers that need the caller take `Extension<Claims>`.

use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{
    CreateDrinkRequest, DeleteDrinkResponse, Drink, DrinkShort, DrinksResponse,
    UpdateDrinkRequest,
};
use crate::repositories::NewDrink;
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Parse a request body: invalid JSON is 400, JSON of the wrong shape is 422.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "cafe.handlers.drinks", error = %e, "Request body is not JSON");
        ApiError::BadRequest("Invalid JSON body".to_string())
    })?;

    serde_json::from_value(value).map_err(|e| {
        tracing::debug!(target: "cafe.handlers.drinks", error = %e, "Request body has wrong shape");
        ApiError::Unprocessable("Invalid request body".to_string())
    })
}

/// Route ids are integers; anything else names no drink.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

/// Handler for GET /drinks
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [short]}`
/// - 404 Not Found: the menu is empty
#[instrument(skip_all, name = "cafe.drinks.list")]
pub async fn list_drinks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<DrinkShort>>, ApiError> {
    let drinks = state.drinks.list().await;
    if drinks.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::short).collect(),
    )))
}

/// Handler for GET /drinks-detail
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [long]}`
/// - 404 Not Found: the menu is empty
#[instrument(skip_all, name = "cafe.drinks.detail")]
pub async fn list_drinks_detail(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let drinks = state.drinks.list().await;
    if drinks.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::long).collect(),
    )))
}

/// Handler for POST /drinks
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [long of created]}`
/// - 400 Bad Request: body is not JSON
/// - 422 Unprocessable Entity: missing title or recipe, duplicate title,
///   or invalid ingredients
#[instrument(skip_all, name = "cafe.drinks.create")]
pub async fn create_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let request: CreateDrinkRequest = parse_body(&body)?;

    let (Some(title), Some(recipe)) = (request.title, request.recipe) else {
        return Err(ApiError::Unprocessable(
            "title and recipe are required".to_string(),
        ));
    };

    let created = state
        .drinks
        .create(NewDrink {
            title,
            recipe: recipe.into_ingredients(),
        })
        .await?;

    tracing::info!(
        target: "cafe.handlers.drinks",
        id = created.id,
        claims = ?claims,
        "Drink created"
    );

    Ok(Json(DrinksResponse::new(vec![created.long()])))
}

/// Handler for PATCH /drinks/:id
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [long of updated]}`
/// - 400 Bad Request: body is not JSON
/// - 404 Not Found: unknown id
/// - 422 Unprocessable Entity: duplicate title or invalid fields
#[instrument(skip_all, name = "cafe.drinks.update")]
pub async fn update_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let id = parse_id(&id)?;
    let request: UpdateDrinkRequest = parse_body(&body)?;

    let updated = state
        .drinks
        .update(
            id,
            request.title,
            request.recipe.map(|recipe| recipe.into_ingredients()),
        )
        .await?;

    tracing::info!(target: "cafe.handlers.drinks", id = id, claims = ?claims, "Drink updated");

    Ok(Json(DrinksResponse::new(vec![updated.long()])))
}

/// Handler for DELETE /drinks/:id
///
/// # Response
///
/// - 200 OK: `{"success": true, "delete": id}`
/// - 404 Not Found: unknown id
#[instrument(skip_all, name = "cafe.drinks.delete")]
pub async fn delete_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDrinkResponse>, ApiError> {
    let id = parse_id(&id)?;
    state.drinks.delete(id).await?;

    tracing::info!(target: "cafe.handlers.drinks", id = id, claims = ?claims, "Drink deleted");

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
