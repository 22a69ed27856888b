//! In-memory drinks repository.
//!
//! Titles are unique (exact match after trimming). Ids are assigned
//! sequentially from 1 and never reused.

use crate::models::{Drink, Ingredient};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Why a repository operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrinkStoreError {
    #[error("drink not found")]
    NotFound,

    #[error("a drink with this title already exists")]
    DuplicateTitle,

    #[error("invalid drink: {0}")]
    Invalid(&'static str),
}

/// A validated drink awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Default)]
struct Store {
    next_id: i64,
    drinks: BTreeMap<i64, Drink>,
}

impl Store {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.drinks
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
    }
}

/// Drinks repository backed by process memory.
#[derive(Default)]
pub struct DrinksRepository {
    store: RwLock<Store>,
}

impl DrinksRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All drinks in id order.
    pub async fn list(&self) -> Vec<Drink> {
        self.store.read().await.drinks.values().cloned().collect()
    }

    /// Insert a drink and return it with its assigned id.
    pub async fn create(&self, drink: NewDrink) -> Result<Drink, DrinkStoreError> {
        let title = validate_title(&drink.title)?;
        validate_recipe(&drink.recipe)?;

        let mut store = self.store.write().await;
        if store.title_taken(&title, None) {
            return Err(DrinkStoreError::DuplicateTitle);
        }

        store.next_id += 1;
        let created = Drink {
            id: store.next_id,
            title,
            recipe: drink.recipe,
        };
        store.drinks.insert(created.id, created.clone());

        tracing::debug!(target: "cafe.repositories.drinks", id = created.id, "Drink created");
        Ok(created)
    }

    /// Replace the title and/or recipe of an existing drink.
    ///
    /// An unknown id is reported before any validation failure.
    pub async fn update(
        &self,
        id: i64,
        title: Option<String>,
        recipe: Option<Vec<Ingredient>>,
    ) -> Result<Drink, DrinkStoreError> {
        let mut store = self.store.write().await;
        if !store.drinks.contains_key(&id) {
            return Err(DrinkStoreError::NotFound);
        }

        let title = title.as_deref().map(validate_title).transpose()?;
        if let Some(recipe) = &recipe {
            validate_recipe(recipe)?;
        }
        if let Some(title) = &title {
            if store.title_taken(title, Some(id)) {
                return Err(DrinkStoreError::DuplicateTitle);
            }
        }

        let drink = store
            .drinks
            .get_mut(&id)
            .ok_or(DrinkStoreError::NotFound)?;
        if let Some(title) = title {
            drink.title = title;
        }
        if let Some(recipe) = recipe {
            drink.recipe = recipe;
        }

        tracing::debug!(target: "cafe.repositories.drinks", id = id, "Drink updated");
        Ok(drink.clone())
    }

    /// Remove a drink.
    pub async fn delete(&self, id: i64) -> Result<(), DrinkStoreError> {
        self.store
            .write()
            .await
            .drinks
            .remove(&id)
            .map(|_| {
                tracing::debug!(target: "cafe.repositories.drinks", id = id, "Drink deleted");
            })
            .ok_or(DrinkStoreError::NotFound)
    }
}

fn validate_title(title: &str) -> Result<String, DrinkStoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DrinkStoreError::Invalid("title must not be empty"));
    }
    Ok(title.to_string())
}

fn validate_recipe(recipe: &[Ingredient]) -> Result<(), DrinkStoreError> {
    if recipe.is_empty() {
        return Err(DrinkStoreError::Invalid("recipe must not be empty"));
    }
    for ingredient in recipe {
        if ingredient.name.trim().is_empty() || ingredient.color.trim().is_empty() {
            return Err(DrinkStoreError::Invalid("ingredient name and color are required"));
        }
        if ingredient.parts == 0 {
            return Err(DrinkStoreError::Invalid("ingredient parts must be positive"));
        }
    }
    Ok(())
}
