//! Cafe service models.
//!
//! A drink's recipe is a list of ingredients. Two representations are
//! served: the *short* form drops ingredient names (public menu), the
//! *long* form is complete (baristas and managers).

use serde::{Deserialize, Serialize};

/// One recipe ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Ingredient without its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

impl From<&Ingredient> for ShortIngredient {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            color: ingredient.color.clone(),
            parts: ingredient.parts,
        }
    }
}

/// A stored drink. Serializes as the long representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Short representation of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl Drink {
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.iter().map(ShortIngredient::from).collect(),
        }
    }

    pub fn long(&self) -> Drink {
        self.clone()
    }
}

/// A recipe as clients send it: a list of ingredients, or a single one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    pub fn into_ingredients(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::Many(ingredients) => ingredients,
            RecipeInput::One(ingredient) => vec![ingredient],
        }
    }
}

/// Request body for `POST /drinks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

/// Request body for `PATCH /drinks/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

/// `{"success": true, "drinks": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// `{"success": true, "delete": <id>}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i64,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// Key set status ("loaded" or "unavailable").
    pub key_set: String,

    /// Generic error message when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
