use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error::TypeError, schema::Id};

pub type FormData = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Payload for both creating and updating a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub tags: Vec<Id>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
}

impl TryFrom<FormData> for RecipeForm {
    type Error = TypeError;

    fn try_from(data: FormData) -> Result<Self, Self::Error> {
        let value = Value::Object(data.into_iter().collect());
        serde_json::from_value(value).map_err(|e| TypeError::new(&format!("Invalid recipe: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Explicit recipe query; evaluated by `fetch_recipes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches if it carries any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
