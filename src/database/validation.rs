use std::collections::HashSet;

use crate::{
    constants::{
        DUPLICATE_INGREDIENTS, DUPLICATE_TAGS, MAX_CHAR_LENGTH, MAX_COLOR_LENGTH,
        MAX_COOKING_TIME, MAX_EMAIL_LENGTH, MAX_INGREDIENT_AMOUNT, MAX_USERNAME_LENGTH,
        MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, MISSING_INGREDIENTS, MISSING_TAGS,
        UNKNOWN_INGREDIENT, UNKNOWN_TAG,
    },
    error::ValidationErrors,
    form::{IngredientAmount, NewUser, RecipeForm},
    schema::Id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeLimits {
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub min_amount: i32,
    pub max_amount: i32,
}

impl Default for RecipeLimits {
    fn default() -> Self {
        Self {
            min_cooking_time: MIN_COOKING_TIME,
            max_cooking_time: MAX_COOKING_TIME,
            min_amount: MIN_INGREDIENT_AMOUNT,
            max_amount: MAX_INGREDIENT_AMOUNT,
        }
    }
}

/// A recipe payload that passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl From<RecipeForm> for ValidRecipe {
    fn from(form: RecipeForm) -> Self {
        Self {
            name: form.name.trim().to_owned(),
            text: form.text.trim().to_owned(),
            image: form.image.trim().to_owned(),
            cooking_time: form.cooking_time,
            tags: form.tags,
            ingredients: form.ingredients,
        }
    }
}

/// Checks everything about a recipe payload that doesn't need the database.
/// All problems are reported, not only the first one.
pub fn validate_recipe(form: &RecipeForm, limits: &RecipeLimits) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.add("name", "Name can't be empty");
    } else if name.chars().count() > MAX_CHAR_LENGTH {
        errors.add(
            "name",
            &format!("Name can't be longer than {MAX_CHAR_LENGTH} characters"),
        );
    }

    if form.text.trim().is_empty() {
        errors.add("text", "Description can't be empty");
    }

    if form.image.trim().is_empty() {
        errors.add("image", "Image can't be empty");
    }

    if form.cooking_time < limits.min_cooking_time {
        errors.add(
            "cooking_time",
            &format!(
                "Cooking time must be at least {} minute(s)",
                limits.min_cooking_time
            ),
        );
    }
    if form.cooking_time > limits.max_cooking_time {
        errors.add(
            "cooking_time",
            &format!(
                "Cooking time must be at most {} minute(s)",
                limits.max_cooking_time
            ),
        );
    }

    if form.tags.is_empty() {
        errors.add("tags", MISSING_TAGS);
    } else if has_duplicates(form.tags.iter().copied()) {
        errors.add("tags", DUPLICATE_TAGS);
    }

    if form.ingredients.is_empty() {
        errors.add("ingredients", MISSING_INGREDIENTS);
    } else if has_duplicates(form.ingredients.iter().map(|i| i.id)) {
        errors.add("ingredients", DUPLICATE_INGREDIENTS);
    }

    for ingredient in form.ingredients.iter() {
        if ingredient.amount < limits.min_amount {
            errors.add(
                "ingredients",
                &format!(
                    "Amount of ingredient {} must be at least {}",
                    ingredient.id, limits.min_amount
                ),
            );
        } else if ingredient.amount > limits.max_amount {
            errors.add(
                "ingredients",
                &format!(
                    "Amount of ingredient {} must be at most {}",
                    ingredient.id, limits.max_amount
                ),
            );
        }
    }

    errors
}

/// Reports tag and ingredient ids missing from the catalogs.
pub fn check_references(
    form: &RecipeForm,
    known_tags: &HashSet<Id>,
    known_ingredients: &HashSet<Id>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for id in form.tags.iter().filter(|id| !known_tags.contains(id)) {
        errors.add("tags", &format!("{UNKNOWN_TAG}: {id}"));
    }

    for id in form
        .ingredients
        .iter()
        .map(|i| i.id)
        .filter(|id| !known_ingredients.contains(id))
    {
        errors.add("ingredients", &format!("{UNKNOWN_INGREDIENT}: {id}"));
    }

    errors
}

pub fn validate_new_user(user: &NewUser) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if !is_valid_email(&user.email) {
        errors.add("email", "Enter a valid email address");
    }

    if user.username.is_empty() {
        errors.add("username", "Username can't be empty");
    } else if user.username.chars().count() > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            &format!("Username can't be longer than {MAX_USERNAME_LENGTH} characters"),
        );
    } else if !is_valid_username(&user.username) {
        errors.add(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        );
    }

    for (field, value) in [
        ("first_name", &user.first_name),
        ("last_name", &user.last_name),
    ] {
        if value.trim().is_empty() {
            errors.add(field, "This field can't be empty");
        } else if value.chars().count() > MAX_USERNAME_LENGTH {
            errors.add(
                field,
                &format!("Can't be longer than {MAX_USERNAME_LENGTH} characters"),
            );
        }
    }

    errors.merge(validate_password(&user.password));

    errors
}

pub fn validate_password(password: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if password.is_empty() {
        errors.add("password", "Password can't be empty");
    }
    errors
}

pub fn validate_tag(name: &str, color: &str, slug: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if name.trim().is_empty() || name.chars().count() > MAX_CHAR_LENGTH {
        errors.add("name", "Tag name must be 1 to 200 characters");
    }
    if !is_valid_color(color) {
        errors.add("color", "Color must be a HEX code such as #FF0000");
    }
    if slug.is_empty()
        || slug.chars().count() > MAX_CHAR_LENGTH
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.add("slug", "Slug may contain only latin letters, digits, - and _");
    }

    errors
}

fn has_duplicates<I: Iterator<Item = Id>>(ids: I) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => {
            color.len() <= MAX_COLOR_LENGTH
                && (hex.len() == 6 || hex.len() == 3)
                && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}
