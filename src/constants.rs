pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 32_000;

pub const RECIPES_LIMIT_DEFAULT: i64 = 3;

pub const MAX_CHAR_LENGTH: usize = 200;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_COLOR_LENGTH: usize = 7;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

pub const SHOPPING_LIST_TITLE: &str = "Shopping list";
pub const SHOPPING_LIST_PDF_FILENAME: &str = "shopping_list.pdf";

pub const RECIPE_ALREADY_IN_FAVORITES: &str = "Recipe is already in favorites";
pub const RECIPE_NOT_IN_FAVORITES: &str = "Recipe is not in favorites";
pub const RECIPE_ALREADY_IN_SHOPPING_CART: &str = "Recipe is already in the shopping cart";
pub const RECIPE_NOT_IN_SHOPPING_CART: &str = "Recipe is not in the shopping cart";
pub const RECIPE_NOT_FOUND: &str = "No recipe exists with specified id";
pub const RECIPE_ALREADY_EXISTS: &str = "You already have a recipe with this name";
pub const USER_NOT_FOUND: &str = "No user exists with specified id";
pub const USER_ALREADY_EXISTS: &str = "A user with this email or username already exists";
pub const ALREADY_FOLLOWING_AUTHOR: &str = "You are already subscribed to this author";
pub const NOT_FOLLOWING_AUTHOR: &str = "You are not subscribed to this author";
pub const CANNOT_FOLLOW_YOURSELF: &str = "You cannot subscribe to yourself";
pub const TAG_ALREADY_EXISTS: &str = "A tag with this name, color or slug already exists";
pub const INGREDIENT_ALREADY_EXISTS: &str = "This ingredient already exists with the same unit";

pub const MISSING_TAGS: &str = "Select at least one tag";
pub const DUPLICATE_TAGS: &str = "Tags must be unique";
pub const UNKNOWN_TAG: &str = "Tag doesn't exist";
pub const MISSING_INGREDIENTS: &str = "Add at least one ingredient";
pub const DUPLICATE_INGREDIENTS: &str = "Ingredients must be unique";
pub const UNKNOWN_INGREDIENT: &str = "Ingredient doesn't exist";
