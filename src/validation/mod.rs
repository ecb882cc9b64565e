use crate::error::{Result, StoreError};
use crate::model::{Food, LineItem, Order, User};
use serde::Serialize;
use std::fmt;

/// One schema or referential-integrity violation, tied to the field that
/// caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of validating a candidate record against its collection rules and
/// the sibling collections it references.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Convert into a hard failure. The whole logical operation aborts;
    /// nothing is persisted.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(StoreError::Validation(self.errors))
        }
    }
}

/// Clamp line-item quantities to the floor of 1. An absent or non-positive
/// quantity means 1, never an error.
pub fn prepare_line_items(items: &mut [LineItem]) {
    for item in items {
        if item.quantity < 1 {
            item.quantity = 1;
        }
    }
}

pub fn validate_food(food: &Food) -> ValidationResult {
    let mut result = ValidationResult::default();

    if food.name.trim().is_empty() {
        result.push("name", "Name is required");
    }
    if food.desc.trim().is_empty() {
        result.push("desc", "Description is required");
    }
    if food.ingredients.is_empty() {
        result.push("ingredients", "Ingredients must be a non-empty list");
    }
    if food.price.org < 0.0 {
        result.push("price.org", "Price must be non-negative");
    }
    if food.price.mrp < 0.0 {
        result.push("price.mrp", "Price must be non-negative");
    }
    if food.price.off < 0.0 {
        result.push("price.off", "Discount must be non-negative");
    }

    result
}

/// Validate a user against the full User collection (for email uniqueness,
/// excluding the candidate's own id) and the sibling Food and Order
/// collections (for weak-reference resolution).
pub fn validate_user(
    candidate: &User,
    users: &[User],
    foods: &[Food],
    orders: &[Order],
) -> ValidationResult {
    let mut result = ValidationResult::default();

    if candidate.name.trim().is_empty() {
        result.push("name", "Name is required");
    }
    if candidate.email.trim().is_empty() {
        result.push("email", "Email is required");
    } else if users
        .iter()
        .any(|u| u.email == candidate.email && u.id != candidate.id)
    {
        result.push("email", "Email already exists");
    }
    if candidate.password_hash.is_empty() {
        result.push("password", "Password is required");
    }

    for food_id in &candidate.favourites {
        if !food_exists(foods, food_id) {
            result.push(
                "favourites",
                format!("Food with id {food_id} does not exist"),
            );
        }
    }

    for item in &candidate.cart {
        if item.product.is_empty() {
            result.push("cart.product", "Product id is required for each cart line");
        } else if !food_exists(foods, &item.product) {
            result.push(
                "cart.product",
                format!("Product with id {} does not exist", item.product),
            );
        }
        if item.quantity < 1 {
            result.push("cart.quantity", "Quantity must be at least 1");
        }
    }

    for order_id in &candidate.orders {
        if !orders.iter().any(|o| o.id == *order_id) {
            result.push("orders", format!("Order with id {order_id} does not exist"));
        }
    }

    result
}

/// Validate an order against the User collection (`user` must resolve) and
/// the Food collection (every `products[].product` must resolve).
pub fn validate_order(candidate: &Order, users: &[User], foods: &[Food]) -> ValidationResult {
    let mut result = ValidationResult::default();

    if candidate.address.trim().is_empty() {
        result.push("address", "Address is required");
    }
    if candidate.total_amount < 0.0 {
        result.push("total_amount", "Total amount must be non-negative");
    }
    if candidate.user.is_empty() {
        result.push("user", "User id is required");
    } else if !users.iter().any(|u| u.id == candidate.user) {
        result.push("user", "User does not exist");
    }

    if candidate.products.is_empty() {
        result.push("products", "Products must be a non-empty list");
    }
    for item in &candidate.products {
        if item.product.is_empty() {
            result.push(
                "products.product",
                "Product id is required for each order line",
            );
        } else if !food_exists(foods, &item.product) {
            result.push(
                "products.product",
                format!("Product with id {} does not exist", item.product),
            );
        }
        if item.quantity < 1 {
            result.push("products.quantity", "Quantity must be at least 1");
        }
    }

    result
}

fn food_exists(foods: &[Food], id: &str) -> bool {
    foods.iter().any(|f| f.id == id)
}
