// Plain entity records - one struct per collection, no behavior beyond construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price breakdown for a catalog item. All components are non-negative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Price {
    pub org: f64,
    pub mrp: f64,
    pub off: f64,
}

/// A catalog item. Identity is immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub price: Price,
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a Food. Id and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodDraft {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
}

impl FoodDraft {
    pub(crate) fn into_food(self) -> Food {
        let now = Utc::now();
        Food {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            desc: self.desc,
            img: self.img,
            price: self.price.unwrap_or_default(),
            ingredients: self.ingredients,
            category: self.category,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial field-merge update for a Food. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodPatch {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub img: Option<String>,
    pub price: Option<Price>,
    pub ingredients: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
}

/// One product reference with a quantity. Used for both cart lines and
/// order lines; `product` is a weak reference into the Food collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: String,
    pub quantity: u32,
}

/// A registered user as stored on disk, including the password hash.
/// Never returned to callers directly; see [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub cart: Vec<LineItem>,
    #[serde(default)]
    pub favourites: Vec<String>,
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A user with the password hash stripped. The only user shape the store
/// hands back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub cart: Vec<LineItem>,
    #[serde(default)]
    pub favourites: Vec<String>,
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            img: user.img.clone(),
            cart: user.cart.clone(),
            favourites: user.favourites.clone(),
            orders: user.orders.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for registering a user. The plaintext password is hashed by the
/// store before anything touches disk.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub img: Option<String>,
}

/// A placed order. `status` is stored and compared but never computed here;
/// transitions are driven by external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user: String,
    pub products: Vec<LineItem>,
    pub total_amount: f64,
    pub address: String,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Canonical default status for a newly placed order.
pub const DEFAULT_ORDER_STATUS: &str = "pending";

/// Partial field-merge update for an Order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<String>,
    pub address: Option<String>,
    pub total_amount: Option<f64>,
}

/// A cart or favourites entry resolved to its full product record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product: Food,
    pub quantity: u32,
}
