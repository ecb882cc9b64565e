pub mod collection;
pub mod error;
pub mod model;
pub mod populate;
pub mod query;
pub mod store;
pub mod validation;

pub use error::{Result, StoreError};
pub use model::{
    CartItem, Food, FoodDraft, FoodPatch, LineItem, NewUser, Order, OrderPatch, Price, PublicUser,
    User, DEFAULT_ORDER_STATUS,
};
pub use populate::Relation;
pub use query::{Filter, FoodCriteria, OrderCriteria};
pub use store::Store;
