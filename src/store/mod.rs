use crate::collection::Collection;
use crate::error::{Result, StoreError};
use crate::model::{
    CartItem, Food, FoodDraft, FoodPatch, LineItem, NewUser, Order, OrderPatch, PublicUser, User,
    DEFAULT_ORDER_STATUS,
};
use crate::populate::{self, Relation, Sources};
use crate::query::{self, FoodCriteria, OrderCriteria};
use crate::validation;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The main entry point. Opens a data directory and exposes catalog, user,
/// cart, favourites, and order operations over three file-backed collections
/// (`foods.json`, `users.json`, `orders.json`), each created empty on first
/// access.
///
/// Every logical operation re-reads its collection, mutates a copy, validates,
/// and persists under that collection's write lock, so operations against the
/// same collection are linearized while different collections never block one
/// another. `Store` is `Send + Sync`; share one instance via `Arc`.
pub struct Store {
    root: PathBuf,
    foods: Collection<Food>,
    users: Collection<User>,
    orders: Collection<Order>,
}

impl Store {
    /// Open a store at the given data directory, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        Ok(Store {
            foods: Collection::new(&root, "foods.json"),
            users: Collection::new(&root, "users.json"),
            orders: Collection::new(&root, "orders.json"),
            root,
        })
    }

    /// The data directory this store was opened at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Catalog ─────────────────────────────────────────────────────

    pub fn create_food(&self, draft: FoodDraft) -> Result<Food> {
        let food = draft.into_food();
        validation::validate_food(&food).into_result()?;

        self.foods.update(|foods| {
            foods.push(food.clone());
            Ok(())
        })?;
        Ok(food)
    }

    /// Bulk create. All drafts are validated up front; either every food is
    /// persisted or none is.
    pub fn create_foods(&self, drafts: Vec<FoodDraft>) -> Result<Vec<Food>> {
        let created: Vec<Food> = drafts.into_iter().map(FoodDraft::into_food).collect();
        for food in &created {
            validation::validate_food(food).into_result()?;
        }

        self.foods.update(|foods| {
            foods.extend(created.iter().cloned());
            Ok(())
        })?;
        Ok(created)
    }

    pub fn list_foods(&self, criteria: &FoodCriteria) -> Result<Vec<Food>> {
        let foods = self.foods.load()?;
        query::apply(&foods, &criteria.filters())
    }

    pub fn get_food_by_id(&self, id: &str) -> Result<Food> {
        self.foods
            .load()?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::not_found("foods", id))
    }

    /// Field-merge update. Absent patch fields keep their current values.
    pub fn update_food(&self, id: &str, patch: FoodPatch) -> Result<Food> {
        self.foods.update(|foods| {
            let idx = foods
                .iter()
                .position(|f| f.id == id)
                .ok_or_else(|| StoreError::not_found("foods", id))?;

            let mut food = foods[idx].clone();
            if let Some(name) = patch.name {
                food.name = name;
            }
            if let Some(desc) = patch.desc {
                food.desc = desc;
            }
            if let Some(img) = patch.img {
                food.img = Some(img);
            }
            if let Some(price) = patch.price {
                food.price = price;
            }
            if let Some(ingredients) = patch.ingredients {
                food.ingredients = ingredients;
            }
            if let Some(category) = patch.category {
                food.category = category;
            }
            food.updated_at = Utc::now();

            validation::validate_food(&food).into_result()?;
            foods[idx] = food.clone();
            Ok(food)
        })
    }

    /// Delete a catalog item. Deliberately no cascade: carts, favourites, and
    /// historical orders keep their weak references, and reads apply the
    /// lookup-miss policy instead.
    pub fn delete_food(&self, id: &str) -> Result<Food> {
        self.foods.update(|foods| {
            let idx = foods
                .iter()
                .position(|f| f.id == id)
                .ok_or_else(|| StoreError::not_found("foods", id))?;
            Ok(foods.remove(idx))
        })
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Register a user. The plaintext password is bcrypt-hashed before the
    /// record is built; a duplicate email fails with `Conflict`.
    pub fn register_user(&self, new: NewUser) -> Result<PublicUser> {
        if new.password.is_empty() {
            return Err(StoreError::Validation(vec![crate::validation::FieldError {
                field: "password".into(),
                message: "Password is required".into(),
            }]));
        }
        let password_hash = bcrypt::hash(&new.password, bcrypt::DEFAULT_COST)?;

        let foods = self.foods.load()?;
        let orders = self.orders.load()?;
        self.users.update(move |users| {
            if users.iter().any(|u| u.email == new.email) {
                return Err(StoreError::Conflict(format!(
                    "Email {} is already in use",
                    new.email
                )));
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4().to_string(),
                name: new.name,
                email: new.email,
                password_hash,
                img: new.img,
                cart: Vec::new(),
                favourites: Vec::new(),
                orders: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            validation::validate_user(&user, users, &foods, &orders).into_result()?;

            let public = PublicUser::from(&user);
            users.push(user);
            Ok(public)
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<PublicUser>> {
        Ok(self
            .users
            .load()?
            .iter()
            .find(|u| u.email == email)
            .map(PublicUser::from))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<PublicUser> {
        self.users
            .load()?
            .iter()
            .find(|u| u.id == id)
            .map(PublicUser::from)
            .ok_or_else(|| StoreError::not_found("users", id))
    }

    /// Check credentials against the stored hash. Returns the sanitized user
    /// on a match, `None` for an unknown email or a wrong password.
    pub fn verify_password(&self, email: &str, password: &str) -> Result<Option<PublicUser>> {
        let users = self.users.load()?;
        let Some(user) = users.iter().find(|u| u.email == email) else {
            return Ok(None);
        };
        if bcrypt::verify(password, &user.password_hash)? {
            Ok(Some(PublicUser::from(user)))
        } else {
            Ok(None)
        }
    }

    pub fn delete_user(&self, id: &str) -> Result<PublicUser> {
        self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| StoreError::not_found("users", id))?;
            let removed = users.remove(idx);
            Ok(PublicUser::from(&removed))
        })
    }

    // ── Cart ────────────────────────────────────────────────────────

    /// Add `quantity` of a product to the user's cart, merging into an
    /// existing line if the product is already present. Unknown user fails
    /// `NotFound`; unknown product fails `Validation` and leaves the cart
    /// untouched.
    pub fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<PublicUser> {
        let quantity = quantity.max(1);
        let foods = self.foods.load()?;
        let orders = self.orders.load()?;

        self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == user_id)
                .ok_or_else(|| StoreError::not_found("users", user_id))?;

            let mut user = users[idx].clone();
            match user.cart.iter_mut().find(|line| line.product == product_id) {
                Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                None => user.cart.push(LineItem {
                    product: product_id.to_string(),
                    quantity,
                }),
            }
            user.updated_at = Utc::now();

            validation::validate_user(&user, users, &foods, &orders).into_result()?;

            let public = PublicUser::from(&user);
            users[idx] = user;
            Ok(public)
        })
    }

    /// Remove a product from the cart. A positive `quantity` is subtracted
    /// from the existing line and the line is dropped once it reaches zero;
    /// `None` drops the line unconditionally. Fails `NotFound` if the product
    /// is not currently in the cart.
    pub fn remove_from_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: Option<u32>,
    ) -> Result<PublicUser> {
        self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == user_id)
                .ok_or_else(|| StoreError::not_found("users", user_id))?;

            let user = &mut users[idx];
            let line_idx = user
                .cart
                .iter()
                .position(|line| line.product == product_id)
                .ok_or_else(|| StoreError::not_found("cart", product_id))?;

            match quantity {
                Some(q) if q > 0 => {
                    let line = &mut user.cart[line_idx];
                    if line.quantity > q {
                        line.quantity -= q;
                    } else {
                        user.cart.remove(line_idx);
                    }
                }
                _ => {
                    user.cart.remove(line_idx);
                }
            }
            user.updated_at = Utc::now();
            Ok(PublicUser::from(&*user))
        })
    }

    /// The user's cart with each line resolved to its full product record.
    /// Lines whose product no longer exists are omitted (same policy as
    /// [`Store::get_favorites`]).
    pub fn get_cart_items(&self, user_id: &str) -> Result<Vec<CartItem>> {
        let users = self.users.load()?;
        let user = users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("users", user_id))?;
        let foods = self.foods.load()?;

        let mut items = Vec::new();
        for line in &user.cart {
            match foods.iter().find(|f| f.id == line.product) {
                Some(food) => items.push(CartItem {
                    product: food.clone(),
                    quantity: line.quantity,
                }),
                None => log::warn!(
                    "cart line for user {user_id} references missing food {}, omitted",
                    line.product
                ),
            }
        }
        Ok(items)
    }

    // ── Favourites ──────────────────────────────────────────────────

    /// Set-semantics insert: adding a product that is already a favourite is
    /// a no-op, not an error.
    pub fn add_to_favorites(&self, user_id: &str, product_id: &str) -> Result<PublicUser> {
        let foods = self.foods.load()?;
        let orders = self.orders.load()?;

        self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == user_id)
                .ok_or_else(|| StoreError::not_found("users", user_id))?;

            let mut user = users[idx].clone();
            if !user.favourites.iter().any(|id| id == product_id) {
                user.favourites.push(product_id.to_string());
                user.updated_at = Utc::now();
                validation::validate_user(&user, users, &foods, &orders).into_result()?;
            }

            let public = PublicUser::from(&user);
            users[idx] = user;
            Ok(public)
        })
    }

    pub fn remove_from_favorites(&self, user_id: &str, product_id: &str) -> Result<PublicUser> {
        self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == user_id)
                .ok_or_else(|| StoreError::not_found("users", user_id))?;

            let user = &mut users[idx];
            user.favourites.retain(|id| id != product_id);
            user.updated_at = Utc::now();
            Ok(PublicUser::from(&*user))
        })
    }

    /// The user's favourites resolved to full product records. Ids that no
    /// longer resolve are omitted.
    pub fn get_favorites(&self, user_id: &str) -> Result<Vec<Food>> {
        let users = self.users.load()?;
        let user = users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::not_found("users", user_id))?;
        let foods = self.foods.load()?;

        let mut favourites = Vec::new();
        for food_id in &user.favourites {
            match foods.iter().find(|f| f.id == *food_id) {
                Some(food) => favourites.push(food.clone()),
                None => log::warn!(
                    "favourite for user {user_id} references missing food {food_id}, omitted"
                ),
            }
        }
        Ok(favourites)
    }

    // ── Orders ──────────────────────────────────────────────────────

    /// Place an order for the user, then record the order id on the user and
    /// clear the cart. The two writes hit different collections and are not
    /// atomic together: if the user update fails after the order committed,
    /// this fails with `PartialFailure` naming the committed order id so the
    /// caller can compensate.
    pub fn place_order(
        &self,
        user_id: &str,
        mut products: Vec<LineItem>,
        address: &str,
        total_amount: f64,
    ) -> Result<Order> {
        let foods = self.foods.load()?;
        let users = self.users.load()?;
        if !users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::not_found("users", user_id));
        }

        validation::prepare_line_items(&mut products);
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            products,
            total_amount,
            address: address.to_string(),
            status: DEFAULT_ORDER_STATUS.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.orders.update(|orders| {
            validation::validate_order(&order, &users, &foods).into_result()?;
            orders.push(order.clone());
            Ok(())
        })?;

        self.settle_placed_order(user_id, order)
    }

    /// Second half of `place_order`: record the order id on the user and
    /// clear the cart. The order is already committed when this runs, so any
    /// failure here surfaces as `PartialFailure` naming the committed id.
    fn settle_placed_order(&self, user_id: &str, order: Order) -> Result<Order> {
        let finish = self.users.update(|users| {
            let idx = users
                .iter()
                .position(|u| u.id == user_id)
                .ok_or_else(|| StoreError::not_found("users", user_id))?;
            let user = &mut users[idx];
            user.orders.push(order.id.clone());
            user.cart.clear();
            user.updated_at = Utc::now();
            Ok(())
        });

        if let Err(source) = finish {
            log::warn!(
                "place_order: order {} committed but the user update failed: {source}",
                order.id
            );
            return Err(StoreError::PartialFailure {
                operation: "place_order",
                committed: order.id.clone(),
                source: Box::new(source),
            });
        }
        Ok(order)
    }

    pub fn get_order_by_id(&self, id: &str) -> Result<Order> {
        self.orders
            .load()?
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::not_found("orders", id))
    }

    pub fn find_orders(&self, criteria: &OrderCriteria) -> Result<Vec<Order>> {
        let orders = self.orders.load()?;
        query::apply(&orders, &criteria.filters())
    }

    pub fn get_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>> {
        self.find_orders(&OrderCriteria {
            user: Some(user_id.to_string()),
            status: None,
        })
    }

    /// Field-merge update. Status transitions are driven by external
    /// collaborators; the value is stored, never computed here.
    pub fn update_order(&self, id: &str, patch: OrderPatch) -> Result<Order> {
        let foods = self.foods.load()?;
        let users = self.users.load()?;

        self.orders.update(|orders| {
            let idx = orders
                .iter()
                .position(|o| o.id == id)
                .ok_or_else(|| StoreError::not_found("orders", id))?;

            let mut order = orders[idx].clone();
            if let Some(status) = patch.status {
                order.status = status;
            }
            if let Some(address) = patch.address {
                order.address = address;
            }
            if let Some(total_amount) = patch.total_amount {
                order.total_amount = total_amount;
            }
            order.updated_at = Utc::now();

            validation::validate_order(&order, &users, &foods).into_result()?;
            orders[idx] = order.clone();
            Ok(order)
        })
    }

    pub fn delete_order(&self, id: &str) -> Result<Order> {
        self.orders.update(|orders| {
            let idx = orders
                .iter()
                .position(|o| o.id == id)
                .ok_or_else(|| StoreError::not_found("orders", id))?;
            Ok(orders.remove(idx))
        })
    }

    // ── Population ──────────────────────────────────────────────────

    /// Resolve the named relations on one order, returning plain data.
    pub fn populate_order(
        &self,
        order: &Order,
        relations: &[Relation],
    ) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(order)?;
        self.populate_value(&mut value, relations)?;
        Ok(value)
    }

    /// Resolve the named relations across a sequence of orders, preserving
    /// order.
    pub fn populate_orders(
        &self,
        orders: &[Order],
        relations: &[Relation],
    ) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(orders)?;
        self.populate_value(&mut value, relations)?;
        Ok(value)
    }

    /// Resolve the named relations on a user, starting from the sanitized
    /// (password-stripped) record.
    pub fn populate_user(
        &self,
        user_id: &str,
        relations: &[Relation],
    ) -> Result<serde_json::Value> {
        let public = self.get_user_by_id(user_id)?;
        let mut value = serde_json::to_value(&public)?;
        self.populate_value(&mut value, relations)?;
        Ok(value)
    }

    fn populate_value(&self, value: &mut serde_json::Value, relations: &[Relation]) -> Result<()> {
        let foods = self.foods.load()?;
        let users = self.users.load()?;
        let orders = self.orders.load()?;
        populate::populate(
            value,
            relations,
            &Sources {
                foods: &foods,
                users: &users,
                orders: &orders,
            },
        )
    }
}
