//! Population - replacing stored id references with the full referenced
//! records from sibling collections. A lookup miss leaves the raw id value
//! in place; population never fails on a dangling weak reference.

use crate::error::Result;
use crate::model::{Food, Order, PublicUser, User};
use serde_json::Value;
use std::collections::HashMap;

/// The relation paths the resolver knows how to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `Order.user` -> User (password hash stripped).
    User,
    /// `Order.products[].product` -> Food.
    Products,
    /// `User.cart[].product` -> Food.
    Cart,
    /// `User.favourites[]` -> Food.
    Favourites,
    /// `User.orders[]` -> Order.
    Orders,
}

/// Sibling collection snapshots the resolver draws referenced records from.
pub struct Sources<'a> {
    pub foods: &'a [Food],
    pub users: &'a [User],
    pub orders: &'a [Order],
}

/// Resolve the named relations in `target`, which may be a single record or
/// an array of records (array in, array out, same order). Each element of a
/// list-valued relation resolves independently; ids that do not resolve are
/// left untouched.
pub fn populate(target: &mut Value, relations: &[Relation], sources: &Sources) -> Result<()> {
    let ctx = Context::build(relations, sources)?;
    match target {
        Value::Array(items) => {
            for item in items {
                ctx.populate_record(item);
            }
        }
        other => ctx.populate_record(other),
    }
    Ok(())
}

struct Context<'a> {
    relations: &'a [Relation],
    foods: HashMap<&'a str, Value>,
    users: HashMap<&'a str, Value>,
    orders: HashMap<&'a str, Value>,
}

impl<'a> Context<'a> {
    /// Serialize only the collections the requested relations actually need.
    fn build(relations: &'a [Relation], sources: &Sources<'a>) -> Result<Self> {
        let mut ctx = Context {
            relations,
            foods: HashMap::new(),
            users: HashMap::new(),
            orders: HashMap::new(),
        };

        let wants = |r: Relation| relations.contains(&r);

        if wants(Relation::Products) || wants(Relation::Cart) || wants(Relation::Favourites) {
            for food in sources.foods {
                ctx.foods
                    .insert(food.id.as_str(), serde_json::to_value(food)?);
            }
        }
        if wants(Relation::User) {
            for user in sources.users {
                // Resolved users never carry credential material
                let public = PublicUser::from(user);
                ctx.users
                    .insert(user.id.as_str(), serde_json::to_value(&public)?);
            }
        }
        if wants(Relation::Orders) {
            for order in sources.orders {
                ctx.orders
                    .insert(order.id.as_str(), serde_json::to_value(order)?);
            }
        }

        Ok(ctx)
    }

    fn populate_record(&self, record: &mut Value) {
        for relation in self.relations {
            match relation {
                Relation::User => replace_id(record, "user", &self.users),
                Relation::Products => replace_line_products(record, "products", &self.foods),
                Relation::Cart => replace_line_products(record, "cart", &self.foods),
                Relation::Favourites => replace_id_list(record, "favourites", &self.foods),
                Relation::Orders => replace_id_list(record, "orders", &self.orders),
            }
        }
    }
}

/// Swap a scalar id field for the referenced record, if it resolves.
fn replace_id(record: &mut Value, field: &str, index: &HashMap<&str, Value>) {
    if let Some(slot) = record.get_mut(field) {
        if let Some(resolved) = slot.as_str().and_then(|id| index.get(id)) {
            *slot = resolved.clone();
        }
    }
}

/// Swap each element of an id-list field for its referenced record.
fn replace_id_list(record: &mut Value, field: &str, index: &HashMap<&str, Value>) {
    if let Some(Value::Array(items)) = record.get_mut(field) {
        for slot in items {
            if let Some(resolved) = slot.as_str().and_then(|id| index.get(id)) {
                *slot = resolved.clone();
            }
        }
    }
}

/// Swap the `product` reference inside each `{product, quantity}` line.
fn replace_line_products(record: &mut Value, field: &str, index: &HashMap<&str, Value>) {
    if let Some(Value::Array(lines)) = record.get_mut(field) {
        for line in lines {
            replace_id(line, "product", index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FoodDraft, LineItem, Price, DEFAULT_ORDER_STATUS};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn test_food(id: &str, name: &str) -> Food {
        let mut food = FoodDraft {
            name: name.into(),
            desc: "tasty".into(),
            img: None,
            price: Some(Price {
                org: 5.0,
                mrp: 6.0,
                off: 10.0,
            }),
            ingredients: vec!["stuff".into()],
            category: vec![],
        }
        .into_food();
        food.id = id.to_string();
        food
    }

    fn test_user(id: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: "$2b$12$secret".into(),
            img: None,
            cart: vec![LineItem {
                product: "f1".into(),
                quantity: 2,
            }],
            favourites: vec!["f1".into(), "ghost".into()],
            orders: vec!["o1".into()],
            created_at: now,
            updated_at: now,
        }
    }

    fn test_order(id: &str, user: &str, product: &str) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            user: user.to_string(),
            products: vec![LineItem {
                product: product.to_string(),
                quantity: 2,
            }],
            total_amount: 10.0,
            address: "123 Main St".into(),
            status: DEFAULT_ORDER_STATUS.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_populate_order_user_and_products() {
        let foods = vec![test_food("f1", "Burger")];
        let users = vec![test_user("u1")];
        let order = test_order("o1", "u1", "f1");

        let mut value = serde_json::to_value(&order).unwrap();
        populate(
            &mut value,
            &[Relation::User, Relation::Products],
            &Sources {
                foods: &foods,
                users: &users,
                orders: &[],
            },
        )
        .unwrap();

        assert_eq!(value["user"]["email"], "a@x.com");
        assert_eq!(value["products"][0]["product"]["name"], "Burger");
        assert_eq!(value["products"][0]["quantity"], 2);
    }

    #[test]
    fn test_populated_user_has_no_password() {
        let users = vec![test_user("u1")];
        let order = test_order("o1", "u1", "f1");

        let mut value = serde_json::to_value(&order).unwrap();
        populate(
            &mut value,
            &[Relation::User],
            &Sources {
                foods: &[],
                users: &users,
                orders: &[],
            },
        )
        .unwrap();

        assert!(value["user"].is_object());
        assert!(value["user"].get("password").is_none());
    }

    #[test]
    fn test_lookup_miss_leaves_raw_id() {
        // Food deleted after order creation: the raw id stays in place
        let order = test_order("o1", "u1", "deleted-food");

        let mut value = serde_json::to_value(&order).unwrap();
        populate(
            &mut value,
            &[Relation::User, Relation::Products],
            &Sources {
                foods: &[],
                users: &[],
                orders: &[],
            },
        )
        .unwrap();

        assert_eq!(value["user"], "u1");
        assert_eq!(value["products"][0]["product"], "deleted-food");
    }

    #[test]
    fn test_list_relations_resolve_element_wise() {
        let foods = vec![test_food("f1", "Burger")];
        let orders = vec![test_order("o1", "u1", "f1")];
        let user = test_user("u1");

        let mut value = serde_json::to_value(PublicUser::from(&user)).unwrap();
        populate(
            &mut value,
            &[Relation::Favourites, Relation::Cart, Relation::Orders],
            &Sources {
                foods: &foods,
                users: &[],
                orders: &orders,
            },
        )
        .unwrap();

        // "f1" resolves, "ghost" stays raw
        assert_eq!(value["favourites"][0]["name"], "Burger");
        assert_eq!(value["favourites"][1], "ghost");
        assert_eq!(value["cart"][0]["product"]["name"], "Burger");
        assert_eq!(value["orders"][0]["address"], "123 Main St");
    }

    #[test]
    fn test_array_input_yields_array_output_in_order() {
        let users = vec![test_user("u1")];
        let orders = vec![
            test_order("o1", "u1", "f1"),
            test_order("o2", "ghost", "f1"),
        ];

        let mut value = serde_json::to_value(&orders).unwrap();
        populate(
            &mut value,
            &[Relation::User],
            &Sources {
                foods: &[],
                users: &users,
                orders: &[],
            },
        )
        .unwrap();

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "o1");
        assert_eq!(items[0]["user"]["id"], "u1");
        // Second order's user does not resolve, raw id retained
        assert_eq!(items[1]["user"], "ghost");
    }
}
