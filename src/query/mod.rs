//! Filter evaluation over a collection's records. A small closed set of
//! predicate variants, ANDed together; filtering is stable (original record
//! order is preserved, no re-sort).

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// One filter predicate. Field names use dotted paths into the serialized
/// record (e.g. `price.org`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Scalar equality on a field.
    Equals { field: &'static str, value: Value },
    /// The array-valued field intersects the candidate set.
    InSet {
        field: &'static str,
        values: Vec<String>,
    },
    /// Inclusive numeric bounds; either side may be open.
    Range {
        field: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Case-insensitive substring match, OR'd across the named text fields.
    Text {
        fields: &'static [&'static str],
        needle: String,
    },
}

impl Filter {
    fn matches(&self, record: &Value) -> bool {
        match self {
            Filter::Equals { field, value } => lookup(record, field) == Some(value),
            Filter::InSet { field, values } => match lookup(record, field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|item| values.iter().any(|v| v == item)),
                _ => false,
            },
            Filter::Range { field, min, max } => {
                let Some(n) = lookup(record, field).and_then(Value::as_f64) else {
                    return false;
                };
                if min.is_some_and(|lo| n < lo) {
                    return false;
                }
                if max.is_some_and(|hi| n > hi) {
                    return false;
                }
                true
            }
            Filter::Text { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    lookup(record, field)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
        }
    }
}

/// Evaluate all filters over the records, keeping the matches in their
/// original relative order. An empty filter list matches everything.
pub fn apply<T: Serialize + Clone>(records: &[T], filters: &[Filter]) -> Result<Vec<T>> {
    if filters.is_empty() {
        return Ok(records.to_vec());
    }

    let mut matched = Vec::new();
    for record in records {
        let value = serde_json::to_value(record)?;
        if filters.iter().all(|f| f.matches(&value)) {
            matched.push(record.clone());
        }
    }
    Ok(matched)
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, segment| v.get(segment))
}

/// Catalog listing criteria. Absent fields are no-ops.
#[derive(Debug, Clone, Default)]
pub struct FoodCriteria {
    pub categories: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
}

impl FoodCriteria {
    pub fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(categories) = &self.categories {
            filters.push(Filter::InSet {
                field: "category",
                values: categories.clone(),
            });
        }
        if let Some(ingredients) = &self.ingredients {
            filters.push(Filter::InSet {
                field: "ingredients",
                values: ingredients.clone(),
            });
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            filters.push(Filter::Range {
                field: "price.org",
                min: self.min_price,
                max: self.max_price,
            });
        }
        if let Some(search) = &self.search {
            filters.push(Filter::Text {
                fields: &["name", "desc"],
                needle: search.clone(),
            });
        }
        filters
    }
}

/// Order listing criteria. Absent fields are no-ops.
#[derive(Debug, Clone, Default)]
pub struct OrderCriteria {
    pub user: Option<String>,
    pub status: Option<String>,
}

impl OrderCriteria {
    pub fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(user) = &self.user {
            filters.push(Filter::Equals {
                field: "user",
                value: Value::String(user.clone()),
            });
        }
        if let Some(status) = &self.status {
            filters.push(Filter::Equals {
                field: "status",
                value: Value::String(status.clone()),
            });
        }
        filters
    }
}
