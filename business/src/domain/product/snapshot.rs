use std::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::ProductError;
use super::model::{Product, ProductDetails, ProductDraft, ProductPatch};
use super::value_objects::{NameField, Price, ProductId};

/// Full point-in-time copy of the `products` collection as delivered by the
/// store. `None` means the collection does not exist (no products).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(Option<Value>);

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot.not_a_collection")]
    NotACollection,
}

/// A record that could not be decoded into a [`Product`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Materialized {
    pub products: Vec<Product>,
    pub rejected: Vec<RejectedRecord>,
}

impl Snapshot {
    pub fn new(value: Option<Value>) -> Self {
        Self(value.filter(|v| !v.is_null()))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    /// Turns the key → record mapping into an ordered product list.
    ///
    /// Records are decoded one by one; a malformed record is reported in
    /// `rejected` without hiding the others. Arrays are what the store returns
    /// for integer-like keys, so they are read with the index as key. Object
    /// keys follow the store's ordering: integer keys first in numeric order,
    /// then the rest lexicographically.
    pub fn materialize(&self) -> Result<Materialized, SnapshotError> {
        let mut out = Materialized::default();
        let mut push = |key: String, value: &Value| {
            if value.is_null() {
                return;
            }
            match decode_product(&key, value) {
                Ok(product) => out.products.push(product),
                Err(ProductError::Decode { key, reason }) => {
                    out.rejected.push(RejectedRecord { key, reason })
                }
                Err(other) => out.rejected.push(RejectedRecord {
                    key,
                    reason: other.to_string(),
                }),
            }
        };

        match &self.0 {
            None => {}
            Some(Value::Object(map)) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
                for (key, value) in entries {
                    push(key.clone(), value);
                }
            }
            Some(Value::Array(items)) => {
                for (index, value) in items.iter().enumerate() {
                    push(index.to_string(), value);
                }
            }
            Some(_) => return Err(SnapshotError::NotACollection),
        }

        Ok(out)
    }
}

fn integer_key(key: &str) -> Option<i32> {
    key.parse::<i32>().ok().filter(|n| n.to_string() == key)
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProductRecord {
    name_th: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name_mm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name_cn: Option<String>,
    price: f64,
    #[serde(rename = "imageUrl")]
    image_url: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<f64>,
}

impl ProductRecord {
    fn from_details(details: &ProductDetails, image_url: String) -> Self {
        Self {
            name_th: details.name_th.clone(),
            name_en: details.name_en.clone(),
            name_mm: details.name_mm.clone(),
            name_cn: details.name_cn.clone(),
            price: details.price.amount(),
            image_url,
            created_at: None,
        }
    }
}

/// Decodes one stored record, attaching `key` as the product id.
pub fn decode_product(key: &str, value: &Value) -> Result<Product, ProductError> {
    let decode_error = |reason: String| ProductError::Decode {
        key: key.to_string(),
        reason,
    };

    let record = ProductRecord::deserialize(value).map_err(|e| decode_error(e.to_string()))?;
    let price =
        Price::new(record.price).map_err(|_| decode_error("invalid price".to_string()))?;
    let created_at = record
        .created_at
        .and_then(|millis| DateTime::from_timestamp_millis(millis as i64));

    Ok(Product {
        id: ProductId::new(key),
        name_th: record.name_th,
        name_en: record.name_en,
        name_mm: record.name_mm,
        name_cn: record.name_cn,
        price,
        image_url: record.image_url,
        created_at,
    })
}

/// Record body for a new product, without `createdAt` (set by the store).
pub fn encode_draft(draft: &ProductDraft) -> Value {
    let record = ProductRecord::from_details(&draft.details, draft.image_url.clone());
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Fields to merge into an existing record.
pub fn encode_patch(patch: &ProductPatch) -> Value {
    let details = &patch.details;
    let mut fields = Map::new();
    fields.insert(
        NameField::Th.record_key().to_string(),
        Value::from(details.name_th.clone()),
    );
    for (field, name) in [
        (NameField::En, &details.name_en),
        (NameField::Mm, &details.name_mm),
        (NameField::Cn, &details.name_cn),
    ] {
        if let Some(name) = name {
            fields.insert(field.record_key().to_string(), Value::from(name.clone()));
        }
    }
    fields.insert("price".to_string(), Value::from(details.price.amount()));
    if let Some(url) = &patch.image_url {
        fields.insert("imageUrl".to_string(), Value::from(url.clone()));
    }
    Value::Object(fields)
}
