use chrono::{DateTime, Utc};

use super::errors::ProductError;
use super::value_objects::{NameField, Price, ProductId};

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name_th: String,
    pub name_en: Option<String>,
    pub name_mm: Option<String>,
    pub name_cn: Option<String>,
    pub price: Price,
    pub image_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn name(&self, field: NameField) -> Option<&str> {
        match field {
            NameField::Th => Some(self.name_th.as_str()),
            NameField::En => self.name_en.as_deref(),
            NameField::Mm => self.name_mm.as_deref(),
            NameField::Cn => self.name_cn.as_deref(),
        }
    }
}

/// Raw form input for the mutable fields of a product.
pub struct DetailsProps {
    pub name_th: String,
    pub name_en: Option<String>,
    pub name_mm: Option<String>,
    pub name_cn: Option<String>,
    pub price: String,
}

/// Validated mutable fields shared by the create and update flows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub name_th: String,
    pub name_en: Option<String>,
    pub name_mm: Option<String>,
    pub name_cn: Option<String>,
    pub price: Price,
}

impl ProductDetails {
    pub fn new(props: DetailsProps) -> Result<Self, ProductError> {
        if props.name_th.trim().is_empty() {
            return Err(ProductError::NameEmpty);
        }
        let price = Price::parse(&props.price)?;

        Ok(Self {
            name_th: props.name_th,
            name_en: non_blank(props.name_en),
            name_mm: non_blank(props.name_mm),
            name_cn: non_blank(props.name_cn),
            price,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A product about to be inserted. The store assigns id and `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub details: ProductDetails,
    pub image_url: String,
}

/// Partial update of an existing product. `image_url` is only rewritten
/// when a new image was uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPatch {
    pub details: ProductDetails,
    pub image_url: Option<String>,
}
