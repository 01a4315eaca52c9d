use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::Serialize;

use business::application::product::form::FormStatus;
use business::domain::product::model::Product;
use business::domain::product::value_objects::ImageFile;

pub const CURRENCY_SUFFIX: &str = " THB";

#[derive(Debug, Clone, Serialize, Object)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name_th: String,
    #[oai(skip_serializing_if_is_none)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_mm: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_cn: Option<String>,
    pub price: f64,
    /// Price formatted for display, e.g. "1,234.5 THB"
    pub price_display: String,
    pub image_url: String,
    #[oai(skip_serializing_if_is_none)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            price: product.price.amount(),
            price_display: format!("{}{}", product.price.display(), CURRENCY_SUFFIX),
            name_th: product.name_th,
            name_en: product.name_en,
            name_mm: product.name_mm,
            name_cn: product.name_cn,
            image_url: product.image_url,
            created_at: product.created_at,
        }
    }
}

/// Image picked in the form, base64-encoded.
#[derive(Debug, Clone, Object)]
pub struct ImageUploadRequest {
    /// Original file name; its extension is kept in storage
    pub file_name: String,
    /// MIME type, e.g. "image/jpeg"
    pub content_type: String,
    /// Base64 content, optionally as a `data:` URL
    pub data: String,
}

impl ImageUploadRequest {
    pub fn into_image(self) -> Result<ImageFile, &'static str> {
        let payload = match self.data.split_once("base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let clean: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(clean)
            .map_err(|_| "product.image_invalid_encoding")?;
        if bytes.is_empty() {
            return Err("product.image_missing");
        }
        Ok(ImageFile::new(self.file_name, self.content_type, bytes))
    }
}

#[derive(Debug, Clone, Object)]
pub struct CreateProductRequest {
    /// Thai name (required)
    pub name_th: String,
    #[oai(skip_serializing_if_is_none)]
    pub name_en: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    pub name_mm: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    pub name_cn: Option<String>,
    /// Price as typed in the form; must be a non-negative number
    pub price: String,
    /// Product image (required)
    #[oai(skip_serializing_if_is_none)]
    pub image: Option<ImageUploadRequest>,
}

#[derive(Debug, Clone, Object)]
pub struct UpdateProductRequest {
    pub name_th: String,
    #[oai(skip_serializing_if_is_none)]
    pub name_en: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    pub name_mm: Option<String>,
    #[oai(skip_serializing_if_is_none)]
    pub name_cn: Option<String>,
    pub price: String,
    /// Replacement image; the previous one is deleted once the record is updated
    #[oai(skip_serializing_if_is_none)]
    pub image: Option<ImageUploadRequest>,
}

#[derive(Debug, Clone, Object)]
pub struct CreatedProductResponse {
    pub id: String,
}

#[derive(Debug, Clone, Object)]
pub struct DeletedProductResponse {
    pub id: String,
    /// False when the image could not be removed and was left in storage
    pub image_removed: bool,
}

/// Frame pushed on the live catalog websocket.
#[derive(Debug, Clone, Serialize)]
pub struct LiveCatalogFrame {
    pub query: String,
    pub products: Vec<ProductResponse>,
}

/// Progress of the session owner's add/edit form, pushed on the live
/// catalog websocket whenever it changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStatusFrame {
    pub form_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&FormStatus> for FormStatusFrame {
    fn from(status: &FormStatus) -> Self {
        Self {
            form_status: status.code(),
            message: status.message().map(str::to_string),
        }
    }
}
