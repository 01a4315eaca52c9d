use serde::{Deserialize, Serialize};

use super::errors::ProductError;

const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];
const MAX_KEY_BYTES: usize = 768;

/// Key of a product node in the remote store.
///
/// Assigned by the store on creation. Keys coming from clients are validated
/// against the store's key rules before they are used to build a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn parse(id: &str) -> Result<Self, ProductError> {
        let valid = !id.is_empty()
            && id.len() <= MAX_KEY_BYTES
            && !id
                .chars()
                .any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_control());
        if !valid {
            return Err(ProductError::InvalidId);
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Non-negative, finite amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Price(f64);

impl Price {
    pub fn new(amount: f64) -> Result<Self, ProductError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ProductError::PriceInvalid);
        }
        Ok(Self(amount))
    }

    /// Parses the raw text of a price input field.
    pub fn parse(input: &str) -> Result<Self, ProductError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProductError::PriceEmpty);
        }
        let amount = trimmed
            .parse::<f64>()
            .map_err(|_| ProductError::PriceInvalid)?;
        Self::new(amount)
    }

    pub fn amount(&self) -> f64 {
        self.0
    }

    /// Grouped representation, e.g. `1,234.5`. At most three fraction digits.
    pub fn display(&self) -> String {
        let fixed = format!("{:.3}", self.0);
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
        let frac = frac_part.trim_end_matches('0');

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if frac.is_empty() {
            grouped
        } else {
            format!("{grouped}.{frac}")
        }
    }
}

/// Localized name fields a product can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameField {
    Th,
    En,
    Mm,
    Cn,
}

impl NameField {
    /// Field name in the stored record.
    pub fn record_key(&self) -> &'static str {
        match self {
            NameField::Th => "name_th",
            NameField::En => "name_en",
            NameField::Mm => "name_mm",
            NameField::Cn => "name_cn",
        }
    }
}

impl std::fmt::Display for NameField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameField::Th => write!(f, "th"),
            NameField::En => write!(f, "en"),
            NameField::Mm => write!(f, "mm"),
            NameField::Cn => write!(f, "cn"),
        }
    }
}

impl std::str::FromStr for NameField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "th" => Ok(NameField::Th),
            "en" => Ok(NameField::En),
            "mm" => Ok(NameField::Mm),
            "cn" => Ok(NameField::Cn),
            _ => Err(format!("Invalid name field: {}", s)),
        }
    }
}

/// An image picked by the user, before compression and upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Lowercased extension of the original file name, if it has a usable one.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
