use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};

use business::application::product::debounce::DEFAULT_DEBOUNCE_WINDOW;
use business::domain::product::value_objects::NameField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    Firebase,
    Memory,
}

impl FromStr for CatalogBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(CatalogBackend::Firebase),
            "memory" => Ok(CatalogBackend::Memory),
            other => Err(anyhow!(
                "CATALOG_BACKEND must be \"firebase\" or \"memory\", got \"{other}\""
            )),
        }
    }
}

/// Catalog behavior settings.
///
/// Environment variables:
/// - CATALOG_BACKEND: "firebase" | "memory" (default: "firebase")
/// - CATALOG_FILTER_DEBOUNCE_MS: search quiescence window (default: 500)
/// - CATALOG_FILTER_FIELDS: name fields searched, subset of th,en,mm,cn (default: "th,en")
/// - CATALOG_RESUBSCRIBE_DELAY_MS: delay before reopening a dropped feed, 0 disables (default: 2000)
/// - CATALOG_MAX_IMAGE_BYTES: largest accepted image (default: 1048576)
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub filter_debounce: Duration,
    pub filter_fields: Vec<NameField>,
    pub resubscribe_delay: Option<Duration>,
    pub max_image_bytes: usize,
}

fn parse_number<T: FromStr>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow!("{key} is not a valid number: {value}")),
        None => Ok(default),
    }
}

impl CatalogConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = match var("CATALOG_BACKEND") {
            Some(raw) => raw.parse()?,
            None => CatalogBackend::Firebase,
        };

        let debounce_ms = parse_number(
            "CATALOG_FILTER_DEBOUNCE_MS",
            var("CATALOG_FILTER_DEBOUNCE_MS"),
            DEFAULT_DEBOUNCE_WINDOW.as_millis() as u64,
        )?;
        let resubscribe_ms =
            parse_number("CATALOG_RESUBSCRIBE_DELAY_MS", var("CATALOG_RESUBSCRIBE_DELAY_MS"), 2000u64)?;
        let max_image_bytes =
            parse_number("CATALOG_MAX_IMAGE_BYTES", var("CATALOG_MAX_IMAGE_BYTES"), 1024 * 1024usize)?;

        let filter_fields = match var("CATALOG_FILTER_FIELDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field
                        .parse::<NameField>()
                        .map_err(|err| anyhow!(err))
                        .context("CATALOG_FILTER_FIELDS")
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => vec![NameField::Th, NameField::En],
        };
        if filter_fields.is_empty() {
            return Err(anyhow!("CATALOG_FILTER_FIELDS must name at least one field"));
        }

        Ok(Self {
            backend,
            filter_debounce: Duration::from_millis(debounce_ms),
            filter_fields,
            resubscribe_delay: (resubscribe_ms > 0).then(|| Duration::from_millis(resubscribe_ms)),
            max_image_bytes,
        })
    }
}
