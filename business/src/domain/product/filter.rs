use super::model::Product;
use super::value_objects::NameField;

/// Case-insensitive substring filter over the localized name fields.
///
/// Pure: never mutates the source list and keeps its relative order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    fields: Vec<NameField>,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            fields: vec![NameField::Th, NameField::En],
        }
    }
}

impl ProductFilter {
    pub fn new(fields: Vec<NameField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[NameField] {
        &self.fields
    }

    /// `needle` must already be lowercased.
    pub fn matches(&self, product: &Product, needle: &str) -> bool {
        self.fields.iter().any(|field| {
            product
                .name(*field)
                .is_some_and(|name| name.to_lowercase().contains(needle))
        })
    }

    /// The query is used as typed: it is lowercased but not trimmed.
    pub fn project(&self, products: &[Product], query: &str) -> Vec<Product> {
        if query.is_empty() {
            return products.to_vec();
        }
        let needle = query.to_lowercase();
        products
            .iter()
            .filter(|product| self.matches(product, &needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::value_objects::{Price, ProductId};
    use proptest::prelude::*;

    fn product(id: &str, name_th: &str, name_en: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name_th: name_th.to_string(),
            name_en: name_en.map(|n| n.to_string()),
            name_mm: None,
            name_cn: None,
            price: Price::new(10.0).unwrap(),
            image_url: format!("https://img/{id}"),
            created_at: None,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("a", "ส้มเขียวหวาน", Some("Tangerine")),
            product("b", "กล้วยหอม", Some("Banana")),
            product("c", "ส้มโอ", None),
            product("d", "มะม่วง", Some("Mango ORANGE")),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn should_return_everything_when_query_empty() {
        let products = catalog();
        assert_eq!(ProductFilter::default().project(&products, ""), products);
    }

    #[test]
    fn should_match_thai_substring() {
        let result = ProductFilter::default().project(&catalog(), "ส้ม");
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn should_match_english_name_case_insensitively() {
        let result = ProductFilter::default().project(&catalog(), "orAnge");
        assert_eq!(ids(&result), vec!["d"]);
    }

    #[test]
    fn should_ignore_fields_not_configured() {
        let filter = ProductFilter::new(vec![NameField::Th]);
        assert!(filter.project(&catalog(), "banana").is_empty());
    }

    #[test]
    fn should_not_trim_query() {
        let result = ProductFilter::default().project(&catalog(), " banana");
        assert!(result.is_empty());
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[a-cA-Cส้มกขé ]{0,6}").unwrap()
    }

    fn products_strategy() -> impl Strategy<Value = Vec<Product>> {
        proptest::collection::vec(
            (name_strategy(), proptest::option::of(name_strategy())),
            0..12,
        )
        .prop_map(|names| {
            names
                .into_iter()
                .enumerate()
                .map(|(i, (th, en))| product(&format!("p{i}"), &th, en.as_deref()))
                .collect()
        })
    }

    fn reference_match(product: &Product, query: &str) -> bool {
        let needle = query.to_lowercase();
        product.name_th.to_lowercase().contains(&needle)
            || product
                .name_en
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }

    proptest! {
        #[test]
        fn empty_query_is_identity(products in products_strategy()) {
            prop_assert_eq!(ProductFilter::default().project(&products, ""), products);
        }

        #[test]
        fn result_is_exactly_the_matching_products(
            products in products_strategy(),
            query in name_strategy(),
        ) {
            let result = ProductFilter::default().project(&products, &query);
            let expected: Vec<Product> = products
                .iter()
                .filter(|p| reference_match(p, &query))
                .cloned()
                .collect();
            prop_assert_eq!(result, expected);
        }

        #[test]
        fn filtering_twice_is_idempotent(
            products in products_strategy(),
            query in name_strategy(),
        ) {
            let filter = ProductFilter::default();
            let once = filter.project(&products, &query);
            let twice = filter.project(&once, &query);
            prop_assert_eq!(once, twice);
        }
    }
}
