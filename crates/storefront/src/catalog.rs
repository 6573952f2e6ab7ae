//! Product listing pipeline: category filter, price sort, category tabs.
//!
//! Pure functions over in-memory collections fetched through the API
//! client. The synthetic "All" category is a client-side construct; the
//! server never returns it.

use mebius_core::CategoryId;

use crate::api::types::{Category, Product};

/// Id of the synthetic category representing "no filter".
pub const ALL_CATEGORY_ID: &str = "ALL";

/// Category selection for a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Pass every product through.
    #[default]
    All,
    /// Keep only products in this category.
    Category(CategoryId),
}

impl CategoryFilter {
    /// Build a filter from a selected category id, mapping the synthetic
    /// `"ALL"` id to [`CategoryFilter::All`].
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        if id == ALL_CATEGORY_ID {
            Self::All
        } else {
            Self::Category(CategoryId::new(id))
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Category(id) => product.category_id == *id,
        }
    }
}

/// Price sort directive for a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Preserve the input order ("Featured").
    #[default]
    Unsorted,
    PriceAscending,
    PriceDescending,
}

impl SortOrder {
    /// Parse the `"asc"` / `"desc"` query values; anything else (including
    /// absence) means unsorted.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("asc") => Self::PriceAscending,
            Some("desc") => Self::PriceDescending,
            _ => Self::Unsorted,
        }
    }
}

/// Produce the displayed product sequence: filter by category, then sort by
/// price.
///
/// `products` not yet loaded (`None`) yields an empty sequence. The sort is
/// stable: products with equal prices keep their relative input order, so
/// repeated renders of the same data are deterministic.
#[must_use]
pub fn filter_and_sort(
    products: Option<&[Product]>,
    filter: &CategoryFilter,
    sort: SortOrder,
) -> Vec<Product> {
    let Some(products) = products else {
        return Vec::new();
    };

    let mut displayed: Vec<Product> = products
        .iter()
        .filter(|product| filter.matches(product))
        .cloned()
        .collect();

    match sort {
        SortOrder::Unsorted => {}
        SortOrder::PriceAscending => displayed.sort_by_key(|product| product.price),
        SortOrder::PriceDescending => {
            displayed.sort_by(|a, b| b.price.cmp(&a.price));
        }
    }

    displayed
}

/// Build the category tab list: any server-provided `"ALL"` id is dropped,
/// then the synthetic "All" entry is prepended. Prepending is the single
/// canonical placement.
#[must_use]
pub fn with_all_category(categories: &[Category]) -> Vec<Category> {
    let mut tabs = Vec::with_capacity(categories.len() + 1);
    tabs.push(Category {
        id: CategoryId::new(ALL_CATEGORY_ID),
        name: "All".to_string(),
    });
    tabs.extend(
        categories
            .iter()
            .filter(|category| category.id.as_str() != ALL_CATEGORY_ID)
            .cloned(),
    );
    tabs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(id: &str, price: i64, category: &str) -> Product {
        serde_json::from_value(json!({
            "_id": id,
            "name": format!("Product {id}"),
            "price": price,
            "stock": 10,
            "categoryId": category,
        }))
        .unwrap()
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_all_filter_is_identity() {
        let products = vec![
            product("a", 30, "c1"),
            product("b", 10, "c2"),
            product("c", 20, "c1"),
        ];

        let displayed = filter_and_sort(Some(&products), &CategoryFilter::All, SortOrder::Unsorted);
        assert_eq!(displayed, products);
    }

    #[test]
    fn test_category_filter_keeps_only_matches() {
        let products = vec![
            product("a", 30, "c1"),
            product("b", 10, "c2"),
            product("c", 20, "c1"),
        ];

        let displayed = filter_and_sort(
            Some(&products),
            &CategoryFilter::from_id("c1"),
            SortOrder::Unsorted,
        );
        assert_eq!(ids(&displayed), ["a", "c"]);
        assert!(
            displayed
                .iter()
                .all(|p| p.category_id == CategoryId::new("c1"))
        );
    }

    #[test]
    fn test_all_filter_ignores_category_ids_present() {
        // "ALL" passes everything through regardless of which category ids
        // actually occur in the data.
        let products = vec![product("a", 30, "1")];
        let displayed = filter_and_sort(
            Some(&products),
            &CategoryFilter::from_id(ALL_CATEGORY_ID),
            SortOrder::Unsorted,
        );
        assert_eq!(displayed.len(), 1);
    }

    #[test]
    fn test_missing_products_is_empty_sequence() {
        let displayed = filter_and_sort(None, &CategoryFilter::All, SortOrder::PriceAscending);
        assert!(displayed.is_empty());
    }

    #[test]
    fn test_sort_ascending_non_decreasing() {
        let products = vec![
            product("a", 30, "c1"),
            product("b", 10, "c1"),
            product("c", 20, "c1"),
        ];

        let displayed =
            filter_and_sort(Some(&products), &CategoryFilter::All, SortOrder::PriceAscending);
        assert_eq!(ids(&displayed), ["b", "c", "a"]);
        assert!(displayed.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[test]
    fn test_sort_descending_non_increasing() {
        let products = vec![
            product("a", 30, "c1"),
            product("b", 10, "c1"),
            product("c", 20, "c1"),
        ];

        let displayed = filter_and_sort(
            Some(&products),
            &CategoryFilter::All,
            SortOrder::PriceDescending,
        );
        assert_eq!(ids(&displayed), ["a", "c", "b"]);
    }

    #[test]
    fn test_sort_is_stable_on_price_ties() {
        let products = vec![
            product("a", 10, "c1"),
            product("b", 10, "c1"),
            product("c", 5, "c1"),
            product("d", 10, "c1"),
        ];

        let displayed =
            filter_and_sort(Some(&products), &CategoryFilter::All, SortOrder::PriceAscending);
        assert_eq!(ids(&displayed), ["c", "a", "b", "d"]);
    }

    #[test]
    fn test_sort_idempotent_on_sorted_input() {
        let products = vec![
            product("a", 10, "c1"),
            product("b", 10, "c1"),
            product("c", 20, "c1"),
        ];

        let once =
            filter_and_sort(Some(&products), &CategoryFilter::All, SortOrder::PriceAscending);
        let twice = filter_and_sort(Some(&once), &CategoryFilter::All, SortOrder::PriceAscending);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unsorted_preserves_input_order() {
        let products = vec![
            product("a", 30, "c1"),
            product("b", 10, "c1"),
        ];
        let displayed = filter_and_sort(
            Some(&products),
            &CategoryFilter::All,
            SortOrder::from_param(None),
        );
        assert_eq!(ids(&displayed), ["a", "b"]);
    }

    #[test]
    fn test_with_all_category_prepends_synthetic_entry() {
        let categories = vec![Category {
            id: CategoryId::new("1"),
            name: "Phones".to_string(),
        }];

        let tabs = with_all_category(&categories);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].id.as_str(), ALL_CATEGORY_ID);
        assert_eq!(tabs[0].name, "All");
        assert_eq!(tabs[1].name, "Phones");
    }

    #[test]
    fn test_with_all_category_drops_server_all() {
        let categories = vec![
            Category {
                id: CategoryId::new(ALL_CATEGORY_ID),
                name: "Everything".to_string(),
            },
            Category {
                id: CategoryId::new("2"),
                name: "Audio".to_string(),
            },
        ];

        let tabs = with_all_category(&categories);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].name, "All");
        assert_eq!(tabs[1].name, "Audio");
    }

    #[test]
    fn test_sort_param_parsing() {
        assert_eq!(SortOrder::from_param(Some("asc")), SortOrder::PriceAscending);
        assert_eq!(SortOrder::from_param(Some("desc")), SortOrder::PriceDescending);
        assert_eq!(SortOrder::from_param(Some("price")), SortOrder::Unsorted);
        assert_eq!(SortOrder::from_param(None), SortOrder::Unsorted);
    }
}
