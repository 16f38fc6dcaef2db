//! Client-side browsing of the product list: filter, sort, paginate.
//!
//! Everything here is pure. Callers fetch the full list once and re-run
//! [`browse`] whenever the shopper changes a filter, the sort or the page.

use crate::types::Product;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ALL_CATEGORIES: &str = "All";
pub const DEFAULT_PAGE_SIZE: usize = 9;
pub const DEFAULT_PRICE_CEILING: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    BestRating,
    PriceLowToHigh,
    PriceHighToLow,
    Newest,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::BestRating,
        SortKey::PriceLowToHigh,
        SortKey::PriceHighToLow,
        SortKey::Newest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::BestRating => "Best Rating",
            Self::PriceLowToHigh => "Price: Low to High",
            Self::PriceHighToLow => "Price: High to Low",
            Self::Newest => "Newest Arrivals",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::BestRating => b.ratings.unwrap_or(0.0).total_cmp(&a.ratings.unwrap_or(0.0)),
            Self::PriceLowToHigh => a.effective_price().total_cmp(&b.effective_price()),
            Self::PriceHighToLow => b.effective_price().total_cmp(&a.effective_price()),
            // `None < Some`, so undated products sink to the end.
            Self::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort {0:?}; expected one of: Best Rating, Price: Low to High, Price: High to Low, Newest Arrivals")]
pub struct ParseSortKeyError(pub String);

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(key) = Self::ALL
            .into_iter()
            .find(|key| key.label().to_ascii_lowercase() == normalized)
        {
            return Ok(key);
        }
        match normalized.as_str() {
            "rating" | "best" => Ok(Self::BestRating),
            "price-asc" | "price" => Ok(Self::PriceLowToHigh),
            "price-desc" => Ok(Self::PriceHighToLow),
            "newest" | "new" => Ok(Self::Newest),
            _ => Err(ParseSortKeyError(s.to_string())),
        }
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFilter {
    /// Exact category name, or [`ALL_CATEGORIES`].
    pub category: String,
    pub price: Option<PriceRange>,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            price: None,
        }
    }
}

impl CatalogFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if self.category != ALL_CATEGORIES && product.category != self.category {
            return false;
        }
        self.price
            .map_or(true, |range| range.contains(product.effective_price()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub filter: CatalogFilter,
    pub sort: SortKey,
    /// 1-based; clamped into range by [`browse`].
    pub page: usize,
    pub page_size: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            filter: CatalogFilter::default(),
            sort: SortKey::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Product>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1)).max(1)
}

pub fn browse(products: &[Product], query: &CatalogQuery) -> CatalogPage {
    let mut matching: Vec<&Product> = products.iter().filter(|p| query.filter.matches(p)).collect();
    // Stable, so equal keys keep the backend's order.
    matching.sort_by(|a, b| query.sort.compare(a, b));

    let page_size = query.page_size.max(1);
    let total_items = matching.len();
    let total_pages = total_pages(total_items, page_size);
    let page = query.page.clamp(1, total_pages);

    let items = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    CatalogPage {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Upper bound for the price slider: the highest base price rounded up to
/// the next hundred.
pub fn price_ceiling(products: &[Product]) -> f64 {
    let highest = products.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    let ceiling = (highest / 100.0).ceil() * 100.0;
    if ceiling.is_finite() && ceiling > 0.0 {
        ceiling
    } else {
        DEFAULT_PRICE_CEILING
    }
}
