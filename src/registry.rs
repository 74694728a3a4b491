// 🎁 Gift Registry - Items, derived status and filtering
//
// "Status is DERIVED (never stored), purchase flags are the FACTS"
//
// - RegistryItem: one entry a guest may claim or contribute to
// - RegistryItemStatus: recomputed on every read from (purchased, is_group_gift)
// - RegistryQuery: category set + inclusive price range, applied in one pass

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// REGISTRY ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryItem {
    /// Stable identity (UUID)
    #[serde(default = "default_id")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Free-text label (e.g., "Kitchen", "Bedroom", "Honeymoon Fund")
    pub category: String,

    /// Price in dollars
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Where a guest can buy the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,

    /// Multiple guests may fund this item together
    #[serde(default)]
    pub is_group_gift: bool,

    /// Fully claimed (single gift) or fully funded (group gift)
    #[serde(default)]
    pub purchased: bool,

    #[serde(default)]
    pub amount_contributed: f64,

    /// Purchaser or contributor names, in the order they arrived
    #[serde(default)]
    pub contributors: Vec<String>,
}

fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl RegistryItem {
    /// Create a single-purchase item with a fresh UUID
    pub fn new(name: &str, category: &str, price: f64) -> Self {
        RegistryItem {
            id: default_id(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            price,
            image_url: None,
            purchase_url: None,
            is_group_gift: false,
            purchased: false,
            amount_contributed: 0.0,
            contributors: Vec::new(),
        }
    }

    /// Create an item that several guests can fund together
    pub fn group_gift(name: &str, category: &str, price: f64) -> Self {
        let mut item = Self::new(name, category, price);
        item.is_group_gift = true;
        item
    }

    /// Display status, derived from `purchased` and `is_group_gift` only
    pub fn status(&self) -> RegistryItemStatus {
        status_of(self.purchased, self.is_group_gift)
    }

    /// Fraction funded in [0, 1]. Single gifts report 0 or 1. A group gift
    /// with a zero (or non-finite) price reports 0 until it is purchased.
    pub fn funding_progress(&self) -> f64 {
        if !self.is_group_gift {
            return if self.purchased { 1.0 } else { 0.0 };
        }
        if self.price <= 0.0 || !self.price.is_finite() {
            return if self.purchased { 1.0 } else { 0.0 };
        }
        (self.amount_contributed / self.price).clamp(0.0, 1.0)
    }

    /// Amount still needed before a group gift is fully funded
    pub fn remaining_amount(&self) -> f64 {
        (self.price - self.amount_contributed).max(0.0)
    }

    /// Check that an admin-entered item is well-formed
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidItem("name is required".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(RegistryError::InvalidItem(
                "category is required".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(RegistryError::InvalidItem(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }

    /// Mark a single-purchase item as claimed by `purchaser`
    pub fn claim(&mut self, purchaser: &str) -> Result<(), RegistryError> {
        let purchaser = purchaser.trim();
        if purchaser.is_empty() {
            return Err(RegistryError::MissingName);
        }
        if self.is_group_gift {
            return Err(RegistryError::GroupGift(self.id.clone()));
        }
        if self.purchased {
            return Err(RegistryError::AlreadyPurchased(self.id.clone()));
        }

        self.purchased = true;
        self.contributors.push(purchaser.to_string());
        Ok(())
    }

    /// Add a contribution toward a group gift.
    ///
    /// The item flips to `purchased` once contributions reach its price.
    /// Returns true when this contribution completed the funding.
    pub fn contribute(&mut self, contributor: &str, amount: f64) -> Result<bool, RegistryError> {
        let contributor = contributor.trim();
        if contributor.is_empty() {
            return Err(RegistryError::MissingName);
        }
        if !self.is_group_gift {
            return Err(RegistryError::NotGroupGift(self.id.clone()));
        }
        if self.purchased {
            return Err(RegistryError::AlreadyPurchased(self.id.clone()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RegistryError::InvalidAmount(amount));
        }

        self.amount_contributed += amount;
        self.contributors.push(contributor.to_string());

        if self.amount_contributed >= self.price {
            self.purchased = true;
        }
        Ok(self.purchased)
    }

    /// Any claim or contribution has been recorded
    pub fn has_activity(&self) -> bool {
        self.purchased || self.amount_contributed > 0.0 || !self.contributors.is_empty()
    }

    /// Apply an admin edit of the descriptive fields.
    ///
    /// Switching between single and group gift is refused once anyone has
    /// claimed or contributed. A group gift whose contributions already cover
    /// the new price becomes fully funded. Nothing changes on error.
    pub fn apply_edit(&mut self, edit: ItemEdit) -> Result<(), RegistryError> {
        if edit.is_group_gift != self.is_group_gift && self.has_activity() {
            return Err(RegistryError::HasContributions(self.id.clone()));
        }

        let mut edited = RegistryItem {
            name: edit.name,
            description: edit.description,
            category: edit.category,
            price: edit.price,
            image_url: edit.image_url,
            purchase_url: edit.purchase_url,
            is_group_gift: edit.is_group_gift,
            ..self.clone()
        };
        edited.validate()?;

        if edited.is_group_gift
            && !edited.purchased
            && edited.amount_contributed > 0.0
            && edited.amount_contributed >= edited.price
        {
            edited.purchased = true;
        }

        *self = edited;
        Ok(())
    }

    /// Return the item to its untouched state (admin only)
    pub fn reset(&mut self) {
        self.purchased = false;
        self.amount_contributed = 0.0;
        self.contributors.clear();
    }
}

/// Fields an admin may change on an existing item. Purchase state is not one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEdit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default)]
    pub is_group_gift: bool,
}

// ============================================================================
// STATUS CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistryItemStatus {
    /// Not purchased yet (includes partially funded group gifts)
    Available,

    /// Single gift bought by one guest
    Claimed,

    /// Group gift whose contributions reached the price
    FullyFunded,
}

impl RegistryItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryItemStatus::Available => "available",
            RegistryItemStatus::Claimed => "claimed",
            RegistryItemStatus::FullyFunded => "fullyFunded",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegistryItemStatus::Available => "Available",
            RegistryItemStatus::Claimed => "Claimed",
            RegistryItemStatus::FullyFunded => "Fully Funded",
        }
    }
}

/// First match wins: not purchased → available, group gift → fully funded,
/// otherwise claimed.
pub fn status_of(purchased: bool, is_group_gift: bool) -> RegistryItemStatus {
    if !purchased {
        RegistryItemStatus::Available
    } else if is_group_gift {
        RegistryItemStatus::FullyFunded
    } else {
        RegistryItemStatus::Claimed
    }
}

// ============================================================================
// FILTER QUERY
// ============================================================================

/// Set of category labels, kept verbatim. Empty means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter(BTreeSet<String>);

impl CategoryFilter {
    pub fn new() -> Self {
        CategoryFilter(BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Case-sensitive exact match; an empty filter matches everything
    pub fn matches(&self, category: &str) -> bool {
        self.0.is_empty() || self.0.contains(category)
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        CategoryFilter(iter.into_iter().map(Into::into).collect())
    }
}

/// Inclusive `[min, max]`. `min <= max` is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        PriceRange { min, max }
    }

    /// `[0, +inf]`: every non-negative price passes
    pub fn any() -> Self {
        PriceRange::new(0.0, f64::INFINITY)
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::any()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryQuery {
    pub categories: CategoryFilter,
    pub price_range: PriceRange,
}

impl RegistryQuery {
    pub fn new(categories: CategoryFilter, price_range: PriceRange) -> Self {
        RegistryQuery {
            categories,
            price_range,
        }
    }

    pub fn matches(&self, item: &RegistryItem) -> bool {
        self.categories.matches(&item.category) && self.price_range.contains(item.price)
    }

    pub fn apply(&self, items: &[RegistryItem]) -> Vec<RegistryItem> {
        filter_items(items, &self.categories, self.price_range)
    }
}

/// Keep items whose category is in `categories` (or any, when empty) and whose
/// price lies in `range`. Input order is preserved; `items` is not touched.
pub fn filter_items(
    items: &[RegistryItem],
    categories: &CategoryFilter,
    range: PriceRange,
) -> Vec<RegistryItem> {
    items
        .iter()
        .filter(|item| categories.matches(&item.category) && range.contains(item.price))
        .cloned()
        .collect()
}

// ============================================================================
// DERIVED VIEWS (filter controls)
// ============================================================================

/// Sorted, distinct category labels for the checkbox list
pub fn categories(items: &[RegistryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lowest and highest finite price, for the slider defaults
pub fn price_bounds(items: &[RegistryItem]) -> Option<PriceRange> {
    items
        .iter()
        .map(|item| item.price)
        .filter(|price| price.is_finite())
        .fold(None, |acc: Option<PriceRange>, price| match acc {
            None => Some(PriceRange::new(price, price)),
            Some(range) => Some(PriceRange::new(range.min.min(price), range.max.max(price))),
        })
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    NotFound(String),
    AlreadyPurchased(String),
    /// Group gifts are funded through contributions, not claimed
    GroupGift(String),
    NotGroupGift(String),
    InvalidAmount(f64),
    MissingName,
    InvalidItem(String),
    /// Gift type can't change once claims or contributions exist
    HasContributions(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotFound(id) => write!(f, "registry item not found: {}", id),
            RegistryError::AlreadyPurchased(id) => {
                write!(f, "registry item {} has already been purchased", id)
            }
            RegistryError::GroupGift(id) => {
                write!(f, "registry item {} is a group gift; contribute instead", id)
            }
            RegistryError::NotGroupGift(id) => {
                write!(f, "registry item {} is not a group gift", id)
            }
            RegistryError::InvalidAmount(amount) => {
                write!(f, "contribution must be a positive amount, got {}", amount)
            }
            RegistryError::MissingName => write!(f, "a name is required"),
            RegistryError::InvalidItem(msg) => write!(f, "invalid registry item: {}", msg),
            RegistryError::HasContributions(id) => write!(
                f,
                "registry item {} already has a purchase or contributions; reset it before changing the gift type",
                id
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

// ============================================================================
// TESTS
// ============================================================================
