use std::sync::{PoisonError, RwLock};

use rust_decimal::Decimal;

use crate::domain::cart::{CartError, Item, ItemId};

// ============================================================================
// Catalog Gateway - read-only source of priced items
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Item not found: {0}")]
    NotFound(ItemId),
}

impl From<CatalogError> for CartError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(id) => CartError::ItemNotFound(id),
        }
    }
}

pub trait CatalogGateway: Send + Sync {
    /// Current item for `id`
    fn get_item(&self, id: &ItemId) -> Result<Item, CatalogError>;

    /// Every call starts a fresh, finite pass over the catalog
    fn list_items(&self) -> Box<dyn Iterator<Item = Item> + '_>;
}

/// Insertion-ordered catalog held in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<Item>>,
}

impl InMemoryCatalog {
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let catalog = Self::default();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// The storefront's launch line-up
    pub fn sneakers() -> Result<Self, CartError> {
        Ok(Self::with_items([
            Item::new("sneaker-1", "Sneaker 1", Decimal::new(9999, 2))?,
            Item::new("sneaker-2", "Sneaker 2", Decimal::new(12999, 2))?,
            Item::new("sneaker-3", "Sneaker 3", Decimal::new(14999, 2))?,
        ]))
    }

    /// Insert or replace (price changes keep the item's position)
    pub fn insert(&self, item: Item) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub fn remove(&self, id: &ItemId) -> Option<Item> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let index = items.iter().position(|item| &item.id == id)?;
        Some(items.remove(index))
    }
}

impl CatalogGateway for InMemoryCatalog {
    fn get_item(&self, id: &ItemId) -> Result<Item, CatalogError> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn list_items(&self) -> Box<dyn Iterator<Item = Item> + '_> {
        let snapshot = self.items.read().unwrap_or_else(PoisonError::into_inner).clone();
        Box::new(snapshot.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sneaker_catalog_prices() {
        let catalog = InMemoryCatalog::sneakers().unwrap();
        let item = catalog.get_item(&ItemId::new("sneaker-1")).unwrap();

        assert_eq!(item.name, "Sneaker 1");
        assert_eq!(item.unit_price, Decimal::new(9999, 2));
    }

    #[test]
    fn test_unknown_item() {
        let catalog = InMemoryCatalog::sneakers().unwrap();
        assert!(matches!(
            catalog.get_item(&ItemId::new("sandal")),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_listing_is_ordered_and_restartable() {
        let catalog = InMemoryCatalog::sneakers().unwrap();

        let first: Vec<String> = catalog.list_items().map(|i| i.id.0).collect();
        let second: Vec<String> = catalog.list_items().map(|i| i.id.0).collect();

        assert_eq!(first, vec!["sneaker-1", "sneaker-2", "sneaker-3"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let catalog = InMemoryCatalog::sneakers().unwrap();
        catalog.insert(Item::new("sneaker-1", "Sneaker 1", Decimal::new(8999, 2)).unwrap());

        let items: Vec<Item> = catalog.list_items().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].unit_price, Decimal::new(8999, 2));
    }

    #[test]
    fn test_remove() {
        let catalog = InMemoryCatalog::sneakers().unwrap();
        assert!(catalog.remove(&ItemId::new("sneaker-2")).is_some());
        assert!(catalog.remove(&ItemId::new("sneaker-2")).is_none());
        assert_eq!(catalog.list_items().count(), 2);
    }
}
