//! HTTP access to the account/inventory service.

mod client;
pub mod types;

use std::collections::{BTreeSet, HashMap};

pub use client::ApiClient;
pub use types::{
    ApiError, CatalogItem, Character, InventoryEntry, InventorySlot, ItemDetails, ItemId, NewItem,
    SaveInventoryRequest,
};

/// Operations the inventory form needs from the remote service.
///
/// Calls block; the form runs them on worker threads.
pub trait InventoryService: Send + Sync + 'static {
    /// `GET /item/all`
    fn list_catalog(&self) -> Result<Vec<CatalogItem>, ApiError>;

    /// `GET /account/characters`
    fn list_characters(&self, email: &str) -> Result<Vec<Character>, ApiError>;

    /// `GET /inventory/all`
    fn list_inventory(&self, character: &Character) -> Result<Vec<InventorySlot>, ApiError>;

    /// `POST /inventory/all`, replacing the character's whole inventory.
    fn save_inventory(&self, character: &Character, slots: &[InventorySlot]) -> Result<(), ApiError>;
}

/// Attach display names to `slots`, keeping their order.
///
/// Ids found in `known` are resolved locally. The rest are looked up with a
/// single catalog request; ids the catalog does not have get a placeholder.
pub fn resolve_names<S: InventoryService + ?Sized>(
    service: &S,
    known: &HashMap<ItemId, String>,
    slots: Vec<InventorySlot>,
) -> Result<Vec<InventoryEntry>, ApiError> {
    let missing: BTreeSet<ItemId> = slots
        .iter()
        .map(|slot| slot.item_id)
        .filter(|id| !known.contains_key(id))
        .collect();

    let fetched: HashMap<ItemId, String> = if missing.is_empty() {
        HashMap::new()
    } else {
        log::debug!("Resolving {} item names from catalog", missing.len());
        service
            .list_catalog()?
            .into_iter()
            .filter(|item| missing.contains(&item.id))
            .map(|item| (item.id, item.name))
            .collect()
    };

    Ok(slots
        .into_iter()
        .map(|slot| {
            let name = known
                .get(&slot.item_id)
                .or_else(|| fetched.get(&slot.item_id))
                .cloned()
                .unwrap_or_else(|| InventoryEntry::placeholder_name(slot.item_id));
            InventoryEntry::new(slot, name)
        })
        .collect())
}
