use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Item id as stored by the service.
pub type ItemId = i64;

/// Success marker returned by every mutating route.
pub const SUCCESS_MARKER: &str = "OPERATION SUCCESSFUL";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
    #[error("no item with id {0}")]
    ItemNotFound(ItemId),
    #[error("server id '{0}' is not a number")]
    InvalidServerId(String),
    #[error("no character selected")]
    NoCharacter,
    #[error("a save is already running")]
    SaveInProgress,
}

impl ApiError {
    /// Short label shown in front of the message on the status line.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "Network error",
            ApiError::Timeout(_) => "Timeout",
            ApiError::Status { .. } => "Server error",
            ApiError::Decode(_) => "Bad response",
            ApiError::Rejected(_) => "Rejected",
            ApiError::ItemNotFound(_) => "Unknown item",
            ApiError::InvalidServerId(_) => "Invalid character",
            ApiError::NoCharacter => "No character",
            ApiError::SaveInProgress => "Busy",
        }
    }

    /// `"<kind>: <message>"`, the form the operator sees.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

/// Catalog entry from `/item/all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(deserialize_with = "item_id_from_wire")]
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
}

/// Player character, identified by `(name, server_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(deserialize_with = "text_from_wire")]
    pub server_id: String,
}

impl Character {
    pub fn new(name: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_id: server_id.into(),
        }
    }

    /// Numeric server id, as the mutating routes expect it.
    pub fn server_number(&self) -> Result<i64, ApiError> {
        self.server_id
            .trim()
            .parse()
            .map_err(|_| ApiError::InvalidServerId(self.server_id.clone()))
    }
}

/// One `(item_id, quantity)` pair of a character's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventorySlot {
    pub item_id: ItemId,
    pub quantity: i64,
}

impl InventorySlot {
    pub fn new(item_id: ItemId, quantity: i64) -> Self {
        Self { item_id, quantity }
    }

    /// Slot created by the editor. Quantity is always 1; stacking is not assumed.
    pub fn single(item_id: ItemId) -> Self {
        Self::new(item_id, 1)
    }

    /// Decode one element of the `/inventory/all` response.
    ///
    /// The service returns `UNNEST(inventory) AS values` rows, so the usual
    /// shape is `{"values": "(7,1)"}`. Plain arrays, objects with an
    /// `id`/`item_id` key and bare ids are accepted as well.
    pub fn from_wire(value: &Value) -> Result<Self, ApiError> {
        match value {
            Value::Number(_) => Ok(Self::single(int_from_value(value)?)),
            Value::String(text) => parse_composite(text),
            Value::Array(parts) => slot_from_parts(parts),
            Value::Object(map) => {
                if let Some(inner) = map.get("values") {
                    return Self::from_wire(inner);
                }
                let id = map
                    .get("item_id")
                    .or_else(|| map.get("id"))
                    .ok_or_else(|| ApiError::Decode(format!("inventory row without item id: {}", value)))?;
                let quantity = match map.get("quantity").or_else(|| map.get("qty")) {
                    Some(Value::Null) | None => 1,
                    Some(q) => int_from_value(q)?,
                };
                Ok(Self::new(int_from_value(id)?, quantity))
            }
            _ => Err(ApiError::Decode(format!("unexpected inventory row: {}", value))),
        }
    }
}

/// Inventory row as displayed: the slot plus its resolved item name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub slot: InventorySlot,
    pub name: String,
}

impl InventoryEntry {
    pub fn new(slot: InventorySlot, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
        }
    }

    pub fn placeholder_name(item_id: ItemId) -> String {
        format!("Unknown ({})", item_id)
    }
}

/// Full item row from `GET /item`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemDetails {
    #[serde(deserialize_with = "item_id_from_wire")]
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub is_stackable: Option<bool>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Body for `POST /item`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewItem {
    pub name: String,
    pub rarity: Option<String>,
    pub description: Option<String>,
    pub cost: Option<i64>,
    pub is_stackable: Option<bool>,
}

// ----------------------------------------------------------------------------
// Request bodies
// ----------------------------------------------------------------------------

#[derive(Serialize)]
pub(crate) struct ItemLookup {
    pub id: ItemId,
}

#[derive(Serialize)]
pub(crate) struct AccountLookup<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ServerLookup {
    pub id: i64,
}

#[derive(Serialize)]
pub(crate) struct InventoryLookup<'a> {
    pub server_id: &'a str,
    pub name: &'a str,
}

/// Body of `POST /inventory/all`. Field order is part of the wire contract.
#[derive(Debug, Serialize)]
pub struct SaveInventoryRequest<'a> {
    pub server_id: i64,
    pub name: &'a str,
    pub inventory: Vec<[i64; 2]>,
}

impl<'a> SaveInventoryRequest<'a> {
    pub fn new(character: &'a Character, slots: &[InventorySlot]) -> Result<Self, ApiError> {
        Ok(Self {
            server_id: character.server_number()?,
            name: &character.name,
            inventory: slots.iter().map(|s| [s.item_id, s.quantity]).collect(),
        })
    }
}

#[derive(Serialize)]
pub(crate) struct CharacterRecord<'a> {
    pub server_id: i64,
    pub name: &'a str,
    pub account_email: &'a str,
}

// ----------------------------------------------------------------------------
// Wire helpers
// ----------------------------------------------------------------------------

fn int_from_value(value: &Value) -> Result<i64, ApiError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ApiError::Decode(format!("not an integer: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ApiError::Decode(format!("not an integer: {:?}", s))),
        other => Err(ApiError::Decode(format!("not an integer: {}", other))),
    }
}

fn slot_from_parts(parts: &[Value]) -> Result<InventorySlot, ApiError> {
    match parts {
        [id] => Ok(InventorySlot::single(int_from_value(id)?)),
        [id, Value::Null] => Ok(InventorySlot::single(int_from_value(id)?)),
        [id, qty] => Ok(InventorySlot::new(int_from_value(id)?, int_from_value(qty)?)),
        _ => Err(ApiError::Decode(format!("unexpected inventory tuple of {} fields", parts.len()))),
    }
}

/// Parses Postgres composite text such as `(7,1)` or a bare `7`.
fn parse_composite(text: &str) -> Result<InventorySlot, ApiError> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut fields = inner.split(',').map(str::trim);
    let id = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::Decode(format!("empty inventory row {:?}", text)))?;
    let id = id
        .parse()
        .map_err(|_| ApiError::Decode(format!("bad item id in {:?}", text)))?;
    let quantity = match fields.next() {
        Some("") | None => 1,
        Some(q) => q
            .parse()
            .map_err(|_| ApiError::Decode(format!("bad quantity in {:?}", text)))?,
    };
    Ok(InventorySlot::new(id, quantity))
}

fn item_id_from_wire<'de, D>(deserializer: D) -> Result<ItemId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    int_from_value(&value).map_err(serde::de::Error::custom)
}

fn text_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_body_matches_wire_contract() {
        let character = Character::new("Foo", "3");
        let slots = [InventorySlot::single(7), InventorySlot::single(9)];
        let body = SaveInventoryRequest::new(&character, &slots).unwrap();
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"server_id":3,"name":"Foo","inventory":[[7,1],[9,1]]}"#
        );
    }

    #[test]
    fn test_save_rejects_non_numeric_server_id() {
        let character = Character::new("Foo", "eu-west");
        let err = SaveInventoryRequest::new(&character, &[]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidServerId(ref id) if id == "eu-west"));
    }

    #[test]
    fn test_character_accepts_numeric_server_id() {
        let character: Character = serde_json::from_value(json!({
            "server_id": 3,
            "name": "Foo",
            "account_email": "a@b.c",
            "level": 0
        }))
        .unwrap();
        assert_eq!(character, Character::new("Foo", "3"));
    }

    #[test]
    fn test_catalog_item_ignores_extra_columns() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 4,
            "name": "Iron Sword",
            "rarity": "common",
            "cost": 10,
            "icon": null
        }))
        .unwrap();
        assert_eq!(item, CatalogItem { id: 4, name: "Iron Sword".to_string() });
    }

    #[test]
    fn test_inventory_row_shapes() {
        let rows = [
            (json!({"values": "(7,1)"}), InventorySlot::new(7, 1)),
            (json!({"values": "(12,3)"}), InventorySlot::new(12, 3)),
            (json!({"values": [5, 2]}), InventorySlot::new(5, 2)),
            (json!({"id": 9}), InventorySlot::new(9, 1)),
            (json!({"item_id": "8", "qty": 4}), InventorySlot::new(8, 4)),
            (json!([3, 1]), InventorySlot::new(3, 1)),
            (json!(6), InventorySlot::new(6, 1)),
            (json!("(2,)"), InventorySlot::new(2, 1)),
        ];
        for (row, expected) in rows {
            assert_eq!(InventorySlot::from_wire(&row).unwrap(), expected, "row {}", row);
        }
    }

    #[test]
    fn test_inventory_row_garbage_is_decode_error() {
        for row in [json!(null), json!({"name": "x"}), json!("()"), json!([1, 2, 3])] {
            let err = InventorySlot::from_wire(&row).unwrap_err();
            assert!(matches!(err, ApiError::Decode(_)), "row {}", row);
        }
    }

    #[test]
    fn test_error_description_includes_kind() {
        let err = ApiError::Rejected("UniqueViolation".to_string());
        assert_eq!(err.describe(), "Rejected: UniqueViolation");
    }
}
