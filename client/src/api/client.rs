use std::io;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::types::*;
use super::InventoryService;
use crate::config::ClientConfig;

/// Blocking client for the account/inventory service.
///
/// Wraps one `ureq::Agent`, so clones share the connection pool. Read routes
/// send their JSON body on a GET request; the service expects it that way.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up a single item. Returns the first row of `GET /item`.
    pub fn item_details(&self, id: ItemId) -> Result<ItemDetails, ApiError> {
        let value = self.send("GET", "/item", Some(&ItemLookup { id }))?;
        let rows: Vec<ItemDetails> = expect_list(value)?;
        rows.into_iter().next().ok_or(ApiError::ItemNotFound(id))
    }

    /// Name of a single item, one request per call.
    pub fn item_name(&self, id: ItemId) -> Result<String, ApiError> {
        Ok(self.item_details(id)?.name)
    }

    pub fn account_status(&self, email: &str) -> Result<String, ApiError> {
        let value = self.send("GET", "/account/status", Some(&AccountLookup { email }))?;
        expect_text(value)
    }

    pub fn server_status(&self, server_id: i64) -> Result<String, ApiError> {
        let value = self.send("GET", "/server/status", Some(&ServerLookup { id: server_id }))?;
        expect_text(value)
    }

    /// All characters hosted on one server.
    pub fn server_characters(&self, server_id: i64) -> Result<Vec<Character>, ApiError> {
        let value = self.send("GET", "/server/characters", Some(&ServerLookup { id: server_id }))?;
        expect_list(value)
    }

    /// Create an empty character on `character.server_id` for the given account.
    pub fn create_character(&self, character: &Character, account_email: &str) -> Result<(), ApiError> {
        let body = CharacterRecord {
            server_id: character.server_number()?,
            name: &character.name,
            account_email,
        };
        let value = self.send("POST", "/character/new", Some(&body))?;
        expect_success(value)
    }

    pub fn delete_character(&self, character: &Character, account_email: &str) -> Result<(), ApiError> {
        let body = CharacterRecord {
            server_id: character.server_number()?,
            name: &character.name,
            account_email,
        };
        let value = self.send("DELETE", "/character/delete", Some(&body))?;
        expect_success(value)
    }

    pub fn create_item(&self, item: &NewItem) -> Result<(), ApiError> {
        let value = self.send("POST", "/item", Some(item))?;
        expect_success(value)
    }

    fn send<B: Serialize>(&self, method: &str, path: &str, body: Option<&B>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", method, url);

        let request = self
            .agent
            .request(method, &url)
            .set("Content-Type", "application/json");

        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = result.map_err(|e| map_ureq_error(path, e))?;

        let text = response.into_string().map_err(|e| map_io_error(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{} returned invalid JSON: {}", path, e)))
    }
}

impl InventoryService for ApiClient {
    fn list_catalog(&self) -> Result<Vec<CatalogItem>, ApiError> {
        let value = self.send::<()>("GET", "/item/all", None)?;
        expect_list(value)
    }

    fn list_characters(&self, email: &str) -> Result<Vec<Character>, ApiError> {
        let value = self.send("GET", "/account/characters", Some(&AccountLookup { email }))?;
        expect_list(value)
    }

    fn list_inventory(&self, character: &Character) -> Result<Vec<InventorySlot>, ApiError> {
        let body = InventoryLookup {
            server_id: &character.server_id,
            name: &character.name,
        };
        let value = self.send("GET", "/inventory/all", Some(&body))?;
        let rows: Vec<Value> = expect_list(value)?;
        rows.iter().map(InventorySlot::from_wire).collect()
    }

    fn save_inventory(&self, character: &Character, slots: &[InventorySlot]) -> Result<(), ApiError> {
        let body = SaveInventoryRequest::new(character, slots)?;
        let value = self.send("POST", "/inventory/all", Some(&body))?;
        expect_success(value)
    }
}

/// The service reports database errors as a bare JSON string where a list
/// is expected.
fn expect_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    match value {
        Value::String(message) => Err(ApiError::Rejected(message)),
        other => serde_json::from_value(other).map_err(|e| ApiError::Decode(e.to_string())),
    }
}

fn expect_success(value: Value) -> Result<(), ApiError> {
    match value {
        Value::String(ref s) if s == SUCCESS_MARKER => Ok(()),
        Value::String(message) => Err(ApiError::Rejected(message)),
        other => Err(ApiError::Rejected(other.to_string())),
    }
}

fn expect_text(value: Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Err(ApiError::Rejected("no value returned".to_string())),
        other => Err(ApiError::Decode(format!("expected a string, got {}", other))),
    }
}

fn map_ureq_error(path: &str, err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, response) => ApiError::Status {
            code,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                ApiError::Timeout(path.to_string())
            } else {
                ApiError::Transport(transport.to_string())
            }
        }
    }
}

fn map_io_error(path: &str, err: io::Error) -> ApiError {
    if is_timeout_kind(&err) {
        ApiError::Timeout(path.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// ureq wraps socket timeouts as transport errors; the io error sits
/// somewhere in the source chain, possibly inside another io error.
fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if is_timeout_kind(io_err) {
                return true;
            }
            let inner = io_err.get_ref().and_then(|e| e.downcast_ref::<io::Error>());
            if inner.is_some_and(is_timeout_kind) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

fn is_timeout_kind(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
