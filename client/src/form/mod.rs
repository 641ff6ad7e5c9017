//! The inventory form: three lists kept in sync with the remote service.
//!
//! Every network call runs on a worker thread and reports back over a
//! channel. `poll` applies finished loads on the caller's thread; results
//! whose ticket has been superseded are dropped.

pub mod list;
pub mod loader;

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{
    resolve_names, ApiError, CatalogItem, Character, InventoryEntry, InventoryService, InventorySlot,
};
pub use list::{Row, RowId, SelectableList, SelectionMode};
pub use loader::{LoadKind, LoadTracker, Ticket};

/// Last message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

enum Outcome {
    Catalog(Result<Vec<CatalogItem>, ApiError>),
    Characters(String, Result<Vec<Character>, ApiError>),
    Inventory(Character, Result<Vec<InventoryEntry>, ApiError>),
    Saved(Character, usize, Result<(), ApiError>),
}

pub struct InventoryForm {
    service: Arc<dyn InventoryService>,
    catalog: SelectableList<CatalogItem>,
    characters: SelectableList<Character>,
    inventory: SelectableList<InventoryEntry>,
    /// Character whose inventory is currently in the inventory list
    bound: Option<Character>,
    loads: LoadTracker,
    status: Option<Status>,
    tx: Sender<(Ticket, Outcome)>,
    rx: Receiver<(Ticket, Outcome)>,
}

impl InventoryForm {
    pub fn new(service: Arc<dyn InventoryService>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            catalog: SelectableList::new(SelectionMode::Multi),
            characters: SelectableList::new(SelectionMode::Single),
            inventory: SelectableList::new(SelectionMode::Multi),
            bound: None,
            loads: LoadTracker::new(),
            status: None,
            tx,
            rx,
        }
    }

    pub fn catalog(&self) -> &SelectableList<CatalogItem> {
        &self.catalog
    }

    pub fn characters(&self) -> &SelectableList<Character> {
        &self.characters
    }

    pub fn inventory(&self) -> &SelectableList<InventoryEntry> {
        &self.inventory
    }

    pub fn bound_character(&self) -> Option<&Character> {
        self.bound.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn is_loading(&self, kind: LoadKind) -> bool {
        self.loads.is_pending(kind)
    }

    pub fn is_busy(&self) -> bool {
        self.loads.any_pending()
    }

    pub fn toggle_catalog_row(&mut self, index: usize) {
        self.catalog.toggle_index(index);
    }

    pub fn toggle_inventory_row(&mut self, index: usize) {
        self.inventory.toggle_index(index);
    }

    // ------------------------------------------------------------------
    // Network-backed actions
    // ------------------------------------------------------------------

    /// Fetch the full item catalog.
    pub fn load_catalog(&mut self) {
        let ticket = self.loads.issue(LoadKind::Catalog);
        self.spawn(ticket, |service| Outcome::Catalog(service.list_catalog()));
    }

    /// Look up the characters of the account with this email.
    pub fn search(&mut self, email: &str) {
        let email = email.trim().to_string();
        let ticket = self.loads.issue(LoadKind::Characters);
        self.spawn(ticket, move |service| {
            let result = service.list_characters(&email);
            Outcome::Characters(email, result)
        });
    }

    /// Select a character and load its inventory. Returns false when nothing
    /// was started.
    ///
    /// Unsaved edits to the current inventory are discarded. A load still
    /// running for a previous selection is superseded. Re-selecting the
    /// character that is already loaded (or loading) keeps its edits.
    pub fn select_character(&mut self, index: usize) -> bool {
        let already_selected = self
            .characters
            .get(index)
            .is_some_and(|row| self.characters.is_selected(row.id));
        if already_selected && (self.bound.is_some() || self.loads.is_pending(LoadKind::Inventory)) {
            return false;
        }

        if self.characters.select_index(index).is_none() {
            return false;
        }
        let Some(character) = self.characters.selected_values().next().cloned() else {
            return false;
        };

        if !self.inventory.is_empty() {
            log::debug!("Discarding {} unsaved inventory rows", self.inventory.len());
        }
        self.inventory.clear();
        self.bound = None;

        let known = self.catalog_names();
        let ticket = self.loads.issue(LoadKind::Inventory);
        log::info!("Loading inventory for {} (server {})", character.name, character.server_id);
        self.spawn(ticket, move |service| {
            let result = service
                .list_inventory(&character)
                .and_then(|slots| resolve_names(service, &known, slots));
            Outcome::Inventory(character, result)
        });
        true
    }

    /// Persist the whole working inventory for the bound character.
    ///
    /// Only one save runs at a time; a second request while one is in flight
    /// is refused so an older body can never land after a newer one.
    pub fn save(&mut self) -> Result<(), ApiError> {
        let result = self.start_save();
        if let Err(ref e) = result {
            self.report(e);
        }
        result
    }

    fn start_save(&mut self) -> Result<(), ApiError> {
        let character = self.bound.clone().ok_or(ApiError::NoCharacter)?;
        character.server_number()?;
        if self.loads.is_pending(LoadKind::Save) {
            return Err(ApiError::SaveInProgress);
        }

        let slots: Vec<InventorySlot> = self.inventory.values().map(|entry| entry.slot).collect();
        let ticket = self.loads.issue(LoadKind::Save);
        self.spawn(ticket, move |service| {
            let result = service.save_inventory(&character, &slots);
            Outcome::Saved(character, slots.len(), result)
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------

    /// Append one slot per selected catalog item. Returns the number added.
    pub fn add_selected_items(&mut self) -> Result<usize, ApiError> {
        if self.bound.is_none() {
            let err = ApiError::NoCharacter;
            self.report(&err);
            return Err(err);
        }

        let additions: Vec<InventoryEntry> = self
            .catalog
            .selected_values()
            .map(|item| InventoryEntry::new(InventorySlot::single(item.id), item.name.clone()))
            .collect();
        let added = additions.len();
        for entry in additions {
            self.inventory.push(entry);
        }
        Ok(added)
    }

    /// Remove the selected inventory rows. Returns the number removed.
    pub fn remove_selected_items(&mut self) -> usize {
        self.inventory.remove_selected().len()
    }

    /// Remove inventory rows by their current positions.
    pub fn remove_inventory_rows(&mut self, indices: &[usize]) -> usize {
        self.inventory.remove_indices(indices).len()
    }

    // ------------------------------------------------------------------
    // Result handling
    // ------------------------------------------------------------------

    /// Apply every finished load without blocking. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok((ticket, outcome)) = self.rx.try_recv() {
            self.apply(ticket, outcome);
            handled += 1;
        }
        handled
    }

    /// Block up to `timeout` for the next finished load and apply it.
    pub fn wait_next(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok((ticket, outcome)) => {
                self.apply(ticket, outcome);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Block until no load is pending or `timeout` elapses.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.loads.any_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_next(remaining) {
                return false;
            }
        }
        true
    }

    fn apply(&mut self, ticket: Ticket, outcome: Outcome) {
        if !self.loads.accept(ticket) {
            log::debug!("Dropping stale {:?} result", ticket.kind);
            return;
        }

        match outcome {
            Outcome::Catalog(Ok(items)) => {
                log::info!("Loaded {} catalog items", items.len());
                self.catalog.replace(items);
            }
            Outcome::Characters(email, Ok(characters)) => {
                log::info!("Found {} characters for '{}'", characters.len(), email);
                self.status = Some(Status::Info(format!(
                    "{} character(s) for '{}'",
                    characters.len(),
                    email
                )));
                self.characters.replace(characters);
                self.loads.supersede(LoadKind::Inventory);
                self.inventory.clear();
                self.bound = None;
            }
            Outcome::Inventory(character, Ok(entries)) => {
                log::info!("Loaded {} inventory rows for {}", entries.len(), character.name);
                self.inventory.replace(entries);
                self.bound = Some(character);
            }
            Outcome::Saved(character, count, Ok(())) => {
                log::info!("Saved {} inventory rows for {}", count, character.name);
                self.status = Some(Status::Info(format!(
                    "Saved {} item(s) for {}",
                    count, character.name
                )));
            }
            Outcome::Catalog(Err(e))
            | Outcome::Characters(_, Err(e))
            | Outcome::Inventory(_, Err(e))
            | Outcome::Saved(_, _, Err(e)) => self.report(&e),
        }
    }

    fn report(&mut self, err: &ApiError) {
        log::warn!("{}", err.describe());
        self.status = Some(Status::Error(err.describe()));
    }

    fn catalog_names(&self) -> HashMap<i64, String> {
        self.catalog
            .values()
            .map(|item| (item.id, item.name.clone()))
            .collect()
    }

    fn spawn<F>(&mut self, ticket: Ticket, job: F)
    where
        F: FnOnce(&dyn InventoryService) -> Outcome + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{:?}-load", ticket.kind).to_lowercase())
            .spawn(move || {
                let outcome = job(service.as_ref());
                // The receiver is gone only if the form was dropped.
                let _ = tx.send((ticket, outcome));
            });

        if let Err(e) = spawned {
            self.loads.supersede(ticket.kind);
            self.report(&ApiError::Transport(format!("could not start request: {}", e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    /// In-memory service. Inventory loads for a gated character block until
    /// the gate is released.
    #[derive(Default)]
    struct FakeService {
        catalog: Mutex<Vec<CatalogItem>>,
        fail_catalog: AtomicBool,
        catalog_calls: AtomicUsize,
        accounts: HashMap<String, Vec<Character>>,
        inventories: HashMap<String, Vec<InventorySlot>>,
        gates: Mutex<HashMap<String, mpsc::Receiver<()>>>,
        save_reply: Mutex<Option<String>>,
        save_gate: Mutex<Option<mpsc::Receiver<()>>>,
        saved: Mutex<Vec<(Character, Vec<InventorySlot>)>>,
    }

    impl FakeService {
        fn gate(&self, name: &str) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            self.gates.lock().unwrap().insert(name.to_string(), rx);
            tx
        }

        fn gate_save(&self) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            *self.save_gate.lock().unwrap() = Some(rx);
            tx
        }
    }

    impl InventoryService for FakeService {
        fn list_catalog(&self) -> Result<Vec<CatalogItem>, ApiError> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_catalog.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("connection refused".to_string()));
            }
            Ok(self.catalog.lock().unwrap().clone())
        }

        fn list_characters(&self, email: &str) -> Result<Vec<Character>, ApiError> {
            Ok(self.accounts.get(email).cloned().unwrap_or_default())
        }

        fn list_inventory(&self, character: &Character) -> Result<Vec<InventorySlot>, ApiError> {
            let gate = self.gates.lock().unwrap().remove(&character.name);
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            Ok(self.inventories.get(&character.name).cloned().unwrap_or_default())
        }

        fn save_inventory(&self, character: &Character, slots: &[InventorySlot]) -> Result<(), ApiError> {
            let gate = self.save_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            self.saved.lock().unwrap().push((character.clone(), slots.to_vec()));
            match self.save_reply.lock().unwrap().clone() {
                Some(message) => Err(ApiError::Rejected(message)),
                None => Ok(()),
            }
        }
    }

    fn item(id: i64, name: &str) -> CatalogItem {
        CatalogItem { id, name: name.to_string() }
    }

    fn sample_service() -> FakeService {
        FakeService {
            catalog: Mutex::new(vec![item(1, "Sword"), item(2, "Shield"), item(7, "Lantern"), item(9, "Rope")]),
            accounts: HashMap::from([(
                "p@x.io".to_string(),
                vec![Character::new("Ayla", "1"), Character::new("Brom", "3")],
            )]),
            inventories: HashMap::from([
                ("Ayla".to_string(), vec![InventorySlot::single(1), InventorySlot::single(2)]),
                ("Brom".to_string(), vec![InventorySlot::single(9), InventorySlot::new(7, 2)]),
            ]),
            ..Default::default()
        }
    }

    fn form_with(service: FakeService) -> (InventoryForm, Arc<FakeService>) {
        let service = Arc::new(service);
        let shared: Arc<dyn InventoryService> = service.clone();
        (InventoryForm::new(shared), service)
    }

    fn inventory_names(form: &InventoryForm) -> Vec<String> {
        form.inventory().values().map(|e| e.name.clone()).collect()
    }

    fn ready_form() -> (InventoryForm, Arc<FakeService>) {
        let (mut form, service) = form_with(sample_service());
        form.load_catalog();
        form.search("  p@x.io ");
        assert!(form.wait_idle(WAIT));
        (form, service)
    }

    #[test]
    fn test_catalog_load_keeps_order() {
        let (mut form, _) = form_with(sample_service());
        form.load_catalog();
        assert!(form.wait_idle(WAIT));

        let ids: Vec<i64> = form.catalog().values().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 7, 9]);
    }

    #[test]
    fn test_failed_catalog_reload_keeps_previous_list() {
        let (mut form, service) = form_with(sample_service());
        form.load_catalog();
        assert!(form.wait_idle(WAIT));

        service.fail_catalog.store(true, Ordering::SeqCst);
        form.load_catalog();
        assert!(form.wait_idle(WAIT));

        assert_eq!(form.catalog().len(), 4);
        assert_eq!(
            form.status(),
            Some(&Status::Error("Network error: connection refused".to_string()))
        );
    }

    #[test]
    fn test_search_without_characters_is_empty() {
        let (mut form, _) = form_with(sample_service());
        form.search("nobody@x.io");
        assert!(form.wait_idle(WAIT));

        assert!(form.characters().is_empty());
        assert!(matches!(form.status(), Some(Status::Info(_))));
    }

    #[test]
    fn test_select_character_loads_named_inventory() {
        let (mut form, service) = ready_form();
        form.select_character(1);
        assert!(form.wait_idle(WAIT));

        assert_eq!(inventory_names(&form), vec!["Rope", "Lantern"]);
        assert_eq!(form.inventory().get(1).map(|r| r.value.slot.quantity), Some(2));
        assert_eq!(form.bound_character(), Some(&Character::new("Brom", "3")));
        // Names came from the loaded catalog, not another request.
        assert_eq!(service.catalog_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_adding_selected_items_appends_slots() {
        let (mut form, _) = ready_form();
        form.select_character(0);
        assert!(form.wait_idle(WAIT));

        form.toggle_catalog_row(1);
        form.toggle_catalog_row(3);
        let before = form.inventory().len();
        assert_eq!(form.add_selected_items().unwrap(), 2);
        assert_eq!(form.add_selected_items().unwrap(), 2);

        let ids: Vec<i64> = form.inventory().values().map(|e| e.slot.item_id).collect();
        assert_eq!(form.inventory().len(), before + 4);
        assert_eq!(&ids[before..], &[2, 9, 2, 9]);
        assert!(form.inventory().values().skip(before).all(|e| e.slot.quantity == 1));
    }

    #[test]
    fn test_add_without_character_is_reported() {
        let (mut form, _) = ready_form();
        form.toggle_catalog_row(0);
        assert!(matches!(form.add_selected_items(), Err(ApiError::NoCharacter)));
        assert!(form.inventory().is_empty());
        assert!(matches!(form.status(), Some(Status::Error(_))));
    }

    #[test]
    fn test_remove_rows_by_position() {
        let (mut form, _) = ready_form();
        form.select_character(0);
        assert!(form.wait_idle(WAIT));
        for index in 0..3 {
            form.toggle_catalog_row(index);
        }
        form.add_selected_items().unwrap();
        assert_eq!(inventory_names(&form), vec!["Sword", "Shield", "Sword", "Shield", "Lantern"]);

        assert_eq!(form.remove_inventory_rows(&[1, 3]), 2);
        assert_eq!(inventory_names(&form), vec!["Sword", "Sword", "Lantern"]);

        form.toggle_inventory_row(0);
        form.toggle_inventory_row(2);
        assert_eq!(form.remove_selected_items(), 2);
        assert_eq!(inventory_names(&form), vec!["Sword"]);
    }

    #[test]
    fn test_save_sends_whole_inventory() {
        let (mut form, service) = ready_form();
        form.select_character(1);
        assert!(form.wait_idle(WAIT));
        form.remove_inventory_rows(&[1]);

        form.save().unwrap();
        assert!(form.wait_idle(WAIT));

        let saved = service.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, Character::new("Brom", "3"));
        assert_eq!(saved[0].1, vec![InventorySlot::single(9)]);
        assert_eq!(form.status(), Some(&Status::Info("Saved 1 item(s) for Brom".to_string())));
    }

    #[test]
    fn test_rejected_save_is_reported() {
        let (mut form, service) = ready_form();
        *service.save_reply.lock().unwrap() = Some("UndefinedColumn".to_string());
        form.select_character(0);
        assert!(form.wait_idle(WAIT));

        form.save().unwrap();
        assert!(form.wait_idle(WAIT));
        assert_eq!(form.status(), Some(&Status::Error("Rejected: UndefinedColumn".to_string())));
    }

    #[test]
    fn test_save_needs_bound_character() {
        let (mut form, service) = ready_form();
        assert!(matches!(form.save(), Err(ApiError::NoCharacter)));
        assert!(!form.is_busy());
        assert!(service.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stale_inventory_does_not_overwrite_new_selection() {
        let (mut form, service) = ready_form();
        let release_ayla = service.gate("Ayla");

        form.select_character(0);
        form.select_character(1);
        assert!(form.wait_idle(WAIT));
        assert_eq!(inventory_names(&form), vec!["Rope", "Lantern"]);

        release_ayla.send(()).unwrap();
        assert!(form.wait_next(WAIT));

        assert_eq!(inventory_names(&form), vec!["Rope", "Lantern"]);
        assert_eq!(form.bound_character(), Some(&Character::new("Brom", "3")));
    }

    #[test]
    fn test_new_search_clears_inventory_and_cancels_load() {
        let (mut form, service) = ready_form();
        let release_ayla = service.gate("Ayla");

        form.select_character(0);
        form.search("p@x.io");
        assert!(form.wait_idle(WAIT));
        assert!(form.inventory().is_empty());
        assert!(form.bound_character().is_none());

        release_ayla.send(()).unwrap();
        assert!(form.wait_next(WAIT));
        assert!(form.inventory().is_empty());
    }

    #[test]
    fn test_second_save_refused_while_first_in_flight() {
        let (mut form, service) = ready_form();
        form.select_character(0);
        assert!(form.wait_idle(WAIT));

        let release_save = service.gate_save();
        form.save().unwrap();
        form.remove_inventory_rows(&[0, 1]);

        assert!(matches!(form.save(), Err(ApiError::SaveInProgress)));
        assert_eq!(form.status(), Some(&Status::Error("Busy: a save is already running".to_string())));

        release_save.send(()).unwrap();
        assert!(form.wait_idle(WAIT));
        assert_eq!(service.saved.lock().unwrap().len(), 1);
        assert_eq!(form.status(), Some(&Status::Info("Saved 2 item(s) for Ayla".to_string())));

        // Once the first save is done the edited inventory can be saved.
        form.save().unwrap();
        assert!(form.wait_idle(WAIT));
        let saved = service.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved[1].1.is_empty());
    }

    #[test]
    fn test_switching_character_discards_unsaved_edits() {
        let (mut form, service) = ready_form();
        form.select_character(0);
        assert!(form.wait_idle(WAIT));
        form.toggle_catalog_row(2);
        form.add_selected_items().unwrap();
        assert_eq!(inventory_names(&form), vec!["Sword", "Shield", "Lantern"]);

        assert!(form.select_character(1));
        assert!(form.wait_idle(WAIT));
        assert_eq!(inventory_names(&form), vec!["Rope", "Lantern"]);
        assert_eq!(form.bound_character(), Some(&Character::new("Brom", "3")));

        form.save().unwrap();
        assert!(form.wait_idle(WAIT));
        let saved = service.saved.lock().unwrap();
        assert_eq!(saved[0].0, Character::new("Brom", "3"));
        assert_eq!(saved[0].1, vec![InventorySlot::single(9), InventorySlot::new(7, 2)]);
    }

    #[test]
    fn test_reselecting_loaded_character_keeps_edits() {
        let (mut form, _) = ready_form();
        assert!(form.select_character(0));
        assert!(form.wait_idle(WAIT));
        form.toggle_catalog_row(3);
        form.add_selected_items().unwrap();

        assert!(!form.select_character(0));
        assert!(!form.is_busy());
        assert_eq!(inventory_names(&form), vec!["Sword", "Shield", "Rope"]);
        assert_eq!(form.bound_character(), Some(&Character::new("Ayla", "1")));
    }
}
