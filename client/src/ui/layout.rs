use macroquad::prelude::{Rect, Vec2};

/// Clickable element of the inventory screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiElementId {
    EmailField,
    SearchButton,
    ReloadButton,
    AddButton,
    RemoveButton,
    SaveButton,

    // Rows carry their absolute index in the backing list
    CatalogRow(usize),
    CharacterRow(usize),
    InventoryRow(usize),
}

pub struct UiElement {
    pub id: UiElementId,
    pub bounds: Rect,
}

/// Interactive elements of one frame, in draw order
#[derive(Default)]
pub struct UiLayout {
    pub elements: Vec<UiElement>,
}

impl UiLayout {
    pub fn new() -> Self {
        Self {
            elements: Vec::with_capacity(64),
        }
    }

    pub fn add(&mut self, id: UiElementId, bounds: Rect) {
        self.elements.push(UiElement { id, bounds });
    }

    pub fn bounds_of(&self, id: UiElementId) -> Option<Rect> {
        self.elements.iter().find(|e| e.id == id).map(|e| e.bounds)
    }

    /// Topmost element under the point
    pub fn hit_test(&self, x: f32, y: f32) -> Option<UiElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| e.bounds.contains(Vec2::new(x, y)))
            .map(|e| e.id)
    }
}
