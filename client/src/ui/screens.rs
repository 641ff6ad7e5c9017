use macroquad::prelude::*;

use super::layout::{UiElementId, UiLayout};
use super::scroll::{draw_scrollbar, wheel_rows, ListScroll};
use crate::form::{InventoryForm, LoadKind, SelectableList, Status};

/// Result of screen update - tells the main loop what to do next
pub enum ScreenState {
    Continue,
    Quit,
}

pub trait Screen {
    fn update(&mut self) -> ScreenState;
    fn render(&self);
}

const MAX_EMAIL_LEN: usize = 64;
const ROW_HEIGHT: f32 = 24.0;
const FONT_SIZE: f32 = 18.0;
const PANEL_TOP: f32 = 110.0;
const PANEL_GAP: f32 = 20.0;
const BUTTON_COLUMN: f32 = 110.0;

const BG: Color = Color::new(0.10, 0.10, 0.14, 1.0);
const PANEL_BG: Color = Color::new(0.16, 0.16, 0.23, 1.0);
const ROW_SELECTED: Color = Color::new(0.24, 0.31, 0.47, 1.0);
const BUTTON_BG: Color = Color::new(0.24, 0.24, 0.31, 1.0);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Panel {
    Catalog,
    Characters,
    Inventory,
}

impl Panel {
    const ALL: [Panel; 3] = [Panel::Catalog, Panel::Characters, Panel::Inventory];

    fn index(self) -> usize {
        match self {
            Panel::Catalog => 0,
            Panel::Characters => 1,
            Panel::Inventory => 2,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Panel::Catalog => "Items",
            Panel::Characters => "Characters",
            Panel::Inventory => "Inventory",
        }
    }

    fn load_kind(self) -> LoadKind {
        match self {
            Panel::Catalog => LoadKind::Catalog,
            Panel::Characters => LoadKind::Characters,
            Panel::Inventory => LoadKind::Inventory,
        }
    }

    fn row_id(self, index: usize) -> UiElementId {
        match self {
            Panel::Catalog => UiElementId::CatalogRow(index),
            Panel::Characters => UiElementId::CharacterRow(index),
            Panel::Inventory => UiElementId::InventoryRow(index),
        }
    }
}

// ============================================================================
// Inventory Screen
// ============================================================================

pub struct InventoryScreen {
    form: InventoryForm,
    email: String,
    email_active: bool,
    scroll: [ListScroll; 3],
}

impl InventoryScreen {
    pub fn new(form: InventoryForm) -> Self {
        Self {
            form,
            email: String::new(),
            email_active: true,
            scroll: [ListScroll::default(); 3],
        }
    }

    /// Start the initial catalog load.
    pub fn activate(&mut self) {
        self.form.load_catalog();
    }

    fn panel_rect(panel: Panel) -> Rect {
        let sw = screen_width();
        let sh = screen_height();
        let width = (sw - BUTTON_COLUMN - PANEL_GAP * 5.0) / 3.0;
        let height = sh - PANEL_TOP - 60.0;
        // Items | buttons | Inventory | Characters
        let x = match panel {
            Panel::Catalog => PANEL_GAP,
            Panel::Inventory => PANEL_GAP * 3.0 + width + BUTTON_COLUMN,
            Panel::Characters => PANEL_GAP * 4.0 + width * 2.0 + BUTTON_COLUMN,
        };
        Rect::new(x, PANEL_TOP, width, height)
    }

    fn visible_rows(panel: Panel) -> usize {
        ((Self::panel_rect(panel).h - 8.0) / ROW_HEIGHT).floor().max(1.0) as usize
    }

    fn row_count(&self, panel: Panel) -> usize {
        match panel {
            Panel::Catalog => self.form.catalog().len(),
            Panel::Characters => self.form.characters().len(),
            Panel::Inventory => self.form.inventory().len(),
        }
    }

    /// Positions of every clickable element for the current window size.
    fn layout(&self) -> UiLayout {
        let mut layout = UiLayout::new();

        layout.add(UiElementId::EmailField, Rect::new(PANEL_GAP, 50.0, 360.0, 32.0));
        layout.add(UiElementId::SearchButton, Rect::new(PANEL_GAP + 370.0, 50.0, 90.0, 32.0));
        layout.add(UiElementId::ReloadButton, Rect::new(PANEL_GAP + 470.0, 50.0, 120.0, 32.0));

        let catalog = Self::panel_rect(Panel::Catalog);
        let button_x = catalog.x + catalog.w + PANEL_GAP;
        let button_y = catalog.y + 40.0;
        layout.add(UiElementId::AddButton, Rect::new(button_x, button_y, BUTTON_COLUMN, 32.0));
        layout.add(UiElementId::RemoveButton, Rect::new(button_x, button_y + 44.0, BUTTON_COLUMN, 32.0));
        layout.add(UiElementId::SaveButton, Rect::new(button_x, button_y + 120.0, BUTTON_COLUMN, 32.0));

        for panel in Panel::ALL {
            let rect = Self::panel_rect(panel);
            let rows = self.scroll[panel.index()].visible_range(self.row_count(panel), Self::visible_rows(panel));
            for (slot, index) in rows.enumerate() {
                let y = rect.y + 4.0 + slot as f32 * ROW_HEIGHT;
                layout.add(panel.row_id(index), Rect::new(rect.x + 4.0, y, rect.w - 16.0, ROW_HEIGHT - 2.0));
            }
        }

        layout
    }

    fn handle_text_input(&mut self) {
        if !self.email_active {
            // Drain typed characters so they don't pile up
            while get_char_pressed().is_some() {}
            return;
        }

        while let Some(c) = get_char_pressed() {
            if !c.is_control() && self.email.len() < MAX_EMAIL_LEN {
                self.email.push(c);
            }
        }

        if is_key_pressed(KeyCode::Backspace) {
            self.email.pop();
        }
    }

    fn handle_click(&mut self, id: UiElementId) {
        self.email_active = id == UiElementId::EmailField;

        match id {
            UiElementId::EmailField => {}
            UiElementId::SearchButton => self.form.search(&self.email),
            UiElementId::ReloadButton => self.form.load_catalog(),
            UiElementId::AddButton => {
                // Failure is shown on the status line
                let _ = self.form.add_selected_items();
            }
            UiElementId::RemoveButton => {
                self.form.remove_selected_items();
            }
            UiElementId::SaveButton => {
                let _ = self.form.save();
            }
            UiElementId::CatalogRow(index) => self.form.toggle_catalog_row(index),
            UiElementId::CharacterRow(index) => {
                if self.form.select_character(index) {
                    self.scroll[Panel::Inventory.index()] = ListScroll::default();
                }
            }
            UiElementId::InventoryRow(index) => self.form.toggle_inventory_row(index),
        }
    }

    fn handle_scroll(&mut self) {
        let rows = wheel_rows();
        let (mx, my) = mouse_position();
        for panel in Panel::ALL {
            let total = self.row_count(panel);
            let visible = Self::visible_rows(panel);
            let scroll = &mut self.scroll[panel.index()];
            if rows != 0 && Self::panel_rect(panel).contains(vec2(mx, my)) {
                scroll.scroll_by(rows, total, visible);
            } else {
                scroll.clamp(total, visible);
            }
        }
    }

    fn draw_button(&self, layout: &UiLayout, id: UiElementId, label: &str, enabled: bool) {
        let Some(rect) = layout.bounds_of(id) else {
            return;
        };
        let (mx, my) = mouse_position();
        let hovered = enabled && rect.contains(vec2(mx, my));
        let bg = if hovered { ROW_SELECTED } else { BUTTON_BG };
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, bg);
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, if enabled { GRAY } else { DARKGRAY });

        let dims = measure_text(label, None, FONT_SIZE as u16, 1.0);
        let text_x = rect.x + (rect.w - dims.width) / 2.0;
        draw_text(label, text_x, rect.y + 22.0, FONT_SIZE, if enabled { WHITE } else { GRAY });
    }

    fn draw_panel<T>(&self, layout: &UiLayout, panel: Panel, list: &SelectableList<T>, label: impl Fn(&T) -> String) {
        let rect = Self::panel_rect(panel);
        draw_text(panel.title(), rect.x, rect.y - 10.0, FONT_SIZE, LIGHTGRAY);
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, PANEL_BG);
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, GRAY);

        if list.is_empty() {
            let hint = if self.form.is_loading(panel.load_kind()) { "Loading..." } else { "(empty)" };
            draw_text(hint, rect.x + 10.0, rect.y + 24.0, FONT_SIZE, DARKGRAY);
        }

        for (index, row) in list.rows().iter().enumerate() {
            let Some(bounds) = layout.bounds_of(panel.row_id(index)) else {
                continue;
            };
            if list.is_selected(row.id) {
                draw_rectangle(bounds.x, bounds.y, bounds.w, bounds.h, ROW_SELECTED);
            }
            draw_text(&label(&row.value), bounds.x + 6.0, bounds.y + 17.0, FONT_SIZE, WHITE);
        }

        let visible = Self::visible_rows(panel);
        if let Some((position, size)) = self.scroll[panel.index()].thumb(list.len(), visible) {
            let track = Rect::new(rect.x + rect.w - 8.0, rect.y + 2.0, 6.0, rect.h - 4.0);
            draw_scrollbar(track, position, size, Color::from_rgba(30, 30, 40, 255), GRAY);
        }
    }
}

impl Screen for InventoryScreen {
    fn update(&mut self) -> ScreenState {
        self.form.poll();
        self.handle_text_input();
        self.handle_scroll();

        if is_key_pressed(KeyCode::Escape) {
            return ScreenState::Quit;
        }

        if self.email_active && (is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter)) {
            self.form.search(&self.email);
        }

        if !self.email_active && is_key_pressed(KeyCode::Delete) {
            self.form.remove_selected_items();
        }

        if is_mouse_button_pressed(MouseButton::Left) {
            let (mx, my) = mouse_position();
            match self.layout().hit_test(mx, my) {
                Some(id) => self.handle_click(id),
                None => self.email_active = false,
            }
        }

        ScreenState::Continue
    }

    fn render(&self) {
        let sw = screen_width();
        let sh = screen_height();
        let layout = self.layout();

        clear_background(BG);
        draw_text("INVENTORY EDITOR", PANEL_GAP, 30.0, 24.0, WHITE);

        // Email field
        if let Some(field) = layout.bounds_of(UiElementId::EmailField) {
            let border = if self.email_active { WHITE } else { GRAY };
            draw_rectangle(field.x, field.y, field.w, field.h, PANEL_BG);
            draw_rectangle_lines(field.x, field.y, field.w, field.h, 2.0, border);

            let (text, color) = if self.email.is_empty() && !self.email_active {
                ("Account email...".to_string(), DARKGRAY)
            } else {
                let cursor = if self.email_active && (get_time() * 2.0) as i32 % 2 == 0 { "|" } else { "" };
                (format!("{}{}", self.email, cursor), WHITE)
            };
            draw_text(&text, field.x + 8.0, field.y + 22.0, FONT_SIZE, color);
        }

        let bound = self.form.bound_character().is_some();
        self.draw_button(&layout, UiElementId::SearchButton, "Search", true);
        self.draw_button(&layout, UiElementId::ReloadButton, "Reload items", true);
        self.draw_button(&layout, UiElementId::AddButton, "Add >", bound);
        self.draw_button(&layout, UiElementId::RemoveButton, "< Remove", bound);
        self.draw_button(&layout, UiElementId::SaveButton, "Save", bound);

        self.draw_panel(&layout, Panel::Catalog, self.form.catalog(), |item| {
            format!("#{} {}", item.id, item.name)
        });
        self.draw_panel(&layout, Panel::Characters, self.form.characters(), |character| {
            format!("{} (server {})", character.name, character.server_id)
        });
        self.draw_panel(&layout, Panel::Inventory, self.form.inventory(), |entry| {
            if entry.slot.quantity == 1 {
                entry.name.clone()
            } else {
                format!("{} x{}", entry.name, entry.slot.quantity)
            }
        });

        if let Some(character) = self.form.bound_character() {
            let inventory = Self::panel_rect(Panel::Inventory);
            let title_width = measure_text("Inventory", None, FONT_SIZE as u16, 1.0).width;
            draw_text(
                &format!("- {}", character.name),
                inventory.x + title_width + 8.0,
                inventory.y - 10.0,
                FONT_SIZE,
                GRAY,
            );
        }

        // Status line
        let status_y = sh - 24.0;
        if let Some(status) = self.form.status() {
            let (message, color) = match status {
                Status::Error(message) => (message, RED),
                Status::Info(message) => (message, GREEN),
            };
            draw_text(message, PANEL_GAP, status_y, FONT_SIZE, color);
        }
        if self.form.is_busy() {
            draw_text("Working...", sw - 120.0, status_y, FONT_SIZE, YELLOW);
        }

        draw_text("[Enter] Search   [Del] Remove selected   [Esc] Quit", sw - 460.0, 30.0, 16.0, DARKGRAY);
    }
}
