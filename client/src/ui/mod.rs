mod screens;
pub mod layout;
pub mod scroll;

pub use screens::{InventoryScreen, Screen, ScreenState};
pub use layout::{UiElement, UiElementId, UiLayout};
pub use scroll::{draw_scrollbar, wheel_rows, ListScroll};
