// Composition root shared by the desktop binary

use std::sync::Arc;

use macroquad::prelude::*;

use crate::api::{ApiClient, InventoryService};
use crate::config::ClientConfig;
use crate::form::InventoryForm;
use crate::ui::{InventoryScreen, Screen, ScreenState};

pub fn window_conf() -> Conf {
    Conf {
        window_title: "Inventory Editor".to_string(),
        window_width: 1280,
        window_height: 720,
        fullscreen: false,
        ..Default::default()
    }
}

/// Build the shared HTTP client and the form around it.
pub fn build_form(config: &ClientConfig) -> InventoryForm {
    let client = ApiClient::from_config(config);
    log::info!("Using inventory service at {}", client.base_url());
    let service: Arc<dyn InventoryService> = Arc::new(client);
    InventoryForm::new(service)
}

/// Run the editor until the operator quits.
pub async fn run(config: ClientConfig) {
    let mut screen = InventoryScreen::new(build_form(&config));
    screen.activate();

    loop {
        if let ScreenState::Quit = screen.update() {
            log::info!("Quit requested");
            break;
        }
        screen.render();
        next_frame().await;
    }
}
