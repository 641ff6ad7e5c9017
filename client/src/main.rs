use inventory_client::app::{self, window_conf};
use inventory_client::ClientConfig;

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        if let Some(location) = panic_info.location() {
            eprintln!("  at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let config = ClientConfig::load();
    app::run(config).await;
}
