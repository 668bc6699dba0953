// ==================== Modules ====================
// browser first, its log!/error! macros are used by everything below
#[macro_use]
mod browser;
pub mod assets;
pub mod camera;
pub mod config;
pub mod engine;
pub mod game;
pub mod landscape;
pub mod race;
pub mod skier;
pub mod timer;

use engine::GameLoop;
use game::Skiing;
use wasm_bindgen::prelude::*;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - better panic messages
/// - loads everything, then hands the game to the loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(Skiing::new()).await {
            error!("Could not start the game : {:#?}", err);
        }
    });

    Ok(())
}
