//! Browser only: run with `wasm-pack test --headless --firefox`
#![cfg(target_arch = "wasm32")]

use skiing::assets::Assets;
use skiing::config::{Settings, WorldConfigBuilder};
use skiing::engine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
async fn missing_image_fails_to_load() {
    assert!(engine::load_image("no-such-image.png").await.is_err());
}

#[wasm_bindgen_test]
async fn failed_preload_caches_nothing() {
    let mut assets = Assets::new();
    assert!(assets.load_images(&["no-such-sprite"]).await.is_err());
    assert!(assets.image("no-such-sprite").is_err());
}

#[wasm_bindgen_test]
fn sounds_can_be_created_before_they_exist() {
    let mut assets = Assets::new();
    assert!(assets.sound("crash").is_ok());
    assert!(assets.sound("crash").is_ok());
}

#[wasm_bindgen_test]
async fn refused_playback_is_reported() {
    let mut assets = Assets::new();
    let missing = assets.sound("no-such-sound").unwrap();
    assert!(missing.start().await.is_err());
}

#[wasm_bindgen_test]
fn settings_override_the_slalom_preset() {
    let value = js_sys::JSON::parse(r#"{ "world": { "flag_pairs": 5 }, "players": 2 }"#).unwrap();
    let settings: Settings = serde_wasm_bindgen::from_value(value).unwrap();

    assert_eq!(settings.players, 2);
    assert_eq!(settings.world, WorldConfigBuilder::slalom().set_flag_pairs(5));
}

#[wasm_bindgen_test]
fn empty_settings_are_the_defaults() {
    let value = js_sys::JSON::parse("{}").unwrap();
    let settings: Settings = serde_wasm_bindgen::from_value(value).unwrap();
    assert_eq!(settings, Settings::default());
}
