//! Images, sounds and fonts under `assets/`, looked up by bare name and
//! loaded once.
use crate::browser;
use crate::engine::{self, Image};
use anyhow::{anyhow, Context, Result};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use wasm_bindgen_futures::JsFuture;
use web_sys::{FontFace, HtmlAudioElement};

const FOLDER: &str = "assets";

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AssetKind {
    Image,
    Sound,
    Font,
}

impl AssetKind {
    fn folder(&self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::Sound => "sounds",
            AssetKind::Font => "fonts",
        }
    }

    fn default_extension(&self) -> &'static str {
        match self {
            AssetKind::Image => "png",
            AssetKind::Sound => "ogg",
            AssetKind::Font => "ttf",
        }
    }

    /// "tree" -> "tree.png", names that already carry an extension are kept
    pub fn file_name(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{}", name, self.default_extension())
        }
    }

    pub fn path(&self, name: &str) -> String {
        format!("{}/{}/{}", FOLDER, self.folder(), self.file_name(name))
    }
}

/// CSS font shorthand for the canvas, the face itself is registered by
/// `Assets::load_font`
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    family: String,
    size: u32,
}

impl Font {
    pub fn css(&self) -> String {
        format!("{}px {}", self.size, self.family)
    }
}

#[derive(Debug, Clone)]
pub struct Sound {
    element: HtmlAudioElement,
}

impl Sound {
    /// Restart from the beginning, a sound that can't play is only logged
    pub fn play(&self) {
        let sound = self.clone();
        browser::spawn_local(async move {
            if let Err(err) = sound.start().await {
                error!("{:#}", err);
            }
        });
    }

    /// Rewind and play, resolving once the browser has accepted or refused.
    /// Refusals (autoplay policy, unsupported format) reject the promise
    /// `play()` returns rather than throwing.
    pub async fn start(&self) -> Result<()> {
        self.element.set_current_time(0.0);
        let playing = self
            .element
            .play()
            .map_err(|err| anyhow!("Could not play {} : {:#?}", self.element.src(), err))?;
        JsFuture::from(playing)
            .await
            .map_err(|err| anyhow!("Could not play {} : {:#?}", self.element.src(), err))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Assets {
    images: HashMap<String, Image>,
    sounds: HashMap<String, Sound>,
    fonts: HashSet<String>,
}

impl Assets {
    pub fn new() -> Self {
        Assets::default()
    }

    /// Already loaded image, see `load_images`
    pub fn image(&self, name: &str) -> Result<&Image> {
        self.images
            .get(&AssetKind::Image.file_name(name))
            .ok_or_else(|| anyhow!("Image '{}' was never loaded", name))
    }

    /// Load every image not cached yet, all at once
    pub async fn load_images(&mut self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .map(|name| AssetKind::Image.file_name(name))
            .filter(|file| !self.images.contains_key(file))
            .collect();

        let elements = try_join_all(missing.iter().map(|file| async move {
            let path = AssetKind::Image.path(file);
            engine::load_image(&path)
                .await
                .with_context(|| format!("Failed to load image from : {}", path))
        }))
        .await?;

        for (file, element) in missing.into_iter().zip(elements) {
            self.images.insert(file, Image::new(element));
        }
        Ok(())
    }

    pub fn sound(&mut self, name: &str) -> Result<Sound> {
        let file = AssetKind::Sound.file_name(name);
        if let Some(sound) = self.sounds.get(&file) {
            return Ok(sound.clone());
        }

        let sound = Sound {
            element: browser::create_audio_element(&AssetKind::Sound.path(&file))?,
        };
        self.sounds.insert(file, sound.clone());
        Ok(sound)
    }

    /// Register `assets/fonts/<name>.ttf` under the family `name`
    pub async fn load_font(&mut self, name: &str) -> Result<()> {
        if self.fonts.contains(name) {
            return Ok(());
        }

        let source = format!("url({})", AssetKind::Font.path(name));
        let face = FontFace::new_with_str(name, &source)
            .map_err(|err| anyhow!("Could not create font face {} : {:#?}", name, err))?;
        let loading = face
            .load()
            .map_err(|err| anyhow!("Could not start loading font {} : {:#?}", name, err))?;
        JsFuture::from(loading)
            .await
            .map_err(|err| anyhow!("Failed to load font {} : {:#?}", name, err))?;
        browser::document()?
            .fonts()
            .add(&face)
            .map_err(|err| anyhow!("Could not register font {} : {:#?}", name, err))?;

        self.fonts.insert(name.to_string());
        Ok(())
    }

    pub fn font(&self, name: &str, size: u32) -> Font {
        Font {
            family: name.to_string(),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_get_the_default_extension() {
        assert_eq!(AssetKind::Image.path("tree"), "assets/images/tree.png");
        assert_eq!(AssetKind::Sound.path("crash"), "assets/sounds/crash.ogg");
        assert_eq!(AssetKind::Font.path("Pixeboy"), "assets/fonts/Pixeboy.ttf");
    }

    #[test]
    fn explicit_extensions_are_kept() {
        assert_eq!(AssetKind::Image.path("flag.gif"), "assets/images/flag.gif");
        assert_eq!(AssetKind::Sound.file_name("gate.wav"), "gate.wav");
    }

    #[test]
    fn fonts_are_css_shorthand() {
        let assets = Assets::new();
        assert_eq!(assets.font("Pixeboy", 48).css(), "48px Pixeboy");
    }

    #[test]
    fn unloaded_image_is_an_error() {
        let assets = Assets::new();
        assert!(assets.image("tree").is_err());
    }
}
