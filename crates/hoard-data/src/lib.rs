//! File-based content and configuration loading for hoard economies.
//!
//! A content directory holds `resources.{ron,toml,json}` (required),
//! `recipes.*` and `economy.*` (both optional). See [`load_game_data`].

pub mod loader;

pub use loader::{DataLoadError, GameData, load_game_data};
