//! Terminal chat interface

pub mod app;
pub mod composer;
pub mod history;

pub use app::{App, AppAction};
pub use composer::{Composer, ComposerResult};
pub use history::Transcript;
