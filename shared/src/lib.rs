//! Shared core of the pharmacy profile editor.
//!
//! The editor is a Crux [`App`]: platform shells send [`Event`]s into a
//! `crux_core::Core`, perform the [`Effect`]s it returns (storage, device
//! location, geocoding, image decoding, confirmation dialogs) and draw the
//! [`ViewModel`]. [`shell::SimulatedShell`] is an in-process shell backed by
//! simulated services.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod coordinates;
pub mod editor;
pub mod error;
pub mod event;
pub mod image_processing;
pub mod model;
pub mod multiselect;
pub mod shell;
pub mod validation;
pub mod view;

pub use app::{App, RESET_CONFIRMATION_MESSAGE};
pub use capabilities::{Capabilities, Effect, SaveKind};
pub use config::{ConfigError, EditorConfig};
pub use crux_core::{render::Render, App as CruxApp, Core};
pub use editor::ProfileEditor;
pub use error::{EditorError, EditorResult, ErrorKind};
pub use event::{Event, FieldEdit, MultiSelectField};
pub use model::{GeoPoint, ProfileSnapshot, SaveMetadata, UnixTimeMs};
pub use multiselect::MultiSelectFieldController;
pub use shell::{Services, SimulatedShell};
pub use validation::{validate, ErrorMap, FieldKey};
pub use view::ViewModel;
