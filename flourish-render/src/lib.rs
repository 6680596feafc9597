//! # flourish-render
//!
//! Renderers for the flourish static site generator.
//!
//! [`BuiltinRenderer`] turns the JSON context built by each generator into
//! one of a handful of Askama templates, enough for a plain blog with
//! pages, indexes and a date archive. [`JsonRenderer`] writes the context
//! itself, which is handy when debugging templates kept elsewhere.

pub mod renderer;
pub mod templates;

pub use renderer::{BuiltinRenderer, JsonRenderer};
pub use templates::{
    ArchiveLink, CalendarTemplate, IndexTemplate, PageEntry, PageTemplate, SiteInfo,
};
