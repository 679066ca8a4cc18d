//! Marginalia
//!
//! Collaborative text annotation: character-offset anchoring over rendered
//! markup, highlight composition, comment and suggestion lifecycles, and the
//! content service that persists them.
//!
//! # Modules
//!
//! - `markup`: tokenizer, plain-text offsets and the rendered node tree
//! - `html`: highlight composition with lol_html
//! - `annotations`: anchors, lifecycle rules and offset rebasing
//! - `store`: client-side annotation store driven by a `ContentApi`
//! - `service` / `routes`: the HTTP content service

pub mod annotations;
pub mod client;
pub mod config;
pub mod error;
pub mod html;
pub mod markup;
pub mod routes;
pub mod selection;
pub mod service;
pub mod state;
pub mod store;
