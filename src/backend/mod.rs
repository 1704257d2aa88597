//! Backend plugin protocol and its implementations.
//!
//! # Architecture
//!
//! - `trait_def`: the [`Backend`] trait and the environment handed to
//!   backend constructors
//! - `registry`: name resolution, dependency ordering and the
//!   single main-file claimant rule
//! - `schema`, `script`, `descriptor`: declarative backends loaded from
//!   YAML, JSON or TOML files
//! - `kivy`, `pyswiftui`, `pyframework`: built-in backends

pub mod descriptor;
pub mod kivy;
pub mod pyframework;
pub mod pyswiftui;
pub mod registry;
pub mod schema;
pub mod script;
pub mod trait_def;

pub use descriptor::DescriptorBackend;
pub use registry::{BackendId, BackendRegistry};
pub use schema::BackendConfig;
pub use script::{ScriptConfig, ShellType};
pub use trait_def::{Backend, BackendEnv};
