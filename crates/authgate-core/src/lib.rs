//! authgate-core
//!
//! Pure pieces of the guard: loading `guard.toml`, role checks, and the
//! render/redirect decision for guarded views. Nothing in here performs I/O
//! besides reading and writing the config file.

#![forbid(unsafe_code)]

pub mod config;
pub mod gate;
pub mod roles;

pub use config::{
    apply_env, apply_overrides, default_config_dir, load_config_from_dir, load_config_from_file,
    parse_config, validate_config, write_default_config_file,
};
pub use gate::{
    Access, BackendCheck, BlockReason, GateInput, GateOutcome, Navigation, check_access, decide,
    local_access, resolve,
};
pub use roles::{RoleQuery, has_role};
