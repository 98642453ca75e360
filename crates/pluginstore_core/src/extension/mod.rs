//! Extension declaration model.
//!
//! Declarations are plain data plus deferred loaders. Nothing in this module
//! runs plugin code; loaders only execute when the resolver awaits them.

pub mod deferred;
pub mod flags;
pub mod kind;
pub mod model;
pub mod validate;
