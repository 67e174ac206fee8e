#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so existing imports like
//! `use crate::db::models::*;` continue to work.

pub mod activity;
pub mod assignment;
pub mod client;
pub mod notification;
pub mod reservation;
pub mod slot;
pub mod stand;
pub mod week;

// Re-export all types at the `crate::db::models` namespace.
pub use self::activity::*;
pub use self::assignment::*;
pub use self::client::*;
pub use self::notification::*;
pub use self::reservation::*;
pub use self::slot::*;
pub use self::stand::*;
pub use self::week::*;
