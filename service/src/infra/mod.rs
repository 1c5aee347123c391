//! Infrastructure layer.

pub mod database;
pub mod notifier;

pub use self::{
    database::{Database, Memory},
    notifier::Notifier,
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
