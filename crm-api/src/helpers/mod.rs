pub mod database;
pub mod format;
pub mod pagination;
