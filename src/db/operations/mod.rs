pub mod catalog;
pub mod progress;

pub use catalog::PgItemCatalog;
pub use progress::PgProgressStore;
