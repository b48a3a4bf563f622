pub mod bar;
pub mod error;
pub mod loader;
pub mod market_cap;

pub use bar::{DateRange, Series};
pub use error::IngestError;
pub use loader::{BarSource, CsvDirectorySource};
pub use market_cap::MarketCapTable;
