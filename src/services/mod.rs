pub mod export;
pub mod filter_engine;
pub mod layout;
pub mod pagination;

pub use export::{ExportFormat, ExportSink, Exporter, JsonExporter, TextExporter};
pub use filter_engine::{FilterMemo, FilterOptions};
pub use layout::{LayoutConfig, LayoutEngine, MonospaceMetrics, RenderedDocument, TextMetrics};
pub use pagination::PageSlice;
