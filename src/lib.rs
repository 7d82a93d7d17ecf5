pub mod error;
pub mod extract;
pub mod geodesy;
pub mod load;
pub mod pipeline;
pub mod report;
pub mod structs;
pub mod transform;

// Re-export public API
pub use error::{PipelineError, Result};
pub use extract::{SourceTables, load_sources};
pub use geodesy::GeodesicDistance;
pub use load::{SqliteSink, TableSink, write_csv, write_json, write_parquet};
pub use pipeline::{RunSummary, execute, run_pipeline};
pub use report::{ChartRenderer, ChartSeries, Reports, TextChartRenderer};
pub use structs::{ConnectionDescriptor, InputPaths, PipelineConfig, SimpleLogger};
pub use transform::{EnrichedTables, enrich};
