pub mod process;
pub mod snapshot;

pub use process::{ProcessKey, ProcessRecord};
pub use snapshot::{Connectivity, MetricSnapshot, ProcessLabels, ProcessMetric, PROCESS_INFO_LABELS};
