// Library exports for chartbind

pub mod aesthetic;
pub mod binding;
pub mod chart_type;
pub mod comparison;
pub mod config;
pub mod error;
pub mod field;
pub mod frame;
pub mod grouping;
pub mod inference;
pub mod parser;
pub mod preprocessor;
pub mod runtime;
pub mod schema;
pub mod telemetry;

// Runtime model
pub mod ir;
pub mod resolve;

pub use binding::ChartBinding;
pub use chart_type::ChartType;
pub use comparison::spec::DateComparisonSpec;
pub use config::EngineConfig;
pub use error::{BindingError, ChartResult};
pub use grouping::{group_fields, FieldGroups};
pub use ir::RuntimeSnapshot;
pub use runtime::{run_cycle, CycleContext, SharedBinding};
