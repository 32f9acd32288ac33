pub use super::metric_types::Entity as MetricTypes;
pub use super::metrics::Entity as Metrics;
pub use super::vaults::Entity as Vaults;
