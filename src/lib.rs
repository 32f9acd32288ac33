// src/lib.rs

pub mod entities {
    pub mod prelude;
    pub mod metric_types;
    pub mod metrics;
    pub mod vaults;
}

pub mod services {
    pub mod block_time;
    pub mod chain;
    pub mod collector;
    pub mod metrics_math;
    pub mod orchestrator;
    pub mod report;
    pub mod store;
}

pub mod config;
