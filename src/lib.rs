// Transaction Insights - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod aggregator;
pub mod errors;
pub mod loader;
pub mod model;
pub mod report;
pub mod settings;

// Re-export commonly used types
pub use aggregator::{TopSender, TransactionAggregator, DEFAULT_TOP_N};
pub use errors::{AggregationError, AggregationResult};
pub use loader::{detect_format, load_csv, load_json, load_transactions, SourceFormat};
pub use model::Transaction;
pub use report::{InsightsReport, ReportOptions};
pub use settings::Settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
