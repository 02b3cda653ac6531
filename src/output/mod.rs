//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Stream and sync reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_banner, print_config_summary, print_error, print_info, print_success, print_warning,
};
pub use progress::{create_download_bar, create_item_bar};
pub use stats::{
    describe_cursor, describe_item, print_advance, print_pending, print_reconciliation,
    print_stream_details, print_stream_row, print_sync_report,
};
