//! Terminal output for the `rowmap` binary

pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, info, log_entry, section, success};
pub use table::rows_table;
pub use theme::{theme, Theme};
