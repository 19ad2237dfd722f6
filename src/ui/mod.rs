pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, section, status, success, summary_row, warn};
pub use table::{fields_table, stats_table, types_table};
pub use theme::{theme, Theme};
