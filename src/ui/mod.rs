pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, proverb_line, proverbs, success, timing, warn};
pub use progress::Spinner;
pub use table::{stats_table, tag_table, TableBuilder};
pub use theme::{theme, Theme};
