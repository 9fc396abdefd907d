pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, phase, section, success, summary_row, timing, warn};
pub use progress::{ImportProgress, Spinner};
pub use progress_message::ProgressMessage;
pub use table::{SockTableRow, TableBuilder, socks_table, stats_table};
pub use theme::{theme, Theme};
