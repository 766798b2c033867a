pub mod format;
pub mod pptx;
pub mod table;
pub mod xlsx;

pub use pptx::{ChartSource, Deck, DeckBuilder, PngChart};
pub use table::{Cell, ReportTable, TableRow};
pub use xlsx::write_workbook;
