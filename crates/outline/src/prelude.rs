use std::path::Path;

pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};
pub use std::format as f;

/// Borderless table with one space of padding, for terminal summaries.
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();
    table.set_format(prettytable::format::FormatBuilder::new().padding(1, 1).build());
    table
}

/// File name shown in reports and cache entries; the full path if there is none.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
