//! Host sort-order strings.
//!
//! The host passes an SQL-like `"<column> [ASC|DESC]"` string. Only the three
//! columns below are understood; anything else sorts by name ascending.

use bridge_traits::SortOrder;

pub const COLUMN_DISPLAY_NAME: &str = "_display_name";
pub const COLUMN_LAST_MODIFIED: &str = "last_modified";
pub const COLUMN_SIZE: &str = "_size";

pub fn parse_sort_order(raw: Option<&str>) -> SortOrder {
    let Some(raw) = raw else {
        return SortOrder::default();
    };

    let mut parts = raw.split_whitespace();
    let column = parts.next().unwrap_or_default();
    let descending = match parts.next() {
        None => false,
        Some(direction) if direction.eq_ignore_ascii_case("asc") => false,
        Some(direction) if direction.eq_ignore_ascii_case("desc") => true,
        Some(_) => return SortOrder::default(),
    };
    if parts.next().is_some() {
        return SortOrder::default();
    }

    match (column, descending) {
        (COLUMN_DISPLAY_NAME, false) => SortOrder::NameAsc,
        (COLUMN_DISPLAY_NAME, true) => SortOrder::NameDesc,
        (COLUMN_LAST_MODIFIED, false) => SortOrder::ModifiedAsc,
        (COLUMN_LAST_MODIFIED, true) => SortOrder::ModifiedDesc,
        (COLUMN_SIZE, false) => SortOrder::SizeAsc,
        (COLUMN_SIZE, true) => SortOrder::SizeDesc,
        _ => SortOrder::default(),
    }
}
