//! Page range selectors for tool parameters

use crate::error::{Error, Result};

/// Resolve a page range selector to an ordered list of 1-indexed pages.
///
/// Accepted forms: `None` or `"all"` (every page), `"first"`, `"last"`,
/// a single page number (`"3"`), or a span (`"2-7"`, `"4-"`, `"-5"`).
/// Open span ends default to the first and last page; a span end past the
/// document is clamped to `total`. A document with zero pages resolves to
/// an empty list for any selector.
pub fn resolve_page_range(range: Option<&str>, total: u32) -> Result<Vec<u32>> {
    if total == 0 {
        return Ok(Vec::new());
    }

    let range = match range.map(str::trim) {
        None | Some("") => return Ok((1..=total).collect()),
        Some(r) => r,
    };

    match range.to_ascii_lowercase().as_str() {
        "all" => return Ok((1..=total).collect()),
        "first" => return Ok(vec![1]),
        "last" => return Ok(vec![total]),
        _ => {}
    }

    let invalid = || Error::InvalidPageRange {
        range: range.to_string(),
    };

    if let Some((start, end)) = range.split_once('-') {
        let start = match start.trim() {
            "" => 1,
            s => s.parse::<u32>().map_err(|_| invalid())?,
        };
        let end = match end.trim() {
            "" => total,
            e => e.parse::<u32>().map_err(|_| invalid())?,
        };

        if start < 1 || start > end {
            return Err(invalid());
        }

        let end = end.min(total);
        if start > end {
            return Err(Error::PageOutOfBounds { page: start, total });
        }

        return Ok((start..=end).collect());
    }

    let page: u32 = range.parse().map_err(|_| invalid())?;
    if page < 1 || page > total {
        return Err(Error::PageOutOfBounds { page, total });
    }

    Ok(vec![page])
}
