//! Page windows over the active set

use crate::proxy::models::{Page, PageItem, SharedRecord};
use std::sync::Arc;

/// Page sizes offered to the user
pub const PAGE_SIZES: [usize; 4] = [20, 50, 100, 200];

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Number of pages needed for `total_items`; zero for an empty set
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1))
}

/// Clamp a requested page number into `1..=total_pages`
pub fn clamp_page(page_number: usize, total_pages: usize) -> usize {
    page_number.clamp(1, total_pages.max(1))
}

/// Slice one page out of `active`; out-of-range page numbers are clamped
pub fn paginate(active: &[SharedRecord], page_number: usize, page_size: usize) -> Page {
    let page_size = page_size.max(1);
    let total_items = active.len();
    let total_pages = total_pages(total_items, page_size);
    let page_number = clamp_page(page_number, total_pages);

    let start = ((page_number - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);

    let items = active[start..end]
        .iter()
        .enumerate()
        .map(|(offset, record)| PageItem {
            index: start + offset,
            record: Arc::clone(record),
        })
        .collect();

    Page {
        items,
        page_number,
        page_size,
        total_items,
        total_pages,
    }
}

/// Next or previous entry of `PAGE_SIZES`, staying at the ends
///
/// A size above the largest entry only ever steps down.
pub fn step_page_size(current: usize, larger: bool) -> usize {
    let largest = PAGE_SIZES[PAGE_SIZES.len() - 1];
    if current > largest {
        return if larger { current } else { largest };
    }

    let pos = PAGE_SIZES
        .iter()
        .position(|s| *s >= current)
        .unwrap_or(PAGE_SIZES.len() - 1);

    if larger {
        let pos = if PAGE_SIZES[pos] > current { pos } else { pos + 1 };
        PAGE_SIZES[pos.min(PAGE_SIZES.len() - 1)]
    } else {
        PAGE_SIZES[pos.saturating_sub(1)]
    }
}
