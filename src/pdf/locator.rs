//! Global page → (document, local page) mapping

use super::types::PageLocation;

/// Map a 1-based global page to its owning document and 1-based local page.
///
/// Out-of-range input is clamped into `[1, total_pages]`. With no pages at all
/// the result degenerates to document 0, page 1.
#[must_use]
pub fn locate(global_page: usize, offsets: &[usize], total_pages: usize) -> PageLocation {
    if total_pages == 0 || offsets.is_empty() {
        return PageLocation::new(0, 1);
    }

    let zero_based = global_page.clamp(1, total_pages) - 1;

    // Greatest index whose offset is <= zero_based. Empty documents share an
    // offset with their successor and are skipped by taking the last match.
    let doc_index = offsets
        .partition_point(|&start| start <= zero_based)
        .saturating_sub(1);

    PageLocation::new(doc_index, zero_based - offsets[doc_index] + 1)
}
