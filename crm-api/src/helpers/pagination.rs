/// Page size used when a list request omits `limit` or sends zero
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}

/// Slice an already filtered list.
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Page<T> {
    let total = items.len();
    let offset = offset.unwrap_or(0);
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE);

    let items: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    let has_more = offset.saturating_add(limit) < total;

    Page {
        items,
        total,
        has_more,
    }
}

/// Lower-cased, trimmed search term; `None` when blank.
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Case-insensitive substring match of `needle` (already lower-cased) in any field.
pub fn matches_any(needle: &str, fields: &[Option<&str>]) -> bool {
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}
