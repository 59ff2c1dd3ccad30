pub mod decks;
pub mod shelves;
pub mod training;

/// Cuts `s` to `max_len` characters, marking the cut with "...".
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
