// src/html/chunk.rs

/// Split `text` into consecutive slices of at most `size` characters.
///
/// Slices always end on a `char` boundary. A `size` of 0 is treated as 1.
pub fn chunk_chars(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let size = size.max(1);
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_character_count() {
        let chunks: Vec<_> = chunk_chars("<p>Hello</p>", 5).collect();
        assert_eq!(chunks, vec!["<p>He", "llo</", "p>"]);
    }

    #[test]
    fn never_splits_a_code_point() {
        let chunks: Vec<_> = chunk_chars("§§é€", 3).collect();
        assert_eq!(chunks, vec!["§§é", "€"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(chunk_chars("", 5).count(), 0);
    }
}
