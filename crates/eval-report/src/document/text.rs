//! Text layout helpers.

/// Greedy word wrap: a word joins the current line if the line stays within
/// `width` characters, otherwise it starts a new line. Words longer than
/// `width` get a line of their own.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len + 1 + word_len <= width {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cut `text` to at most `limit` characters, ending in "..." when cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Scale `(width, height)` to fit inside `(max_width, max_height)`, keeping
/// the aspect ratio. Degenerate sizes fall back to a 4:3 box.
pub fn fit_image(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width == 0 || height == 0 {
        let w = max_width.min(max_height * 4.0 / 3.0);
        return (w, w * 0.75);
    }
    let scale = (max_width / width as f32).min(max_height / height as f32);
    (width as f32 * scale, height as f32 * scale)
}
