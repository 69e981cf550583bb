/// Upstream response bodies are cut to this many characters before being reported.
pub const MAX_BODY_LEN: usize = 512;

/// Cut a response body to [`MAX_BODY_LEN`] characters, for logging and error messages.
pub fn truncate_body(mut body: String) -> String {
    if let Some((idx, _)) = body.char_indices().nth(MAX_BODY_LEN) {
        body.truncate(idx);
        body.push('…');
    }
    body
}
