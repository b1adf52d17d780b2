use crate::episodes::PlaybackCursor;
use crate::models::MediaKind;

/// True for external ids of the form `tt` followed by one or more digits.
pub fn is_imdb_id(input: &str) -> bool {
    input
        .strip_prefix("tt")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Embed URL handed to the external player iframe.
///
/// The external id wins when it is well formed, otherwise the catalog id is
/// used. Only `tv` URLs carry the cursor.
pub fn embed_url(
    host: &str,
    id: i64,
    kind: MediaKind,
    external_id: Option<&str>,
    cursor: PlaybackCursor,
) -> String {
    let host = host.trim_end_matches('/');
    let target = match external_id.map(str::trim).filter(|e| is_imdb_id(e)) {
        Some(ext) => ext.to_string(),
        None => id.to_string(),
    };
    match kind {
        MediaKind::Movie => format!("{host}/embed/movie/{target}"),
        MediaKind::Tv => format!(
            "{host}/embed/tv/{target}/{}/{}",
            cursor.season, cursor.episode
        ),
    }
}
