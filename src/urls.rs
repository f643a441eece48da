use tracing::warn;

pub const PLACEHOLDER_SEGMENT: &str = "/0/";

/// Substitutes the first `/0/` path segment of `template` with `id`.
///
/// Templates without the placeholder are returned unchanged.
pub fn resolve_url(template: &str, id: &str) -> String {
    match template.split_once(PLACEHOLDER_SEGMENT) {
        Some((before, after)) => format!("{before}/{id}/{after}"),
        None => {
            warn!(template, "url template has no placeholder segment");
            template.to_string()
        }
    }
}
