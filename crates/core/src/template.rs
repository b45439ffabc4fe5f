//! `%(version)s`-style templates used for tag names and commit messages.

const VERSION_PLACEHOLDER: &str = "%(version)s";

/// Substitute `version` for every `%(version)s` in `template`.
///
/// Unknown placeholders are left verbatim.
pub fn expand_version(template: &str, version: &str) -> String {
    template.replace(VERSION_PLACEHOLDER, version)
}

/// Make a version usable inside a git ref name.
///
/// Git forbids `~` and `:` in refs; they become `_` and `%`.
pub fn sanitize_version_for_tag(version: &str) -> String {
    version.replace('~', "_").replace(':', "%")
}

/// Tag name for `version` of `component`.
///
/// The component suffix `-<component>` goes on the first path segment of the
/// expanded template (`upstream/%(version)s` → `upstream-doc/1.0`); templates
/// without a `/` get the suffix appended at the end.
pub fn version_to_tag(template: &str, version: &str, component: &str) -> String {
    let tag = expand_version(template, &sanitize_version_for_tag(version));
    if component.is_empty() {
        return tag;
    }
    match tag.split_once('/') {
        Some((head, rest)) => format!("{head}-{component}/{rest}"),
        None => format!("{tag}-{component}"),
    }
}
