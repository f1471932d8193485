//! # Key Resolver: Workspace to Object Path Mapping
//!
//! Maps a workspace name onto the physical object path of its state, and
//! maps listed object paths back onto workspace names.
//!
//! ## Layout
//!
//! ```text
//! default workspace:   <base_key>
//! named workspace:     <prefix>/<workspace>/<base_key>
//! empty prefix:        <workspace>/<base_key>
//! ```
//!
//! ## Segment Anchoring
//!
//! The inverse mapping works on path segments, never on raw substrings. A
//! path identifies a workspace only if it is exactly `<prefix>/`, one
//! non-empty segment, and `/<base_key>`. With prefix `env`, the path
//! `env/env-1/state` belongs to `env-1`; `env-1/state`, `env/error`, and
//! `env/s2/other/state` belong to nobody.

use serde::{Deserialize, Serialize};

use crate::identity::{WorkspaceName, DEFAULT_WORKSPACE};

const SEPARATOR: char = '/';

/// Resolve the physical object path for `workspace`.
///
/// The default workspace is never prefixed. Trailing separators on `prefix`
/// and leading separators on `base_key` are collapsed so the result never
/// contains an empty segment at the joins.
pub fn resolve(workspace: &str, base_key: &str, prefix: &str) -> String {
    if workspace == DEFAULT_WORKSPACE {
        return base_key.to_string();
    }
    let prefix = prefix.trim_end_matches(SEPARATOR);
    let base_key = base_key.trim_start_matches(SEPARATOR);
    if prefix.is_empty() {
        format!("{workspace}/{base_key}")
    } else {
        format!("{prefix}/{workspace}/{base_key}")
    }
}

/// Identify which workspace owns `path`, if any.
///
/// Returns `Some("default")` for the base key itself, `Some(name)` for a
/// segment-anchored match under the prefix, and `None` otherwise.
pub fn identify(path: &str, base_key: &str, prefix: &str) -> Option<String> {
    if path == base_key {
        return Some(DEFAULT_WORKSPACE.to_string());
    }
    let rest = path.strip_prefix(listing_prefix(prefix).as_str())?;
    let key_suffix = format!("{SEPARATOR}{}", base_key.trim_start_matches(SEPARATOR));
    let name = rest.strip_suffix(key_suffix.as_str())?;
    // "default" under the prefix would alias the unprefixed workspace.
    if name.trim().is_empty() || name.contains(SEPARATOR) || name == DEFAULT_WORKSPACE {
        return None;
    }
    Some(name.to_string())
}

/// The path prefix under which every named workspace lives. Trailing
/// separators collapse to one, matching [`resolve`].
fn listing_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}{SEPARATOR}")
    }
}

/// A configured base key and workspace prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyLayout {
    base_key: String,
    prefix: String,
}

impl KeyLayout {
    /// Bundle a base key with a workspace prefix.
    pub fn new(base_key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base_key: base_key.into(),
            prefix: prefix.into(),
        }
    }

    /// The logical key of the default workspace.
    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    /// The configured workspace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The physical path of `workspace`'s state object.
    pub fn path_for(&self, workspace: &WorkspaceName) -> String {
        let path = resolve(workspace.as_str(), &self.base_key, &self.prefix);
        debug_assert_eq!(
            self.workspace_for(&path).as_deref(),
            Some(workspace.as_str()),
            "key resolver produced a path it cannot identify"
        );
        path
    }

    /// The workspace owning `path`, if any.
    pub fn workspace_for(&self, path: &str) -> Option<String> {
        identify(path, &self.base_key, &self.prefix)
    }

    /// The prefix to list when enumerating named workspaces.
    ///
    /// Empty when the workspace prefix is empty, in which case the whole
    /// bucket has to be listed.
    pub fn workspace_listing_prefix(&self) -> String {
        listing_prefix(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_is_never_prefixed() {
        assert_eq!(resolve("default", "test/state", "env:"), "test/state");
        assert_eq!(resolve("default", "test/state", ""), "test/state");
        assert_eq!(resolve("default", "test/state", "project/env:"), "test/state");
    }

    #[test]
    fn named_workspace_is_prefixed() {
        assert_eq!(resolve("s1", "test/state", "env:"), "env:/s1/test/state");
    }

    #[test]
    fn empty_prefix_contributes_no_segment() {
        assert_eq!(resolve("ws1", "some/paths/tfstate", ""), "ws1/some/paths/tfstate");
    }

    #[test]
    fn trailing_prefix_separator_collapses() {
        assert_eq!(resolve("s1", "k", "env/"), "env/s1/k");
        assert_eq!(identify("env/s1/k", "k", "env/"), Some("s1".to_string()));
    }

    #[test]
    fn repeated_prefix_separators_collapse() {
        assert_eq!(resolve("w", "k", "env//"), "env/w/k");
        assert_eq!(identify("env/w/k", "k", "env//"), Some("w".to_string()));
        assert_eq!(identify("env//w/k", "k", "env//"), None);
        let layout = KeyLayout::new("k", "env//");
        assert_eq!(layout.path_for(&WorkspaceName::new("w").unwrap()), "env/w/k");
        assert_eq!(layout.workspace_listing_prefix(), "env/");
        assert_eq!(KeyLayout::new("k", "/").workspace_listing_prefix(), "");
    }

    #[test]
    fn blank_workspace_segment_is_not_a_workspace() {
        assert_eq!(identify("env:/ /test/state", "test/state", "env:"), None);
        assert_eq!(identify("env:/\t/test/state", "test/state", "env:"), None);
    }

    #[test]
    fn identify_base_key_is_default() {
        assert_eq!(
            identify("test/state", "test/state", "env:"),
            Some("default".to_string())
        );
    }

    #[test]
    fn identify_multi_segment_prefix() {
        let key = "some/paths/tfstate";
        assert_eq!(
            identify("project/env:/ws1/some/paths/tfstate", key, "project/env:"),
            Some("ws1".to_string())
        );
        assert_eq!(
            identify("project/env:/ws2/some/paths/tfstate", key, "project/env:"),
            Some("ws2".to_string())
        );
        assert_eq!(
            identify("env:/ws3/some/paths/tfstate", key, "env:"),
            Some("ws3".to_string())
        );
    }

    #[test]
    fn identify_empty_prefix() {
        let key = "some/paths/tfstate";
        assert_eq!(identify("ws1/some/paths/tfstate", key, ""), Some("ws1".to_string()));
        assert_eq!(identify("a/b/some/paths/tfstate", key, ""), None);
    }

    #[test]
    fn prefix_as_workspace_substring() {
        let path = resolve("env-1", "test-env.tfstate", "env");
        assert_eq!(path, "env/env-1/test-env.tfstate");
        assert_eq!(
            identify(&path, "test-env.tfstate", "env"),
            Some("env-1".to_string())
        );
        // Shares a string prefix with "env" but not a segment boundary.
        assert_eq!(identify("env-1/test-env.tfstate", "test-env.tfstate", "env"), None);
    }

    #[test]
    fn workspace_named_like_prefix() {
        let path = resolve("env", "state", "env");
        assert_eq!(path, "env/env/state");
        assert_eq!(identify(&path, "state", "env"), Some("env".to_string()));
        // The prefix followed by no workspace segment is an artifact.
        assert_eq!(identify("env/state", "state", "env"), None);
    }

    #[test]
    fn junk_paths_are_rejected() {
        let key = "test/state/tfstate";
        assert_eq!(identify("env:/error", key, "env:"), None);
        assert_eq!(identify("env:/s2/notTestState", key, "env:"), None);
        assert_eq!(identify("env:/s2/", key, "env:"), None);
        assert_eq!(identify("env://test/state/tfstate", key, "env:"), None);
        assert_eq!(identify("env:/s2/test/state/tfstate/extra", key, "env:"), None);
        assert_eq!(identify("env:/a/b/test/state/tfstate", key, "env:"), None);
        assert_eq!(identify("other/s2/test/state/tfstate", key, "env:"), None);
    }

    #[test]
    fn prefixed_default_is_rejected() {
        assert_eq!(identify("env:/default/k", "k", "env:"), None);
    }

    #[test]
    fn layout_listing_prefix() {
        assert_eq!(KeyLayout::new("k", "env:").workspace_listing_prefix(), "env:/");
        assert_eq!(KeyLayout::new("k", "").workspace_listing_prefix(), "");
        assert_eq!(
            KeyLayout::new("k", "project/env:").workspace_listing_prefix(),
            "project/env:/"
        );
    }

    #[test]
    fn layout_path_for() {
        let layout = KeyLayout::new("test/state", "env:");
        let s1 = WorkspaceName::new("s1").unwrap();
        assert_eq!(layout.path_for(&s1), "env:/s1/test/state");
        assert_eq!(
            layout.path_for(&WorkspaceName::default_workspace()),
            "test/state"
        );
    }

    proptest! {
        #[test]
        fn identify_inverts_resolve(
            workspace in "[A-Za-z0-9_.:-]{1,16}",
            prefix in "([a-z:]{1,6}(/[a-z:]{1,6})?/{0,2})?",
            base_key in "[a-z]{1,8}(/[a-z.]{1,8}){0,2}",
        ) {
            prop_assume!(workspace != DEFAULT_WORKSPACE);
            let path = resolve(&workspace, &base_key, &prefix);
            prop_assert_eq!(identify(&path, &base_key, &prefix), Some(workspace));
        }

        #[test]
        fn default_resolves_to_base_key(
            prefix in "[a-z:/]{0,12}",
            base_key in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        ) {
            prop_assert_eq!(resolve(DEFAULT_WORKSPACE, &base_key, &prefix), base_key);
        }

        #[test]
        fn extra_trailing_segments_never_match(
            workspace in "[a-z0-9-]{1,12}",
            extra in "[a-z]{1,8}",
        ) {
            let path = format!("{}/{extra}", resolve(&workspace, "test/state", "env:"));
            prop_assert_eq!(identify(&path, "test/state", "env:"), None);
        }
    }
}
