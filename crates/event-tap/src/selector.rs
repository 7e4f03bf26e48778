//! Compact descriptor strings for instrumented targets.

use eavesdrop_event_host::{EventTarget, TargetKind};
use smallvec::SmallVec;

/// Descriptor used for targets that are not element-like, or whose element
/// carries no usable metadata beyond its tag.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Derives the descriptor recorded for `target`.
///
/// Elements resolve with fixed precedence: `tag#id` when an id is present,
/// otherwise `tag.class1.class2` from the first two class tokens, otherwise
/// the bare tag name. Documents and global scopes resolve to the sentinel,
/// as does an element with an empty tag.
pub fn describe(target: &EventTarget) -> String {
    let info = match target.kind() {
        TargetKind::Element(info) => info,
        _ => return UNKNOWN_TARGET.to_string(),
    };

    let tag = info.tag.trim().to_lowercase();
    if tag.is_empty() {
        return UNKNOWN_TARGET.to_string();
    }

    if let Some(id) = info.attribute("id") {
        if !id.is_empty() {
            return format!("{tag}#{id}");
        }
    }

    if let Some(classes) = info.attribute("class") {
        let picked: SmallVec<[&str; 2]> = classes.split_whitespace().take(2).collect();
        if !picked.is_empty() {
            return format!("{tag}.{}", picked.join("."));
        }
    }

    tag
}
