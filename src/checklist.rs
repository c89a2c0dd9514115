use std::collections::HashSet;

/// Carry forward the checklist entries that still concern the current
/// change set.
///
/// An entry of the form `"path: message"` is dropped when `path` is no
/// longer a target. Entries without a `:` label (or with an empty one) are
/// kept. With no targets at all nothing survives. Retained entries keep
/// their order and text.
pub fn reconcile(previous: &[String], current_targets: &[String]) -> Vec<String> {
    if current_targets.is_empty() {
        return Vec::new();
    }

    let targets: HashSet<&str> = current_targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    previous
        .iter()
        .filter(|entry| match entry.split_once(':') {
            Some((label, _)) => {
                let label = label.trim();
                targets.is_empty() || label.is_empty() || targets.contains(label)
            }
            None => true,
        })
        .cloned()
        .collect()
}
