//! Human-readable summary renderer for snapshot diffs.

use std::collections::BTreeSet;

use crate::diff::model::{CollectionDiff, DiffClassification, SnapshotDiff, StaleCause};

/// Render a short Markdown summary of a [`SnapshotDiff`].
///
/// Informational only; sessions log it at `debug` when a transition is
/// re-rendered.
pub fn render_human_summary(diff: &SnapshotDiff) -> String {
    let mut out = String::new();

    out.push_str("## Snapshot Diff\n\n");

    let class_label = match diff.classification {
        DiffClassification::Identical => "Identical",
        DiffClassification::NoObservableChange => "No Observable Change",
        DiffClassification::Changed => "Changed",
    };
    out.push_str(&format!("**Classification**: {class_label}\n\n"));

    if diff.is_no_op() {
        out.push_str("_No observable changes detected._\n");
        return out;
    }

    render_collection(&mut out, "Houses", &diff.houses);
    render_collection(&mut out, "Jedis", &diff.jedis);

    if !diff.stale_relations.is_empty() {
        out.push_str("### Stale Relations\n\n");
        for rel in &diff.stale_relations {
            let cause = match rel.cause {
                StaleCause::Reassigned => "reassigned",
                StaleCause::TargetChanged => "target changed",
            };
            let target = rel.house_id.as_deref().unwrap_or("null");
            out.push_str(&format!(
                "- `{}.{}` -> `{}` ({})\n",
                rel.jedi_id, rel.field, target, cause
            ));
        }
        out.push('\n');
    }

    if !diff.extensions_changed.is_empty() {
        out.push_str(&format!(
            "### Extensions\n\n- **Changed** ({}): {}\n\n",
            diff.extensions_changed.len(),
            join(&diff.extensions_changed)
        ));
    }

    out
}

fn render_collection(out: &mut String, title: &str, diff: &CollectionDiff) {
    if diff.is_empty() {
        return;
    }
    out.push_str(&format!("### {title}\n\n"));
    for (label, ids) in [
        ("Added", &diff.added),
        ("Removed", &diff.removed),
        ("Changed", &diff.changed_ids),
    ] {
        if !ids.is_empty() {
            out.push_str(&format!("- **{label}** ({}): {}\n", ids.len(), join(ids)));
        }
    }
    if diff.reordered {
        out.push_str("- **Ordering changed**\n");
    }
    out.push('\n');
}

fn join(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
