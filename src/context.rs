//! Context formatting for the downstream generation step

use crate::index::RetrievalHit;

/// Render hits into one context block, in the order given
///
/// Each chunk is preceded by a header carrying its rank, source file and
/// category so the answer can cite it. Nothing is dropped, merged or
/// reordered.
pub fn format_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] Source: {} | Mission: {} | Score: {:.4}\n{}",
                i + 1,
                hit.record.source,
                hit.record.category,
                hit.score,
                hit.record.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
