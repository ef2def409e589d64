/// One language track of the session display: finalized segments plus the
/// in-progress draft the server may still revise.
///
/// `committed` only ever grows by whole-segment append (or is replaced
/// wholesale by a final result); `live` is cleared exactly when its segment
/// is committed or a final result supersedes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptBuffer {
    committed: String,
    live: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live draft wholesale (source-track delta semantics).
    pub fn replace_live(&mut self, text: impl Into<String>) {
        self.live = text.into();
    }

    /// Append a fragment to the live draft (target-track delta semantics).
    pub fn append_live(&mut self, delta: &str) {
        self.live.push_str(delta);
    }

    pub fn clear_live(&mut self) {
        self.live.clear();
    }

    /// Finalize one segment: append it to the committed text and clear the
    /// live draft. Empty or whitespace-only segments are a no-op.
    pub fn commit(&mut self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        if !self.committed.is_empty() {
            self.committed.push('\n');
        }
        self.committed.push_str(segment);
        self.live.clear();
    }

    /// Replace the committed text wholesale (final-result semantics).
    /// A blank replacement keeps the accumulated text.
    pub fn replace_committed(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.committed = text.to_string();
        }
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn live(&self) -> &str {
        &self.live
    }

    /// Committed text followed by the live draft on its own line.
    pub fn display(&self) -> String {
        match (self.committed.is_empty(), self.live.is_empty()) {
            (true, _) => self.live.clone(),
            (false, true) => self.committed.clone(),
            (false, false) => format!("{}\n{}", self.committed, self.live),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_appends_whole_segments() {
        let mut buf = TranscriptBuffer::new();
        buf.commit("segment1");
        buf.commit("segment2");
        assert_eq!(buf.committed(), "segment1\nsegment2");
    }

    #[test]
    fn commit_trims_and_skips_blank_segments() {
        let mut buf = TranscriptBuffer::new();
        buf.commit("  hello  ");
        buf.commit("");
        buf.commit("   \n  ");
        assert_eq!(buf.committed(), "hello");
    }

    #[test]
    fn commit_clears_live() {
        let mut buf = TranscriptBuffer::new();
        buf.replace_live("draft");
        buf.commit("draft");
        assert_eq!(buf.live(), "");
        assert_eq!(buf.committed(), "draft");
    }

    #[test]
    fn blank_commit_leaves_live_untouched() {
        let mut buf = TranscriptBuffer::new();
        buf.replace_live("draft");
        buf.commit("  ");
        assert_eq!(buf.live(), "draft");
    }

    #[test]
    fn replace_live_is_not_concatenation() {
        let mut buf = TranscriptBuffer::new();
        buf.replace_live("first");
        buf.replace_live("second");
        assert_eq!(buf.live(), "second");
    }

    #[test]
    fn append_live_concatenates_in_order() {
        let mut buf = TranscriptBuffer::new();
        buf.append_live("Xin");
        buf.append_live(" chào");
        assert_eq!(buf.live(), "Xin chào");
    }

    #[test]
    fn replace_committed_ignores_blank_text() {
        let mut buf = TranscriptBuffer::new();
        buf.commit("kept");
        buf.replace_committed("  ");
        assert_eq!(buf.committed(), "kept");
        buf.replace_committed("replaced");
        assert_eq!(buf.committed(), "replaced");
    }

    #[test]
    fn display_joins_committed_and_live() {
        let mut buf = TranscriptBuffer::new();
        assert_eq!(buf.display(), "");
        buf.commit("done");
        buf.replace_live("typing");
        assert_eq!(buf.display(), "done\ntyping");
    }
}
