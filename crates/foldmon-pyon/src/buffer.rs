//! Synchronized accumulator for received protocol text.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::frame::{find_frame, Frame, HEADER};

/// Append-only text buffer that yields complete frames.
///
/// Every operation takes the internal lock for its whole duration, so a
/// reader can never observe a half-applied append or extraction.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    text: Mutex<String>,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append received text.
    pub fn append(&self, text: &str) {
        self.lock().push_str(text);
    }

    /// Remove and return the first complete frame.
    ///
    /// The consumed prefix (junk, header, body and footer) is dropped; any
    /// remainder stays in place byte-for-byte. Returns `None` when no
    /// complete frame is present. A partial frame is then left as is, but
    /// text that cannot start a frame is discarded.
    pub fn extract_frame(&self) -> Option<Frame> {
        let mut text = self.lock();
        match find_frame(&text) {
            Some((frame, end)) => {
                text.drain(..end);
                Some(frame)
            }
            None => {
                discard_junk(&mut text);
                None
            }
        }
    }

    /// Remove and return every complete frame, in arrival order.
    pub fn drain_frames(&self) -> Vec<Frame> {
        let mut text = self.lock();
        let mut frames = Vec::new();
        let mut consumed = 0;

        while let Some((frame, end)) = find_frame(&text[consumed..]) {
            consumed += end;
            frames.push(frame);
        }

        text.drain(..consumed);
        discard_junk(&mut text);
        frames
    }

    /// Copy the current content, optionally clearing it.
    pub fn snapshot(&self, clear: bool) -> String {
        let mut text = self.lock();
        if clear {
            std::mem::take(&mut *text)
        } else {
            text.clone()
        }
    }

    /// Discard all content.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Length of the buffered text in bytes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Drop leading text that no frame can use.
///
/// Everything before the first header goes. Without a header, only a tail
/// that may be the start of one is kept.
fn discard_junk(text: &mut String) {
    let keep_from = match text.find(HEADER) {
        Some(start) => start,
        None => {
            let partial = (1..HEADER.len())
                .rev()
                .find(|&n| text.ends_with(&HEADER[..n]))
                .unwrap_or(0);
            text.len() - partial
        }
    };
    if keep_from > 0 {
        tracing::trace!(bytes = keep_from, "discarded unframed text");
        text.drain(..keep_from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn framed(key: &str, value: &str) -> String {
        format!("PyON 1 {}\n{}\n---\n", key, value)
    }

    fn framed_crlf(key: &str, value: &str) -> String {
        format!("PyON 1 {}\r\n{}\r\n---\r\n", key, value)
    }

    #[test]
    fn test_extract_leaves_buffer_empty() {
        let buffer = FrameBuffer::new();
        buffer.append(&framed("heartbeat", "3"));

        let frame = buffer.extract_frame().unwrap();
        assert_eq!(frame.key, "heartbeat");
        assert_eq!(frame.value, "3");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_two_frames_in_order() {
        let buffer = FrameBuffer::new();
        buffer.append(&(framed("info", "[]") + &framed("units", "[]")));

        assert_eq!(buffer.extract_frame().unwrap().key, "info");
        assert_eq!(buffer.extract_frame().unwrap().key, "units");
        assert!(buffer.extract_frame().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_frame_retained() {
        let buffer = FrameBuffer::new();
        let partial = "PyON 1 slots\r\n[\r\n  {\"id\": \"00\"";
        buffer.append(&framed("heartbeat", "1"));
        buffer.append(partial);

        assert_eq!(buffer.extract_frame().unwrap().key, "heartbeat");
        assert!(buffer.extract_frame().is_none());
        assert_eq!(buffer.snapshot(false), partial);
    }

    #[test]
    fn test_no_frame_leaves_buffer_untouched() {
        let buffer = FrameBuffer::new();
        buffer.append("PyON 1 options\n{\"user\": \"anon\"");
        let before = buffer.snapshot(false);

        assert!(buffer.extract_frame().is_none());
        assert_eq!(buffer.snapshot(false), before);
    }

    #[test]
    fn test_drain_frames() {
        let buffer = FrameBuffer::new();
        buffer.append(&framed("a", "1"));
        buffer.append(&framed("b", "2"));
        buffer.append("PyON 1 c\n3");

        let keys: Vec<_> = buffer.drain_frames().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(buffer.snapshot(false), "PyON 1 c\n3");
    }

    #[test]
    fn test_snapshot_clear() {
        let buffer = FrameBuffer::new();
        buffer.append("partial");

        assert_eq!(buffer.snapshot(true), "partial");
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot(false), "");
    }

    #[test]
    fn test_unframed_text_is_discarded() {
        let buffer = FrameBuffer::new();
        buffer.append("Welcome to the Folding@home Client command server.\n> ");
        assert!(buffer.extract_frame().is_none());
        assert!(buffer.is_empty());

        // a tail that may begin a header survives
        buffer.append("noise PyO");
        assert!(buffer.drain_frames().is_empty());
        assert_eq!(buffer.snapshot(false), "PyO");

        buffer.append("N 1 heartbeat\n5\n---\n");
        assert_eq!(buffer.extract_frame().unwrap().value, "5");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_junk_before_partial_frame_is_dropped() {
        let buffer = FrameBuffer::new();
        buffer.append("> \nPyON 1 units\n[");

        assert!(buffer.extract_frame().is_none());
        assert_eq!(buffer.snapshot(false), "PyON 1 units\n[");
    }

    #[test]
    fn test_every_split_point() {
        for text in [
            framed("simulation-info", "{\"project\": 11777, \"paused\": False}"),
            framed_crlf("simulation-info", "{\"project\": 11777, \"paused\": False}"),
        ] {
            assert_split_invariant(&text);
        }
    }

    fn assert_split_invariant(text: &str) {
        let whole = FrameBuffer::new();
        whole.append(&text);
        let expected = whole.extract_frame().unwrap();

        for split in 0..=text.len() {
            let buffer = FrameBuffer::new();
            buffer.append(&text[..split]);
            let early = buffer.extract_frame();
            buffer.append(&text[split..]);

            let frame = early.or_else(|| buffer.extract_frame());
            assert_eq!(frame.as_ref(), Some(&expected), "split at {}", split);
            assert!(buffer.is_empty(), "split at {}", split);
        }
    }

    fn value_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 :,{}\\[\\]\"\n-]{0,80}".prop_filter("no footer line or header", |v| {
            !v.contains("PyON ")
                && !v.split('\n').any(|line| line.starts_with("---"))
                && !v.ends_with('\r')
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip(key in "[a-z][a-z-]{0,15}", value in value_strategy()) {
            let buffer = FrameBuffer::new();
            buffer.append(&framed(&key, &value));

            let frame = buffer.extract_frame().unwrap();
            prop_assert_eq!(frame.key, key);
            prop_assert_eq!(frame.value, crate::normalize_literals(&value));
            prop_assert!(buffer.is_empty());
        }

        #[test]
        fn prop_fragmentation_invariance(
            key in "[a-z][a-z-]{0,15}",
            value in value_strategy(),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 1..4),
            crlf in any::<bool>(),
        ) {
            let frame = if crlf { framed_crlf } else { framed };
            let text = frame(&key, &value) + &frame("heartbeat", "9");

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(text.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let buffer = FrameBuffer::new();
            let mut frames = Vec::new();
            let mut last = 0;
            for point in points.into_iter().chain(std::iter::once(text.len())) {
                buffer.append(&text[last..point]);
                frames.extend(buffer.drain_frames());
                last = point;
            }

            let keys: Vec<_> = frames.iter().map(|f| f.key.as_str()).collect();
            prop_assert_eq!(keys, vec![key.as_str(), "heartbeat"]);
            prop_assert_eq!(&frames[0].value, &crate::normalize_literals(&value));
            prop_assert!(buffer.is_empty());
        }
    }
}
