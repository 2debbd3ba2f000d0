//! Foldmon PyON - framing for the Folding@Home client protocol
//!
//! A Folding@Home client answers commands on its command port with
//! Python-literal flavoured messages ("PyON"), each wrapped in a frame:
//!
//! ```text
//! PyON 1 <key>
//! <value body, any number of lines>
//! ---
//! ```
//!
//! This crate has no I/O. It provides:
//! - [`find_frame`]: locate one complete frame in accumulated text
//! - [`normalize_literals`]: rewrite `None`/`True`/`False` as JSON literals
//! - [`FrameBuffer`]: a synchronized accumulator that hands out one complete
//!   frame at a time and keeps any trailing partial frame intact
//!
//! # Example
//!
//! ```
//! use foldmon_pyon::FrameBuffer;
//!
//! let buffer = FrameBuffer::new();
//! buffer.append("PyON 1 heartbeat\n4\n---\nPyON 1 un");
//!
//! let frame = buffer.extract_frame().unwrap();
//! assert_eq!(frame.key, "heartbeat");
//! assert_eq!(frame.value, "4");
//!
//! assert!(buffer.extract_frame().is_none());
//! assert_eq!(buffer.snapshot(false), "PyON 1 un");
//! ```

mod buffer;
mod frame;

pub use buffer::FrameBuffer;
pub use frame::{find_frame, normalize_literals, Frame, FOOTER, HEADER};
