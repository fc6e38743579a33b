//! Recursive character text splitting with overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::Segment;

/// Default separator priority: paragraph break, line break, space, character
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Text splitter with configurable size and overlap
///
/// Splitting recursively tries a prioritized list of separators so chunks
/// break at the coarsest boundary available, then merges pieces back into
/// chunks of at most `chunk_size` characters with `chunk_overlap` characters
/// of trailing context carried into the next chunk.
pub struct TextSplitter {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between adjacent chunks
    chunk_overlap: usize,
    /// Minimum segment length; shorter fragments are dropped
    min_segment_len: usize,
    /// Separators in priority order; the empty separator splits on graphemes
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_segment_len: 50,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            min_segment_len: config.min_segment_len,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split text into overlapping chunks
    ///
    /// Empty or whitespace-only input yields an empty sequence. Chunks never
    /// exceed `chunk_size` unless a single unsplittable unit is itself
    /// longer.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_with(text, &self.separators)
    }

    /// Split text and convert the chunks into segments for one source
    ///
    /// Fragments shorter than the minimum segment length are dropped before
    /// embedding; they add retrieval noise without informational value.
    /// Ordinals are assigned sequentially over the kept segments.
    pub fn segment(&self, text: &str, source_id: &str) -> Vec<Segment> {
        self.split(text)
            .into_iter()
            .filter(|chunk| chunk.trim().len() >= self.min_segment_len)
            .enumerate()
            .map(|(i, chunk)| Segment::new(chunk, source_id, i as u32))
            .collect()
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the coarsest separator that actually occurs; "" always matches
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep.as_str()) {
                separator = sep.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.graphemes(true).map(|g| g.to_string()).collect()
        } else {
            text.split(separator.as_str()).map(|s| s.to_string()).collect()
        };

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();

        for piece in pieces {
            if piece.len() < self.chunk_size {
                good.push(piece);
                continue;
            }

            // Flush accumulated pieces before recursing into the long one
            if !good.is_empty() {
                chunks.extend(self.merge_pieces(&good, &separator));
                good.clear();
            }

            if remaining.is_empty() {
                // No finer separator left; unavoidable overflow
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.merge_pieces(&good, &separator));
        }

        chunks
    }

    /// Merge split pieces into chunks, carrying overlap across boundaries
    fn merge_pieces(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = separator.len();
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = piece.len();
            let added = piece_len + if window.is_empty() { 0 } else { sep_len };

            if total + added > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window, separator) {
                    chunks.push(chunk);
                }

                // Shrink the window until it fits the overlap budget and
                // leaves room for the incoming piece
                while total > self.chunk_overlap
                    || (!window.is_empty()
                        && total + piece_len + if window.is_empty() { 0 } else { sep_len }
                            > self.chunk_size)
                {
                    let first_len = window[0].len();
                    total -= first_len + if window.len() > 1 { sep_len } else { 0 };
                    window.remove(0);
                    if window.is_empty() {
                        break;
                    }
                }
            }

            window.push(piece.as_str());
            total += piece_len + if window.len() > 1 { sep_len } else { 0 };
        }

        if let Some(chunk) = join_window(&window, separator) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// Join window pieces, returning None when the result is only whitespace
fn join_window(window: &[&str], separator: &str) -> Option<String> {
    if window.is_empty() {
        return None;
    }
    let joined = window.join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
