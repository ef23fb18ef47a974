/// A piece of a source document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextSegment {
    /// The text of the segment.
    pub text: String,
    /// Position of the segment in its document, starting at zero.
    pub index: usize,
    /// Name of the document the segment comes from.
    pub source: String,
}

/// Splits documents into non-overlapping segments of at most `chunk_size`
/// characters.
///
/// Lengths count characters, not bytes, so a segment never ends in the
/// middle of a multi-byte character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentSplitter {
    chunk_size: usize,
}

impl DocumentSplitter {
    /// Creates a splitter. A size of zero is treated as one.
    #[inline]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Returns the maximum segment length, in characters.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Splits `text` into segments, in document order.
    pub fn split(&self, source: &str, text: &str) -> Vec<TextSegment> {
        let mut segments = vec![];
        let mut rest = text;
        while !rest.is_empty() {
            let end = rest
                .char_indices()
                .nth(self.chunk_size)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());
            let (head, tail) = rest.split_at(end);
            segments.push(TextSegment {
                text: head.to_owned(),
                index: segments.len(),
                source: source.to_owned(),
            });
            rest = tail;
        }
        segments
    }
}

impl Default for DocumentSplitter {
    fn default() -> Self {
        Self::new(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count_and_length() {
        let splitter = DocumentSplitter::new(7);
        for len in [0, 1, 6, 7, 8, 14, 15, 100] {
            let text: String = "ñ".repeat(len);
            let segments = splitter.split("doc", &text);
            assert_eq!(segments.len(), len.div_ceil(7), "length {len}");
            assert!(segments.iter().all(|s| s.text.chars().count() <= 7));
            assert_eq!(
                segments.iter().map(|s| s.text.as_str()).collect::<String>(),
                text
            );
        }
    }

    #[test]
    fn test_segment_metadata() {
        let segments = DocumentSplitter::new(3).split("datos.txt", "abcdefg");
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["abc", "def", "g"]);
        assert_eq!(segments[2].index, 2);
        assert_eq!(segments[2].source, "datos.txt");
    }
}
