use crate::models::chunk::Chunk;

/// Decode uploaded bytes as UTF-8, replacing invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Split text into paragraph chunks on blank-line boundaries.
///
/// No overlap and no size bound. `\r\n` is normalized first; segments that are
/// only whitespace are skipped, and indices count the kept chunks.
pub fn split_paragraphs(text: &str) -> Vec<Chunk> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|segment| !segment.trim().is_empty())
        .enumerate()
        .map(|(index, segment)| Chunk {
            index,
            content: segment.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_split_paragraphs() {
        let chunks = split_paragraphs("First para.\nStill first.\n\nSecond.\n\nThird.");
        assert_eq!(
            contents(&chunks),
            vec!["First para.\nStill first.", "Second.", "Third."]
        );
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn test_split_single_paragraph() {
        let chunks = split_paragraphs("just one line");
        assert_eq!(contents(&chunks), vec!["just one line"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n\n\n").is_empty());
    }

    #[test]
    fn test_blank_segments_skipped_and_indices_contiguous() {
        let chunks = split_paragraphs("a\n\n\n\n  \n\nb\n\n");
        assert_eq!(contents(&chunks), vec!["a", "b"]);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].record_id(), "chunk-1");
    }

    #[test]
    fn test_crlf_normalized() {
        let chunks = split_paragraphs("a\r\nb\r\n\r\nc");
        assert_eq!(contents(&chunks), vec!["a\nb", "c"]);
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        assert_eq!(decode_text(b"ok \xff done"), "ok \u{fffd} done");
    }
}
