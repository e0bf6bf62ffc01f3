use crate::error::IngestError;
use crate::models::{Chunk, RagOptions};
use sha2::{Digest, Sha256};

/// Preferred cut points, strongest first. A cut lands right after the match.
const BOUNDARIES: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        RagOptions::default().into()
    }
}

impl From<RagOptions> for ChunkingConfig {
    fn from(value: RagOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits `text` into windows of at most `chunk_size` characters.
///
/// Every window after the first starts with the last `chunk_overlap`
/// characters of its predecessor, so dropping that prefix from each later
/// chunk and concatenating gives back `text` unchanged. Blank input yields no
/// chunks.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    config.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let hard_end = (start + config.chunk_size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            natural_end(&chars, start, hard_end, config)
        };

        let piece: String = chars[start..end].iter().collect();
        let chunk_index = chunks.len();
        chunks.push(Chunk {
            chunk_id: make_chunk_id(chunk_index, start, &piece),
            chunk_index,
            char_start: start,
            text: piece,
        });

        if end == chars.len() {
            break;
        }
        start = end - config.chunk_overlap;
    }

    Ok(chunks)
}

/// Moves a hard cut back to a paragraph, line, sentence or word break.
///
/// The search stays in the back half of the window and beyond the overlap
/// region, so the next window always starts past `start`.
fn natural_end(chars: &[char], start: usize, hard_end: usize, config: ChunkingConfig) -> usize {
    if chars[hard_end].is_whitespace() || chars[hard_end - 1].is_whitespace() {
        return hard_end;
    }

    let floor = start + (config.chunk_overlap + 1).max(config.chunk_size / 2);
    if floor >= hard_end {
        return hard_end;
    }

    for boundary in BOUNDARIES {
        let separator: Vec<char> = boundary.chars().collect();
        let found = (floor..hard_end).rev().find(|&cut| {
            cut >= start + separator.len() && chars[cut - separator.len()..cut] == separator[..]
        });
        if let Some(cut) = found {
            return cut;
        }
    }

    hard_end
}

fn make_chunk_id(index: usize, char_start: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((index as u64).to_le_bytes());
    hasher.update((char_start as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut text = String::new();
        for (position, chunk) in chunks.iter().enumerate() {
            if position == 0 {
                text.push_str(&chunk.text);
            } else {
                text.extend(chunk.text.chars().skip(overlap));
            }
        }
        text
    }

    fn assert_exact_overlap(chunks: &[Chunk], overlap: usize) {
        for pair in chunks.windows(2) {
            let previous: Vec<char> = pair[0].text.chars().collect();
            let tail: String = previous[previous.len() - overlap..].iter().collect();
            let head: String = pair[1].text.chars().take(overlap).collect();
            assert_eq!(tail, head, "chunks {} and {}", pair[0].chunk_index, pair[1].chunk_index);
        }
    }

    const AUDITION_NOTES: &str = "Artists are graded A, B, B-high and Top.\n\n\
        An audition panel of three experts listens to a recording of forty minutes. \
        Candidates who fail may reapply after one year.\n\
        Fees: vocal 2000 | instrumental 2500 | folk 1500\n\n\
        Résumés must list every prior broadcast, including regional stations.";

    #[test]
    fn short_words_split_into_the_expected_windows() -> Result<(), IngestError> {
        let chunks = split_text("A B C D E", ChunkingConfig::new(3, 1)?)?;
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["A B", "B C", "C D", "D E"]);
        Ok(())
    }

    #[test]
    fn chunks_reassemble_into_the_original_text() -> Result<(), IngestError> {
        for (size, overlap) in [(40, 10), (25, 0), (64, 15), (7, 3)] {
            let config = ChunkingConfig::new(size, overlap)?;
            let chunks = split_text(AUDITION_NOTES, config)?;
            assert_eq!(reassemble(&chunks, overlap), AUDITION_NOTES);
            assert_exact_overlap(&chunks, overlap);
            assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= size));
        }
        Ok(())
    }

    #[test]
    fn chunk_order_and_offsets_follow_the_source() -> Result<(), IngestError> {
        let chunks = split_text(AUDITION_NOTES, ChunkingConfig::new(50, 8)?)?;
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, position);
            let from_source: String = AUDITION_NOTES
                .chars()
                .skip(chunk.char_start)
                .take(chunk.text.chars().count())
                .collect();
            assert_eq!(from_source, chunk.text);
        }
        Ok(())
    }

    #[test]
    fn paragraph_breaks_are_preferred_over_mid_word_cuts() -> Result<(), IngestError> {
        let chunks = split_text("alpha beta\n\ngamma delta epsilon", ChunkingConfig::new(16, 2)?)?;
        assert_eq!(chunks[0].text, "alpha beta\n\n");
        Ok(())
    }

    #[test]
    fn unbroken_text_falls_back_to_hard_cuts() -> Result<(), IngestError> {
        let chunks = split_text("abcdefghij", ChunkingConfig::new(4, 1)?)?;
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        Ok(())
    }

    #[test]
    fn blank_corpus_yields_no_chunks() -> Result<(), IngestError> {
        assert!(split_text("", ChunkingConfig::default())?.is_empty());
        assert!(split_text(" \n\n\t", ChunkingConfig::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            ChunkingConfig::new(100, 100),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn chunk_ids_are_stable() -> Result<(), IngestError> {
        let config = ChunkingConfig::new(30, 5)?;
        let first = split_text(AUDITION_NOTES, config)?;
        let second = split_text(AUDITION_NOTES, config)?;
        assert_eq!(first, second);
        Ok(())
    }
}
