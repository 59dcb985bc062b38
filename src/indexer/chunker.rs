//! Overlapping word-window chunker.
//!
//! Tokens are whitespace-separated words. Each window holds `chunk_size`
//! tokens and advances by `chunk_size - overlap`, so consecutive chunks share
//! `overlap` tokens of context. The trailing window is kept even when short:
//! for L tokens with L > C this yields exactly ceil((L-O)/(C-O)) chunks.

pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < chunk_size);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= chunk_size {
        return vec![words.join(" ")];
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(len: usize, chunk: usize, overlap: usize) -> usize {
        if len == 0 {
            0
        } else if len <= chunk {
            1
        } else {
            (len - overlap).div_ceil(chunk - overlap)
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 512, 128).is_empty());
        assert!(chunk_text("   \n\t ", 512, 128).is_empty());
    }

    #[test]
    fn short_input_is_one_chunk() {
        let text = "just a handful of words";
        let chunks = chunk_text(text, 512, 128);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn thousand_tokens_at_default_sizes_is_three_chunks() {
        let chunks = chunk_text(&words(1000), 512, 128);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 512);
        assert_eq!(chunks[1].split_whitespace().count(), 512);
        // trailing chunk is shorter but kept
        assert_eq!(chunks[2].split_whitespace().count(), 1000 - 768);
    }

    #[test]
    fn consecutive_chunks_share_overlap_tokens() {
        let chunks = chunk_text(&words(100), 30, 10);
        let first: Vec<&str> = chunks[0].split_whitespace().collect();
        let second: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(&first[20..], &second[..10]);
    }

    #[test]
    fn chunk_count_law_holds() {
        for (len, chunk, overlap) in [
            (1000, 512, 128),
            (896, 512, 128),
            (897, 512, 128),
            (513, 512, 128),
            (100, 30, 10),
            (31, 30, 10),
            (2000, 64, 16),
        ] {
            let chunks = chunk_text(&words(len), chunk, overlap);
            assert_eq!(
                chunks.len(),
                expected_count(len, chunk, overlap),
                "len={len} chunk={chunk} overlap={overlap}"
            );
        }
    }

    #[test]
    fn every_token_appears_in_some_chunk() {
        let chunks = chunk_text(&words(250), 64, 16);
        let all: String = chunks.join(" ");
        for i in 0..250 {
            assert!(all.contains(&format!("w{i}")));
        }
    }
}
