//! Payload chunking shared by the text, JSON and bitmap transfers

/// Chunk indices are a single byte, so no transfer may exceed this many
/// packets.
pub const MAX_CHUNKS: usize = 255;

/// Splits `payload` into chunks of at most `max` bytes.
///
/// An empty payload yields exactly one empty chunk, so every transfer emits
/// at least one framed packet for the device to acknowledge.
pub fn split_chunks(payload: &[u8], max: usize) -> Vec<&[u8]> {
    if payload.is_empty() {
        return vec![payload];
    }
    payload.chunks(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[&[u8]]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }

    #[test]
    fn chunks_reassemble_to_the_original_payload() {
        for len in [0usize, 1, 179, 180, 181, 359, 360, 361, 500, 4096] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let chunks = split_chunks(&payload, 180);
            assert_eq!(reassemble(&chunks), payload, "payload of {len} bytes");
        }
    }

    #[test]
    fn chunk_sizes_never_exceed_the_budget() {
        let payload = vec![0xAB; 1000];
        for (i, chunk) in split_chunks(&payload, 194).iter().enumerate() {
            assert!(chunk.len() <= 194, "chunk {i} is {} bytes", chunk.len());
        }
    }

    #[test]
    fn only_the_final_chunk_is_short() {
        let payload = vec![0; 500];
        let chunks = split_chunks(&payload, 194);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 194);
        assert_eq!(chunks[1].len(), 194);
        assert_eq!(chunks[2].len(), 112);
    }

    #[test]
    fn empty_payload_yields_one_empty_chunk() {
        let chunks = split_chunks(&[], 180);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn exact_multiple_does_not_add_a_trailing_empty_chunk() {
        let payload = vec![0; 360];
        assert_eq!(split_chunks(&payload, 180).len(), 2);
    }
}
