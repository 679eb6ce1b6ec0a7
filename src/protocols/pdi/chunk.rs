use std::slice::Chunks;

/// A slice of the image together with the flash address it belongs at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChunk<'a> {
    pub address: u32,
    pub data: &'a [u8],
}

/// Splits an image into consecutive chunks of at most `max_chunk_size` bytes,
/// each addressed at `base` plus its offset into the image.
///
/// Callers must ensure `base + data.len()` stays within the 32-bit address
/// space and that `max_chunk_size` is non-zero.
pub struct FlashChunks<'a> {
    chunks: Chunks<'a, u8>,
    address: u32,
}

impl<'a> FlashChunks<'a> {
    pub fn new(base: u32, data: &'a [u8], max_chunk_size: usize) -> Self {
        FlashChunks {
            chunks: data.chunks(max_chunk_size),
            address: base,
        }
    }
}

impl<'a> Iterator for FlashChunks<'a> {
    type Item = FlashChunk<'a>;

    fn next(&mut self) -> Option<FlashChunk<'a>> {
        let data = self.chunks.next()?;
        let chunk = FlashChunk {
            address: self.address,
            data,
        };
        self.address = self.address.wrapping_add(data.len() as u32);
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for FlashChunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_addressed_chunks() {
        let data: Vec<u8> = (0..1200u32).map(|i| i as u8).collect();
        let chunks: Vec<_> = FlashChunks::new(0, &data, 512).collect();

        let layout: Vec<(u32, usize)> = chunks.iter().map(|c| (c.address, c.data.len())).collect();
        assert_eq!(layout, vec![(0x000, 512), (0x200, 512), (0x400, 176)]);
    }

    #[test]
    fn chunk_count_and_reassembly() {
        for len in [0usize, 1, 511, 512, 513, 1024, 1025, 4096, 5000] {
            for max in [1usize, 7, 512, 1024] {
                let data: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();
                let base = 0x0080_0000;
                let chunks = FlashChunks::new(base, &data, max);
                assert_eq!(chunks.len(), len.div_ceil(max));

                let mut offset = 0usize;
                let mut rebuilt = Vec::new();
                for chunk in chunks {
                    assert!(chunk.data.len() <= max);
                    assert!(!chunk.data.is_empty());
                    assert_eq!(chunk.address, base + offset as u32);
                    offset += chunk.data.len();
                    rebuilt.extend_from_slice(chunk.data);
                }
                assert_eq!(rebuilt, data);
            }
        }
    }

    #[test]
    fn empty_image_has_no_chunks() {
        assert_eq!(FlashChunks::new(0x100, &[], 512).next(), None);
    }
}
