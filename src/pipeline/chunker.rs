//! Streaming speech chunker.
//!
//! Reshapes an arriving byte stream of 16-bit little-endian PCM into frames
//! of exactly `chunk_size` samples. Fragment boundaries can fall in the
//! middle of a sample, so the chunker carries at most one odd trailing byte
//! between fragments and accumulates samples until a full frame is
//! available. The stream is finite and non-restartable: `finish` zero-pads
//! whatever remains into one last full frame.

/// Accumulates PCM bytes and emits fixed-size sample frames.
#[derive(Debug)]
pub struct SpeechChunker {
    chunk_size: usize,
    carry: Option<u8>,
    buffer: Vec<i16>,
}

impl SpeechChunker {
    /// Creates a chunker emitting frames of `chunk_size` samples.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            carry: None,
            buffer: Vec::new(),
        }
    }

    /// Feeds one arriving byte fragment and returns the completed frames.
    ///
    /// Every returned frame has exactly `chunk_size` samples.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<Vec<i16>> {
        if fragment.is_empty() {
            return Vec::new();
        }

        let mut first = 0;
        if let Some(low) = self.carry.take() {
            // The carried byte is the low half of the next sample.
            self.buffer
                .push(i16::from_le_bytes([low, fragment[0]]));
            first = 1;
        }

        let rest = &fragment[first..];
        let even = rest.len() - rest.len() % 2;
        self.buffer.extend(
            rest[..even]
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
        );
        if even < rest.len() {
            self.carry = Some(rest[even]);
        }

        self.take_full_frames()
    }

    /// Ends the stream, zero-padding a trailing partial window to exactly
    /// `chunk_size` samples.
    ///
    /// A dangling odd byte is dropped here: half a sample cannot be
    /// reconstructed once the stream is over. Returns `None` when nothing
    /// is buffered.
    pub fn finish(&mut self) -> Option<Vec<i16>> {
        self.carry = None;
        if self.buffer.is_empty() {
            return None;
        }
        let mut frame = std::mem::take(&mut self.buffer);
        frame.resize(self.chunk_size, 0);
        Some(frame)
    }

    /// Number of samples currently buffered.
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    fn take_full_frames(&mut self) -> Vec<Vec<i16>> {
        let mut frames = Vec::new();
        while self.buffer.len() >= self.chunk_size {
            let rest = self.buffer.split_off(self.chunk_size);
            frames.push(std::mem::replace(&mut self.buffer, rest));
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_for(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_empty_stream_emits_nothing() {
        let mut chunker = SpeechChunker::new(4);
        assert!(chunker.push(&[]).is_empty());
        assert!(chunker.finish().is_none());
    }

    #[test]
    fn test_exact_multiple_emits_full_frames() {
        let mut chunker = SpeechChunker::new(4);
        let samples: Vec<i16> = (0..8).collect();

        let frames = chunker.push(&bytes_for(&samples));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![0, 1, 2, 3]);
        assert_eq!(frames[1], vec![4, 5, 6, 7]);
        assert!(chunker.finish().is_none());
    }

    #[test]
    fn test_partial_window_is_zero_padded_on_finish() {
        let mut chunker = SpeechChunker::new(4);
        let frames = chunker.push(&bytes_for(&[7, 8, 9]));
        assert!(frames.is_empty());

        let last = chunker.finish().unwrap();
        assert_eq!(last, vec![7, 8, 9, 0]);
    }

    #[test]
    fn test_odd_byte_carries_across_fragments() {
        let mut chunker = SpeechChunker::new(2);
        // Sample 0x1234 split across two fragments: low byte first.
        assert!(chunker.push(&[0x34]).is_empty());
        let frames = chunker.push(&[0x12, 0x78, 0x56]);
        assert_eq!(frames, vec![vec![0x1234, 0x5678]]);
    }

    #[test]
    fn test_single_byte_fragments_reassemble() {
        let mut chunker = SpeechChunker::new(2);
        let samples = vec![100i16, -200, 300, -400];
        let bytes = bytes_for(&samples);

        let mut frames = Vec::new();
        for byte in bytes {
            frames.extend(chunker.push(&[byte]));
        }
        assert_eq!(frames, vec![vec![100, -200], vec![300, -400]]);
        assert!(chunker.finish().is_none());
    }

    #[test]
    fn test_trailing_odd_byte_is_dropped() {
        let mut chunker = SpeechChunker::new(4);
        let mut bytes = bytes_for(&[1, 2]);
        bytes.push(0xAB); // dangling low byte, never completed

        chunker.push(&bytes);
        let last = chunker.finish().unwrap();
        assert_eq!(last, vec![1, 2, 0, 0]);
    }

    #[test]
    fn test_every_frame_has_exactly_chunk_size_samples() {
        let mut chunker = SpeechChunker::new(512);
        let samples: Vec<i16> = (0..5000).map(|i| i as i16).collect();
        let bytes = bytes_for(&samples);

        let mut frames = Vec::new();
        // Feed in uneven fragment sizes.
        for fragment in bytes.chunks(333) {
            frames.extend(chunker.push(fragment));
        }
        if let Some(last) = chunker.finish() {
            frames.push(last);
        }

        for frame in &frames {
            assert_eq!(frame.len(), 512);
        }

        // Concatenation reproduces the input followed by zero padding.
        let joined: Vec<i16> = frames.concat();
        assert_eq!(&joined[..samples.len()], &samples[..]);
        assert!(joined[samples.len()..].iter().all(|&s| s == 0));
        assert!(joined.len() - samples.len() < 512);
    }

    #[test]
    fn test_buffered_samples_tracks_accumulation() {
        let mut chunker = SpeechChunker::new(8);
        chunker.push(&bytes_for(&[1, 2, 3]));
        assert_eq!(chunker.buffered_samples(), 3);
        chunker.push(&bytes_for(&[4, 5, 6, 7, 8]));
        // One frame emitted, buffer empty again.
        assert_eq!(chunker.buffered_samples(), 0);
    }
}
