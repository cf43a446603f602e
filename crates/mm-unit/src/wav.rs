//! WAV encoding for 16-bit stereo PCM.

use mm_ir::{Frame, SAMPLE_RATE};
use std::io::Write;

/// Encode frames as a RIFF/WAVE byte vector at the engine sample rate.
pub fn frames_to_wav(frames: &[Frame]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_wav(&mut buf, frames, SAMPLE_RATE).expect("Vec<u8> write cannot fail");
    buf
}

/// Write a 16-bit stereo WAV to any writer.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_size_are_consistent() {
        let frames = vec![Frame::mono(100); 10];
        let wav = frames_to_wav(&frames);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 4 bytes per stereo frame
        assert_eq!(wav.len(), 44 + 10 * 4);
    }

    #[test]
    fn samples_are_little_endian_interleaved() {
        let wav = frames_to_wav(&[Frame { left: 1, right: -2 }]);
        let data = &wav[44..];
        assert_eq!(data, &[1, 0, 0xFE, 0xFF]);
    }
}
