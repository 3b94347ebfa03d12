//! Flag-keyed chunk compression and decompression
//!
//! The codec registry of the archive engine: each supported compression
//! bit maps to a compress/decompress pair, dispatched through a single
//! `match`. Registered codecs are ZLIB (deflate), BZIP, legacy-framed
//! LZMA and COPYCOMP (store). ZERO chunks carry no payload and are
//! synthesized by the pipeline, never by the registry; DZ, MP3 and JPEG
//! are detected but not decoded.

use std::io::{Cursor, Read, Write};
use tracing::trace;

use crate::{ChunkFlags, Error, Result};

/// Whether the registry holds a codec pair for this compression bit
pub fn is_supported(bit: u16) -> bool {
    matches!(
        bit,
        ChunkFlags::ZLIB | ChunkFlags::BZIP | ChunkFlags::LZMA | ChunkFlags::COPYCOMP
    )
}

/// Compress a chunk payload with the codec selected by its flags
pub fn compress(chunk: u16, flags: ChunkFlags, data: &[u8]) -> Result<Vec<u8>> {
    match flags.compression_bit(chunk)? {
        ChunkFlags::ZLIB => compress_zlib(chunk, data),
        ChunkFlags::BZIP => compress_bzip(chunk, data),
        ChunkFlags::LZMA => compress_lzma(chunk, data),
        ChunkFlags::COPYCOMP => Ok(data.to_vec()),
        bit => Err(Error::UnsupportedCodec { chunk, flags: bit }),
    }
}

/// Decompress a chunk payload, verifying the output length
///
/// `data` is the chunk's *effective* payload (recomputed from offsets by
/// the engine) and may carry trailing slack past the real stream end;
/// the decoders stop at their own end markers, and COPYCOMP truncates
/// to `expected_len`.
pub fn decompress(chunk: u16, flags: ChunkFlags, data: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let out = match flags.compression_bit(chunk)? {
        ChunkFlags::ZLIB => decompress_zlib(chunk, data)?,
        ChunkFlags::BZIP => decompress_bzip(chunk, data)?,
        ChunkFlags::LZMA => decompress_lzma(chunk, data)?,
        ChunkFlags::COPYCOMP => {
            if (data.len() as u64) < expected_len {
                return Err(Error::SizeMismatch {
                    chunk,
                    expected: expected_len,
                    got: data.len() as u64,
                });
            }
            data[..expected_len as usize].to_vec()
        }
        bit => return Err(Error::UnsupportedCodec { chunk, flags: bit }),
    };

    if out.len() as u64 != expected_len {
        return Err(Error::SizeMismatch {
            chunk,
            expected: expected_len,
            got: out.len() as u64,
        });
    }
    Ok(out)
}

fn compress_zlib(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::CodecFailure {
            chunk,
            reason: format!("zlib encode: {e}"),
        })
}

fn decompress_zlib(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    trace!("zlib decompress of {} bytes (chunk {chunk})", data.len());
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::CodecFailure {
            chunk,
            reason: format!("zlib decode: {e}"),
        })?;
    Ok(out)
}

fn compress_bzip(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::CodecFailure {
            chunk,
            reason: format!("bzip2 encode: {e}"),
        })
}

fn decompress_bzip(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    trace!("bzip2 decompress of {} bytes (chunk {chunk})", data.len());
    let mut out = Vec::new();
    bzip2::read::BzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::CodecFailure {
            chunk,
            reason: format!("bzip2 decode: {e}"),
        })?;
    Ok(out)
}

/// Legacy LZMA framing: 5 property bytes, then the decompressed size as
/// u64 little-endian (`u64::MAX` = unknown), then the raw stream. The
/// encoder always records the true length.
fn compress_lzma(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    let options = lzma_rs::compress::Options {
        unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(data.len() as u64)),
    };

    let mut out = Vec::new();
    lzma_rs::lzma_compress_with_options(&mut Cursor::new(data), &mut out, &options).map_err(
        |e| Error::CodecFailure {
            chunk,
            reason: format!("lzma encode: {e}"),
        },
    )?;
    Ok(out)
}

fn decompress_lzma(chunk: u16, data: &[u8]) -> Result<Vec<u8>> {
    trace!("lzma decompress of {} bytes (chunk {chunk})", data.len());
    let options = lzma_rs::decompress::Options {
        unpacked_size: lzma_rs::decompress::UnpackedSize::ReadFromHeader,
        ..Default::default()
    };

    let mut out = Vec::new();
    lzma_rs::lzma_decompress_with_options(&mut Cursor::new(data), &mut out, &options).map_err(
        |e| Error::CodecFailure {
            chunk,
            reason: format!("lzma decode: {e}"),
        },
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] =
        b"The quick brown fox jumps over the lazy dog. The quick brown fox again.";

    fn round_trip(bit: u16) {
        let flags = ChunkFlags::new(bit);
        let packed = compress(0, flags, SAMPLE).unwrap();
        let unpacked = decompress(0, flags, &packed, SAMPLE.len() as u64).unwrap();
        assert_eq!(unpacked, SAMPLE);
    }

    #[test]
    fn test_zlib_round_trip() {
        round_trip(ChunkFlags::ZLIB);
    }

    #[test]
    fn test_bzip_round_trip() {
        round_trip(ChunkFlags::BZIP);
    }

    #[test]
    fn test_lzma_round_trip() {
        round_trip(ChunkFlags::LZMA);
    }

    #[test]
    fn test_lzma_header_records_true_length() {
        let packed = compress(0, ChunkFlags::new(ChunkFlags::LZMA), SAMPLE).unwrap();
        assert!(packed.len() > 13);
        let size = u64::from_le_bytes(packed[5..13].try_into().unwrap());
        assert_eq!(size, SAMPLE.len() as u64);
    }

    #[test]
    fn test_copycomp_truncates_trailing_slack() {
        let flags = ChunkFlags::new(ChunkFlags::COPYCOMP);
        let mut padded = SAMPLE.to_vec();
        padded.extend_from_slice(&[0xEE; 7]);
        let out = decompress(4, flags, &padded, SAMPLE.len() as u64).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_copycomp_short_payload() {
        let flags = ChunkFlags::new(ChunkFlags::COPYCOMP);
        let err = decompress(4, flags, &SAMPLE[..10], SAMPLE.len() as u64).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { chunk: 4, .. }));
    }

    #[test]
    fn test_dz_is_unsupported() {
        let flags = ChunkFlags::new(ChunkFlags::DZ);
        let err = decompress(9, flags, &[0u8; 8], 16).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCodec {
                chunk: 9,
                flags: ChunkFlags::DZ
            }
        ));
    }

    #[test]
    fn test_zlib_size_mismatch() {
        let flags = ChunkFlags::new(ChunkFlags::ZLIB);
        let packed = compress(2, flags, SAMPLE).unwrap();
        let err = decompress(2, flags, &packed, SAMPLE.len() as u64 + 1).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { chunk: 2, .. }));
    }

    #[test]
    fn test_garbage_lzma_fails() {
        let flags = ChunkFlags::new(ChunkFlags::LZMA);
        let err = decompress(5, flags, &[0xFF; 20], 64).unwrap_err();
        assert!(matches!(err, Error::CodecFailure { chunk: 5, .. }));
    }
}
