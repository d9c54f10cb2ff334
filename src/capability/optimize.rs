// src/capability/optimize.rs

use futures::future::BoxFuture;

use crate::capability::{CapResult, ImageFormat, Optimizer};
use crate::errors::CapabilityError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Ancillary PNG chunks that affect how pixels render and must survive.
const PNG_KEEP_ANCILLARY: &[&[u8; 4]] = &[b"tRNS", b"gAMA", b"cHRM", b"sRGB", b"iCCP", b"sBIT"];

/// Lossless optimizer that drops metadata: PNG text/time/EXIF chunks and
/// JPEG APP1-APP13/APP15 and COM segments. Pixel data is never touched.
///
/// Other formats are returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataStripper;

impl Optimizer for MetadataStripper {
    fn optimize<'a>(
        &'a self,
        bytes: &'a [u8],
        format: ImageFormat,
    ) -> BoxFuture<'a, CapResult<Vec<u8>>> {
        Box::pin(async move {
            let stripped = match format {
                ImageFormat::Png => strip_png(bytes)?,
                ImageFormat::Jpeg => strip_jpeg(bytes)?,
                ImageFormat::Gif | ImageFormat::Other => return Ok(bytes.to_vec()),
            };
            if stripped.len() < bytes.len() {
                Ok(stripped)
            } else {
                Ok(bytes.to_vec())
            }
        })
    }
}

fn malformed(what: &str) -> CapabilityError {
    CapabilityError::Invalid(format!("malformed {what} image"))
}

pub fn strip_png(bytes: &[u8]) -> CapResult<Vec<u8>> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(malformed("PNG"));
    }

    let mut out = PNG_SIGNATURE.to_vec();
    let mut pos = PNG_SIGNATURE.len();

    while pos < bytes.len() {
        let header = bytes.get(pos..pos + 8).ok_or_else(|| malformed("PNG"))?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = [header[4], header[5], header[6], header[7]];
        let end = pos
            .checked_add(12 + len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| malformed("PNG"))?;

        // Bit 5 of the first type byte clear marks a critical chunk.
        let critical = kind[0] & 0x20 == 0;
        if critical || PNG_KEEP_ANCILLARY.contains(&&kind) {
            out.extend_from_slice(&bytes[pos..end]);
        }

        pos = end;
        if &kind == b"IEND" {
            break;
        }
    }

    Ok(out)
}

pub fn strip_jpeg(bytes: &[u8]) -> CapResult<Vec<u8>> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err(malformed("JPEG"));
    }

    let mut out = vec![0xFF, 0xD8];
    let mut pos = 2;

    while pos < bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(malformed("JPEG"));
        }
        // Fill bytes.
        let mut marker_pos = pos + 1;
        while bytes.get(marker_pos) == Some(&0xFF) {
            marker_pos += 1;
        }
        let marker = *bytes.get(marker_pos).ok_or_else(|| malformed("JPEG"))?;

        // Markers without a length field.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            out.extend_from_slice(&[0xFF, marker]);
            pos = marker_pos + 1;
            continue;
        }
        if marker == 0xD9 {
            out.extend_from_slice(&[0xFF, 0xD9]);
            break;
        }

        let len_bytes = bytes
            .get(marker_pos + 1..marker_pos + 3)
            .ok_or_else(|| malformed("JPEG"))?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        if len < 2 {
            return Err(malformed("JPEG"));
        }
        let end = marker_pos + 1 + len;
        if end > bytes.len() {
            return Err(malformed("JPEG"));
        }

        // Start of scan: entropy-coded data follows up to EOI.
        if marker == 0xDA {
            out.push(0xFF);
            out.extend_from_slice(&bytes[marker_pos..]);
            break;
        }

        let metadata = matches!(marker, 0xE1..=0xED | 0xEF | 0xFE);
        if !metadata {
            out.push(0xFF);
            out.extend_from_slice(&bytes[marker_pos..end]);
        }
        pos = end;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut c = (data.len() as u32).to_be_bytes().to_vec();
        c.extend_from_slice(kind);
        c.extend_from_slice(data);
        c.extend_from_slice(&[0, 0, 0, 0]);
        c
    }

    #[tokio::test]
    async fn png_text_chunks_are_dropped() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend(png_chunk(b"IHDR", &[0; 13]));
        png.extend(png_chunk(b"tEXt", b"Comment\0made with love"));
        png.extend(png_chunk(b"gAMA", &[0, 0, 0, 1]));
        png.extend(png_chunk(b"IDAT", &[1, 2, 3]));
        png.extend(png_chunk(b"IEND", &[]));

        let mut expected = PNG_SIGNATURE.to_vec();
        expected.extend(png_chunk(b"IHDR", &[0; 13]));
        expected.extend(png_chunk(b"gAMA", &[0, 0, 0, 1]));
        expected.extend(png_chunk(b"IDAT", &[1, 2, 3]));
        expected.extend(png_chunk(b"IEND", &[]));

        let out = MetadataStripper.optimize(&png, ImageFormat::Png).await.unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn jpeg_exif_and_comments_are_dropped() {
        let jpeg: Vec<u8> = [
            &[0xFF, 0xD8][..],
            &[0xFF, 0xE0, 0x00, 0x04, b'J', b'F'],
            &[0xFF, 0xE1, 0x00, 0x05, b'E', b'x', b'i'],
            &[0xFF, 0xFE, 0x00, 0x04, b'h', b'i'],
            &[0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0xFF, 0xD9],
        ]
        .concat();
        let expected: Vec<u8> = [
            &[0xFF, 0xD8][..],
            &[0xFF, 0xE0, 0x00, 0x04, b'J', b'F'],
            &[0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0xFF, 0xD9],
        ]
        .concat();
        assert_eq!(strip_jpeg(&jpeg).unwrap(), expected);
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0, 0, 0, 50, b'I', b'D', b'A', b'T', 1]);
        assert!(strip_png(&png).is_err());
    }
}
