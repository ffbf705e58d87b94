//! Asset loaders: a small hand-rolled OBJ parser (fan-triangulated) and a
//! BMP decoder (uncompressed 24/32 bpp). Hand-rolled rather than built on
//! `obj-rs`/`image` because the mesh's exact record shape
//! (`Triangle{v0,v1,v2,cull_fill,cull_wire,base_color}`, a parallel
//! face-normal array) and the texture's exact pixel layout (packed BGRA
//! matching the framebuffer) are particular enough that a generic
//! import-then-adapt job would cost more than it saves.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::math::{V2, V3};
use crate::mesh::{Mesh, MeshError, Triangle};
use crate::resources::texture::{Texture, TextureError};

/// Errors parsing an OBJ file into a [`Mesh`].
#[derive(Debug)]
pub enum ObjError {
    /// The file could not be read.
    Io(io::Error),
    /// A `v` or `vt` line didn't have the expected number of floats.
    MalformedVertexLine { line: usize },
    /// An `f` line referenced fewer than 3 vertices, or an index that
    /// wasn't a valid integer.
    MalformedFaceLine { line: usize },
    /// Building the final [`Mesh`] failed (e.g. an out-of-range index after
    /// OBJ's 1-based indices were rebased).
    Mesh(MeshError),
}

impl fmt::Display for ObjError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjError::Io(e) => write!(f, "obj io error: {e}"),
            ObjError::MalformedVertexLine { line } => write!(f, "malformed vertex line at {line}"),
            ObjError::MalformedFaceLine { line } => write!(f, "malformed face line at {line}"),
            ObjError::Mesh(e) => write!(f, "obj produced an invalid mesh: {e}"),
        }
    }
}
impl std::error::Error for ObjError {}
impl From<io::Error> for ObjError {
    fn from(e: io::Error) -> Self {
        ObjError::Io(e)
    }
}
impl From<MeshError> for ObjError {
    fn from(e: MeshError) -> Self {
        ObjError::Mesh(e)
    }
}

/// Loads an OBJ file at `path` into a [`Mesh`]. Faces with more than 3
/// vertices are fan-triangulated around their first vertex. `vt` lines are
/// optional; vertices with no UV data get `(0, 0)`.
pub fn load_obj(path: &Path) -> Result<Mesh, ObjError> {
    let contents = fs::read_to_string(path)?;

    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut triangles = Vec::new();
    let mut has_uvs = false;

    for (line_no, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let floats = parse_floats(tokens, 3).ok_or(ObjError::MalformedVertexLine { line: line_no })?;
                positions.push(V3::new(floats[0], floats[1], floats[2]));
            }
            Some("vt") => {
                let floats = parse_floats(tokens, 2).ok_or(ObjError::MalformedVertexLine { line: line_no })?;
                uvs.push(V2::new(floats[0], floats[1]));
                has_uvs = true;
            }
            Some("f") => {
                let indices: Vec<u32> = tokens
                    .map(|tok| {
                        // OBJ face corners are "v", "v/vt" or "v/vt/vn"; we
                        // only need the leading vertex index.
                        let v_part = tok.split('/').next().unwrap_or(tok);
                        v_part.parse::<i64>().ok()
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ObjError::MalformedFaceLine { line: line_no })?
                    .into_iter()
                    .map(|one_based| (one_based - 1) as u32)
                    .collect();
                if indices.len() < 3 {
                    return Err(ObjError::MalformedFaceLine { line: line_no });
                }
                for i in 1..indices.len() - 1 {
                    triangles.push(Triangle::new(indices[0], indices[i], indices[i + 1], 0xFFC8C8C8));
                }
            }
            _ => continue, // unsupported directive (o, g, mtllib, vn, s, ...)
        }
    }

    if !has_uvs {
        uvs = vec![V2::ZERO; positions.len()];
    }

    Ok(Mesh::new(positions, uvs, triangles)?)
}

fn parse_floats<'a>(tokens: impl Iterator<Item = &'a str>, count: usize) -> Option<Vec<f32>> {
    let values: Vec<f32> = tokens.take(count).filter_map(|t| t.parse().ok()).collect();
    (values.len() == count).then_some(values)
}

/// Errors decoding a BMP file into a [`Texture`].
#[derive(Debug)]
pub enum BmpError {
    /// The file could not be read.
    Io(io::Error),
    /// The file didn't start with the `BM` magic bytes.
    BadMagic,
    /// The file was too short to contain its own declared headers/pixels.
    Truncated,
    /// The bits-per-pixel field wasn't 24 or 32.
    UnsupportedBitDepth(u16),
    /// The compression field wasn't 0 (uncompressed).
    Compressed,
    /// Building the final [`Texture`] failed.
    Texture(TextureError),
}

impl fmt::Display for BmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmpError::Io(e) => write!(f, "bmp io error: {e}"),
            BmpError::BadMagic => write!(f, "bmp file has bad magic bytes"),
            BmpError::Truncated => write!(f, "bmp file is truncated"),
            BmpError::UnsupportedBitDepth(bpp) => write!(f, "bmp bit depth {bpp} is not supported (need 24 or 32)"),
            BmpError::Compressed => write!(f, "bmp compression is not supported"),
            BmpError::Texture(e) => write!(f, "bmp produced an invalid texture: {e}"),
        }
    }
}
impl std::error::Error for BmpError {}
impl From<io::Error> for BmpError {
    fn from(e: io::Error) -> Self {
        BmpError::Io(e)
    }
}
impl From<TextureError> for BmpError {
    fn from(e: TextureError) -> Self {
        BmpError::Texture(e)
    }
}

/// Decodes an uncompressed 24- or 32-bit-per-pixel BMP at `path` into a
/// [`Texture`]. Handles both bottom-up (positive height) and top-down
/// (negative height) row order, converting to top-down BGRA either way.
pub fn load_bmp(path: &Path) -> Result<Texture, BmpError> {
    let bytes = fs::read(path)?;
    if bytes.len() < 54 {
        return Err(BmpError::Truncated);
    }
    if &bytes[0..2] != b"BM" {
        return Err(BmpError::BadMagic);
    }

    let pixel_data_offset = read_u32(&bytes, 10)? as usize;
    let dib_header_size = read_u32(&bytes, 14)?;
    let width = read_i32(&bytes, 18)?;
    let height = read_i32(&bytes, 22)?;
    let bpp = read_u16(&bytes, 28)?;
    let compression = if dib_header_size >= 40 { read_u32(&bytes, 30)? } else { 0 };

    if compression != 0 {
        return Err(BmpError::Compressed);
    }
    if bpp != 24 && bpp != 32 {
        return Err(BmpError::UnsupportedBitDepth(bpp));
    }

    let width = width.unsigned_abs();
    let top_down = height < 0;
    let height = height.unsigned_abs();
    let bytes_per_pixel = (bpp / 8) as usize;
    let row_stride = ((width as usize * bytes_per_pixel + 3) / 4) * 4; // rows are 4-byte aligned

    let required = pixel_data_offset + row_stride * height as usize;
    if bytes.len() < required {
        return Err(BmpError::Truncated);
    }

    let mut pixels = vec![0u32; (width * height) as usize];
    for file_row in 0..height as usize {
        let dest_row = if top_down { file_row } else { height as usize - 1 - file_row };
        let row_start = pixel_data_offset + file_row * row_stride;
        for col in 0..width as usize {
            let px = row_start + col * bytes_per_pixel;
            let b = bytes[px];
            let g = bytes[px + 1];
            let r = bytes[px + 2];
            let a = if bytes_per_pixel == 4 { bytes[px + 3] } else { 0xFF };
            let packed = (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32;
            pixels[dest_row * width as usize + col] = packed;
        }
    }

    Ok(Texture::from_pixels(width, height, pixels)?)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, BmpError> {
    bytes.get(offset..offset + 2).map(|s| u16::from_le_bytes([s[0], s[1]])).ok_or(BmpError::Truncated)
}
fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, BmpError> {
    bytes
        .get(offset..offset + 4)
        .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or(BmpError::Truncated)
}
fn read_i32(bytes: &[u8], offset: usize) -> Result<i32, BmpError> {
    read_u32(bytes, offset).map(|v| v as i32)
}
