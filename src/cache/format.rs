use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::math::V3;
use crate::mesh::Meshlet;

const MAGIC: [u8; 4] = *b"MSHL";
const VERSION: u32 = 1;

/// Errors loading or storing a meshlet cache file.
#[derive(Debug)]
pub enum CacheError {
    /// The file could not be read or written.
    Io(io::Error),
    /// The file's magic bytes didn't match `"MSHL"`.
    BadMagic,
    /// The file's version didn't match [`VERSION`].
    UnsupportedVersion(u32),
    /// The file's recorded vertex/triangle counts didn't match the source
    /// mesh currently in memory.
    CountMismatch,
    /// A meshlet referenced a vertex or triangle index at or beyond the
    /// source mesh's counts.
    IndexOutOfRange,
    /// The file was truncated partway through a record.
    Truncated,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "meshlet cache io error: {e}"),
            CacheError::BadMagic => write!(f, "meshlet cache has bad magic bytes"),
            CacheError::UnsupportedVersion(v) => write!(f, "meshlet cache has unsupported version {v}"),
            CacheError::CountMismatch => write!(f, "meshlet cache vertex/triangle counts don't match the source mesh"),
            CacheError::IndexOutOfRange => write!(f, "meshlet cache references an out-of-range vertex or triangle index"),
            CacheError::Truncated => write!(f, "meshlet cache file is truncated"),
        }
    }
}
impl std::error::Error for CacheError {}
impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        CacheError::Io(e)
    }
}

/// Writes `meshlets` to `path` in the fixed little-endian cache format,
/// tagged with the source mesh's vertex/triangle counts so a later load can
/// detect staleness. Creates the parent directory if needed.
pub fn store(path: &Path, vertex_count: u32, triangle_count: u32, meshlets: &[Meshlet]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&vertex_count.to_le_bytes());
    buf.extend_from_slice(&triangle_count.to_le_bytes());
    buf.extend_from_slice(&(meshlets.len() as u32).to_le_bytes());

    for meshlet in meshlets {
        buf.extend_from_slice(&(meshlet.vertex_indices.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(meshlet.triangle_indices.len() as u32).to_le_bytes());
        buf.extend_from_slice(&meshlet.bounds_center.x.to_le_bytes());
        buf.extend_from_slice(&meshlet.bounds_center.y.to_le_bytes());
        buf.extend_from_slice(&meshlet.bounds_center.z.to_le_bytes());
        buf.extend_from_slice(&meshlet.bounds_radius.to_le_bytes());
        for &v in &meshlet.vertex_indices {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for &t in &meshlet.triangle_indices {
            buf.extend_from_slice(&t.to_le_bytes());
        }
    }

    let mut file = fs::File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

/// Loads a meshlet cache file from `path`, validating it against the
/// source mesh's current vertex/triangle counts.
///
/// Any mismatch (magic, version, counts, or an out-of-range index) is
/// reported as a distinct [`CacheError`] variant; callers that want a
/// "silently regenerate on any problem" fallback should treat every `Err`
/// the same way: log and fall back to [`crate::mesh::generate_meshlets`].
pub fn load(path: &Path, vertex_count: u32, triangle_count: u32) -> Result<Vec<Meshlet>, CacheError> {
    let mut file = fs::File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut r = Reader::new(&buf);
    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(CacheError::BadMagic);
    }
    let version = r.u32()?;
    if version != VERSION {
        return Err(CacheError::UnsupportedVersion(version));
    }
    let file_vertex_count = r.u32()?;
    let file_triangle_count = r.u32()?;
    if file_vertex_count != vertex_count || file_triangle_count != triangle_count {
        return Err(CacheError::CountMismatch);
    }
    let meshlet_count = r.u32()?;

    let mut meshlets = Vec::with_capacity(meshlet_count as usize);
    for _ in 0..meshlet_count {
        let vertex_index_count = r.u32()? as usize;
        let triangle_index_count = r.u32()? as usize;
        let cx = r.f32()?;
        let cy = r.f32()?;
        let cz = r.f32()?;
        let radius = r.f32()?;

        let mut vertex_indices = Vec::with_capacity(vertex_index_count);
        for _ in 0..vertex_index_count {
            let v = r.u32()?;
            if v >= vertex_count {
                return Err(CacheError::IndexOutOfRange);
            }
            vertex_indices.push(v);
        }
        let mut triangle_indices = Vec::with_capacity(triangle_index_count);
        for _ in 0..triangle_index_count {
            let t = r.u32()?;
            if t >= triangle_count {
                return Err(CacheError::IndexOutOfRange);
            }
            triangle_indices.push(t);
        }

        meshlets.push(Meshlet {
            vertex_indices,
            triangle_indices,
            bounds_center: V3::new(cx, cy, cz),
            bounds_radius: radius,
        });
    }

    Ok(meshlets)
}

/// A small cursor over a byte slice, used to decode the fixed cache format
/// without pulling in a parser-combinator crate for five field types.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CacheError> {
        if self.pos + n > self.buf.len() {
            return Err(CacheError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, CacheError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    fn f32(&mut self) -> Result<f32, CacheError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(f32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{generate_meshlets, Mesh, Triangle};
    use crate::math::V2;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path(name: &str) -> std::path::PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("tile_rend_cache_test_{name}_{n}.meshlets"))
    }

    fn sample_mesh() -> Mesh {
        let vertices = vec![
            V3::new(0.0, 0.0, 0.0),
            V3::new(1.0, 0.0, 0.0),
            V3::new(0.0, 1.0, 0.0),
            V3::new(1.0, 1.0, 0.0),
        ];
        let tex_coords = vec![V2::ZERO; 4];
        let triangles = vec![Triangle::new(0, 1, 2, 0xFF0000FF), Triangle::new(1, 3, 2, 0xFF00FF00)];
        Mesh::new(vertices, tex_coords, triangles).unwrap()
    }

    #[test]
    fn round_trip_is_structurally_equal() {
        let mesh = sample_mesh();
        let meshlets = generate_meshlets(&mesh, 64, 126);
        let path = temp_path("roundtrip");

        store(&path, mesh.vertices().len() as u32, mesh.triangles().len() as u32, &meshlets).unwrap();
        let loaded = load(&path, mesh.vertices().len() as u32, mesh.triangles().len() as u32).unwrap();

        assert_eq!(loaded.len(), meshlets.len());
        for (a, b) in meshlets.iter().zip(&loaded) {
            assert_eq!(a.vertex_indices, b.vertex_indices);
            assert_eq!(a.triangle_indices, b.triangle_indices);
            assert!((a.bounds_center.x - b.bounds_center.x).abs() <= f32::EPSILON);
            assert!((a.bounds_radius - b.bounds_radius).abs() <= f32::EPSILON);
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_magic_is_rejected() {
        let mesh = sample_mesh();
        let meshlets = generate_meshlets(&mesh, 64, 126);
        let path = temp_path("badmagic");
        store(&path, mesh.vertices().len() as u32, mesh.triangles().len() as u32, &meshlets).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            load(&path, mesh.vertices().len() as u32, mesh.triangles().len() as u32),
            Err(CacheError::BadMagic)
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let mesh = sample_mesh();
        let meshlets = generate_meshlets(&mesh, 64, 126);
        let path = temp_path("countmismatch");
        store(&path, mesh.vertices().len() as u32, mesh.triangles().len() as u32, &meshlets).unwrap();

        assert!(matches!(
            load(&path, mesh.vertices().len() as u32 + 1, mesh.triangles().len() as u32),
            Err(CacheError::CountMismatch)
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = temp_path("missing");
        assert!(matches!(load(&path, 0, 0), Err(CacheError::Io(_))));
    }
}
