//! Shared fixtures: single-file NIfTI-1 volumes, gzip-compressed when the
//! file name ends in `.gz`

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER_SIZE: usize = 348;
const VOX_OFFSET: usize = 352;
const DT_FLOAT32: i16 = 16;

/// Writes a float32 `.nii` or `.nii.gz` file; `value(x, y, z)` gives each voxel
pub fn write_nifti(
    path: &Path,
    dims: [usize; 3],
    spacing: [f32; 3],
    value: impl Fn(usize, usize, usize) -> f32,
) {
    let mut bytes = vec![0u8; VOX_OFFSET];
    put_i32(&mut bytes, 0, HEADER_SIZE as i32);

    let dim: [i16; 8] = [3, dims[0] as i16, dims[1] as i16, dims[2] as i16, 1, 1, 1, 1];
    for (i, d) in dim.iter().enumerate() {
        put_i16(&mut bytes, 40 + 2 * i, *d);
    }
    put_i16(&mut bytes, 70, DT_FLOAT32);
    put_i16(&mut bytes, 72, 32);

    let pixdim: [f32; 8] = [1.0, spacing[0], spacing[1], spacing[2], 1.0, 1.0, 1.0, 1.0];
    for (i, p) in pixdim.iter().enumerate() {
        put_f32(&mut bytes, 76 + 4 * i, *p);
    }
    put_f32(&mut bytes, 108, VOX_OFFSET as f32);
    put_f32(&mut bytes, 112, 1.0);
    put_f32(&mut bytes, 116, 0.0);
    bytes[344..348].copy_from_slice(b"n+1\0");

    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                bytes.extend_from_slice(&value(x, y, z).to_le_bytes());
            }
        }
    }

    let gzipped = path.extension().is_some_and(|ext| ext == "gz");
    if gzipped {
        let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        encoder.finish().unwrap();
    } else {
        fs::write(path, bytes).unwrap();
    }
}

fn put_i16(buf: &mut [u8], at: usize, v: i16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_i32(buf: &mut [u8], at: usize, v: i32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut [u8], at: usize, v: f32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// 12x12x12 image with a smooth intensity ramp, 1 mm voxels
pub fn write_phantom(path: &Path, offset: f32) {
    write_nifti(path, [12, 12, 12], [1.0, 1.0, 1.0], |x, y, z| {
        offset + 10.0 * x as f32 + 3.0 * y as f32 + (z * z) as f32
    });
}

/// Matching mask labelling a 4x4x4 cube starting at `start`
pub fn write_cube_mask(path: &Path, start: usize) {
    write_nifti(path, [12, 12, 12], [1.0, 1.0, 1.0], |x, y, z| {
        let inside = |c: usize| c >= start && c < start + 4;
        if inside(x) && inside(y) && inside(z) {
            1.0
        } else {
            0.0
        }
    });
}

/// Image and mask directories for a batch run
pub struct CaseDirs {
    pub images: PathBuf,
    pub masks: PathBuf,
}

impl CaseDirs {
    pub fn new(root: &Path) -> Self {
        let images = root.join("images");
        let masks = root.join("masks");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&masks).unwrap();
        Self { images, masks }
    }

    /// Adds a well-formed case under `name` in both directories
    pub fn add_case(&self, name: &str, offset: f32, cube_start: usize) {
        self.add_named_case(name, name, offset, cube_start);
    }

    /// Adds a well-formed case whose mask file has its own name
    pub fn add_named_case(&self, image: &str, mask: &str, offset: f32, cube_start: usize) {
        write_phantom(&self.images.join(image), offset);
        write_cube_mask(&self.masks.join(mask), cube_start);
    }
}
