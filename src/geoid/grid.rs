//! GeographicLib geoid grids in PGM form.
//!
//! The `egm*.pgm` files distributed with GeographicLib are 16-bit binary PGM
//! rasters whose header comments carry an `Offset` and `Scale`; undulation at
//! a node is `offset + scale * raw`. Rows run from 90°N to 90°S inclusive,
//! columns from 0°E eastward with periodic wrap.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::GeoidError;

pub struct GeoidGrid {
    width: usize,
    height: usize,
    offset: f64,
    scale: f64,
    data: Vec<u16>,
}

impl GeoidGrid {
    /// Load a grid from a `.pgm` file on disk. The whole raster is read into
    /// memory (≈150 MB for egm2008-5).
    pub fn open(path: &Path) -> Result<Self, GeoidError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a grid from any reader producing PGM bytes.
    pub fn from_reader<R: BufRead>(mut r: R) -> Result<Self, GeoidError> {
        let mut magic = [0u8; 2];
        r.read_exact(&mut magic)?;
        if &magic != b"P5" {
            return Err(GeoidError::Malformed("not a binary (P5) PGM file".into()));
        }

        let mut offset = None;
        let mut scale = None;

        let width = next_header_value(&mut r, &mut offset, &mut scale)?;
        let height = next_header_value(&mut r, &mut offset, &mut scale)?;
        let maxval = next_header_value(&mut r, &mut offset, &mut scale)?;

        if maxval != 65535 {
            return Err(GeoidError::Malformed(format!(
                "expected 16-bit samples (maxval 65535), got {maxval}"
            )));
        }
        if width < 2 || height < 2 {
            return Err(GeoidError::Malformed(format!(
                "grid too small: {width}x{height}"
            )));
        }
        let offset = offset.ok_or_else(|| GeoidError::Malformed("missing Offset comment".into()))?;
        let scale = scale.ok_or_else(|| GeoidError::Malformed("missing Scale comment".into()))?;

        let mut raw = vec![0u8; width * height * 2];
        r.read_exact(&mut raw)?;
        let data = raw
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();

        Ok(Self {
            width,
            height,
            offset,
            scale,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Geoid undulation N at (lat°, lon°) by bilinear interpolation between
    /// the four surrounding grid nodes. `None` outside the valid latitude
    /// range; longitude wraps.
    pub fn undulation(&self, lat: f64, lon: f64) -> Option<f64> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return None;
        }

        let row_step = 180.0 / (self.height - 1) as f64;
        let col_step = 360.0 / self.width as f64;

        let y = (90.0 - lat) / row_step;
        let x = lon.rem_euclid(360.0) / col_step;

        // Clamp the south edge so lat = -90 still has a 2-node neighborhood
        let y0 = (y.floor() as usize).min(self.height - 2);
        let x0 = (x.floor() as usize) % self.width;
        let x1 = (x0 + 1) % self.width;

        let dy = y - y0 as f64;
        let dx = x - x.floor();

        let v00 = self.node(y0, x0);
        let v10 = self.node(y0, x1);
        let v01 = self.node(y0 + 1, x0);
        let v11 = self.node(y0 + 1, x1);

        let raw = v00 * (1.0 - dx) * (1.0 - dy)
            + v10 * dx * (1.0 - dy)
            + v01 * (1.0 - dx) * dy
            + v11 * dx * dy;

        Some(self.offset + self.scale * raw)
    }

    fn node(&self, row: usize, col: usize) -> f64 {
        f64::from(self.data[row * self.width + col])
    }
}

/// Read the next whitespace-delimited header token, capturing `Offset` and
/// `Scale` comment values along the way.
fn next_header_value<R: BufRead>(
    r: &mut R,
    offset: &mut Option<f64>,
    scale: &mut Option<f64>,
) -> Result<usize, GeoidError> {
    let mut token = String::new();
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        let c = byte[0];

        if c == b'#' {
            let mut line = String::new();
            r.read_line(&mut line)?;
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("Offset"), Some(v)) => *offset = v.parse().ok(),
                (Some("Scale"), Some(v)) => *scale = v.parse().ok(),
                _ => {}
            }
            continue;
        }

        if c.is_ascii_whitespace() {
            if token.is_empty() {
                continue;
            }
            // The whitespace byte ending the final header token is the single
            // delimiter before the raster data
            break;
        }

        token.push(c as char);
    }

    token
        .parse()
        .map_err(|_| GeoidError::Malformed(format!("bad header token '{token}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    /// 4x3 grid: rows at lat 90/0/-90, columns at lon 0/90/180/270.
    fn test_grid(raw: &[u16]) -> GeoidGrid {
        assert_eq!(raw.len(), 12);
        let mut bytes = b"P5\n# Geoid test file\n# Offset -10\n# Scale 0.5\n4 3\n65535\n".to_vec();
        for v in raw {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        GeoidGrid::from_reader(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_header_parsing() {
        let grid = test_grid(&[0; 12]);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
    }

    #[test]
    fn test_node_values_exact() {
        let raw: Vec<u16> = (0..12).collect();
        let grid = test_grid(&raw);

        // Node (row 1, col 2) is lat 0, lon 180; raw value 6
        assert_relative_eq!(grid.undulation(0.0, 180.0).unwrap(), -10.0 + 0.5 * 6.0);
        // Node (row 0, col 0) is the north pole at lon 0; raw value 0
        assert_relative_eq!(grid.undulation(90.0, 0.0).unwrap(), -10.0);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let raw: Vec<u16> = vec![0, 0, 0, 0, 100, 200, 100, 200, 0, 0, 0, 0];
        let grid = test_grid(&raw);

        // Halfway between lon 0 (raw 100) and lon 90 (raw 200) on the equator row
        let n = grid.undulation(0.0, 45.0).unwrap();
        assert_relative_eq!(n, -10.0 + 0.5 * 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_longitude_wraps() {
        let raw: Vec<u16> = vec![0, 0, 0, 0, 100, 0, 0, 200, 0, 0, 0, 0];
        let grid = test_grid(&raw);

        // lon -45 ≡ 315: halfway between col 3 (raw 200) and col 0 (raw 100)
        let n = grid.undulation(0.0, -45.0).unwrap();
        assert_relative_eq!(n, -10.0 + 0.5 * 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_south_pole_in_range() {
        let grid = test_grid(&[0; 12]);
        assert!(grid.undulation(-90.0, 10.0).is_some());
    }

    #[test]
    fn test_out_of_range_latitude() {
        let grid = test_grid(&[0; 12]);
        assert!(grid.undulation(91.0, 0.0).is_none());
        assert!(grid.undulation(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_rejects_non_pgm() {
        let res = GeoidGrid::from_reader(Cursor::new(b"P6\n1 1\n255\n".to_vec()));
        assert!(res.is_err());
    }

    #[test]
    fn test_rejects_missing_offset() {
        let mut bytes = b"P5\n# Scale 0.5\n2 2\n65535\n".to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(GeoidGrid::from_reader(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_rejects_8_bit() {
        let mut bytes = b"P5\n# Offset 0\n# Scale 1\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[0u8; 4]);
        assert!(GeoidGrid::from_reader(Cursor::new(bytes)).is_err());
    }
}
