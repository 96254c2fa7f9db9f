//! Deterministic mine-field oracle.
//!
//! Given a seed and a coordinate, `Oracle` answers whether a cell is a
//! mine and how many of its eight toroidal neighbours are mines,
//! without ever materialising the field. The same `(seed, x, y)` always
//! yields the same answer.

use sha2::{Digest, Sha256};

pub const DEFAULT_DENSITY: f64 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapDimensions {
    pub width: i64,
    pub height: i64,
}

impl MapDimensions {
    pub const fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Debug)]
pub struct Oracle {
    seed: String,
    density: f64,
    dims: MapDimensions,
}

impl Oracle {
    pub fn new(seed: impl Into<String>, dims: MapDimensions) -> Self {
        Self::with_density(seed, dims, DEFAULT_DENSITY)
    }

    pub fn with_density(seed: impl Into<String>, dims: MapDimensions, density: f64) -> Self {
        Self {
            seed: seed.into(),
            density,
            dims,
        }
    }

    pub fn dimensions(&self) -> MapDimensions {
        self.dims
    }

    /// `isMine(x, y)`. Out-of-range coordinates return `false` and are logged,
    /// never panicked on.
    pub fn is_mine(&self, x: i64, y: i64) -> bool {
        if !self.in_range(x, y) {
            tracing::warn!(x, y, "oracle: coordinate out of range, treating as non-mine");
            return false;
        }
        self.hash_unit_interval(x, y) < self.density
    }

    /// `adjacentMines(x, y)`, summing the eight toroidal neighbours.
    pub fn adjacent_mines(&self, x: i64, y: i64) -> u8 {
        if !self.in_range(x, y) {
            tracing::warn!(x, y, "oracle: coordinate out of range, adjacency is zero");
            return 0;
        }

        let mut count = 0u8;
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = self.wrap(x + dx, self.dims.width);
                let ny = self.wrap(y + dy, self.dims.height);
                if self.hash_unit_interval(nx, ny) < self.density {
                    count += 1;
                }
            }
        }
        count
    }

    fn in_range(&self, x: i64, y: i64) -> bool {
        (0..self.dims.width).contains(&x) && (0..self.dims.height).contains(&y)
    }

    fn wrap(&self, v: i64, modulus: i64) -> i64 {
        ((v % modulus) + modulus) % modulus
    }

    /// SHA-256(`seed || ":" || x || "," || y`), first 8 bytes as a
    /// big-endian u64, normalised to `[0, 1)`.
    fn hash_unit_interval(&self, x: i64, y: i64) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(b":");
        hasher.update(x.to_string().as_bytes());
        hasher.update(b",");
        hasher.update(y.to_string().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let h = u64::from_be_bytes(bytes);

        h as f64 / (u64::MAX as f64 + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> Oracle {
        Oracle::new("TEST_SEED_A1B2C3D4", MapDimensions::new(640, 640))
    }

    #[test]
    fn is_mine_is_pure() {
        let o = oracle();
        assert_eq!(o.is_mine(100, 100), o.is_mine(100, 100));
        assert_eq!(o.is_mine(0, 0), o.is_mine(0, 0));
    }

    #[test]
    fn different_seeds_generally_disagree() {
        let a = Oracle::new("seed-one", MapDimensions::new(640, 640));
        let b = Oracle::new("seed-two", MapDimensions::new(640, 640));
        let disagreements = (0..50)
            .filter(|&x| a.is_mine(x, 0) != b.is_mine(x, 0))
            .count();
        assert!(disagreements > 0);
    }

    #[test]
    fn adjacent_mines_matches_manual_sum() {
        let o = oracle();
        let (x, y) = (200, 300);
        let mut expected = 0u8;
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = ((x + dx) % 640 + 640) % 640;
                let ny = ((y + dy) % 640 + 640) % 640;
                if o.is_mine(nx, ny) {
                    expected += 1;
                }
            }
        }
        assert_eq!(o.adjacent_mines(x, y), expected);
    }

    #[test]
    fn wraps_at_origin_corner() {
        let o = oracle();
        // (0,0)'s neighbour set must include (W-1, H-1); just assert it doesn't panic
        // and stays within bounds.
        assert!(o.adjacent_mines(0, 0) <= 8);
    }

    #[test]
    fn out_of_range_never_panics() {
        let o = oracle();
        assert!(!o.is_mine(-1, 0));
        assert!(!o.is_mine(0, 640));
        assert_eq!(o.adjacent_mines(-5, 999), 0);
    }

    proptest::proptest! {
        #[test]
        fn density_is_roughly_respected(seed in "[a-zA-Z0-9]{10,20}") {
            let o = Oracle::new(seed, MapDimensions::new(640, 640));
            let mut mines = 0u32;
            let samples = 2000u32;
            for i in 0..samples {
                if o.is_mine((i * 37) as i64 % 640, (i * 53) as i64 % 640) {
                    mines += 1;
                }
            }
            let ratio = mines as f64 / samples as f64;
            proptest::prop_assert!(ratio > 0.05 && ratio < 0.30);
        }
    }
}
