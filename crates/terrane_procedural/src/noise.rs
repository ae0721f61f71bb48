//! # Seeded Base Noise
//!
//! Deterministic 2D gradient noise. Each generator owns its permutation
//! table, built once from a [`WorldSeed`]; there is no process-wide cache.
//! Share a generator between tasks through `Arc`.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, both generators produce **exactly** the same
//! values on any platform, in any sampling order.

/// World seed for deterministic generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives an independent sub-seed for `purpose`.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0 ^ purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x7E22_A4E0_5EED_0001)
    }
}

/// Sub-seed purpose for the simplex generator.
pub const SIMPLEX_PURPOSE: u64 = 1;
/// Sub-seed purpose for the Perlin generator.
pub const PERLIN_PURPOSE: u64 = 2;

/// Anything that yields a 2D noise value for a coordinate.
pub trait NoiseSource: Send + Sync {
    /// Samples the noise at `(x, z)`. Roughly in `[-1, 1]`.
    fn sample(&self, x: f64, z: f64) -> f64;
}

/// Seed-shuffled permutation plus the 2D gradient set.
#[derive(Clone, Debug)]
struct PermutationTable {
    /// 256 entries, doubled so `perm[i + perm[j]]` never wraps.
    perm: [u8; 512],
}

impl PermutationTable {
    const GRADIENTS: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates driven by xorshift64; a zero state would stick at zero
        let mut state = seed.value() | 1;
        for i in (1..256).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            perm.swap(i, j);
        }

        let (low, high) = perm.split_at_mut(256);
        high.copy_from_slice(low);

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    #[inline]
    fn hash(&self, x: i32, z: i32) -> usize {
        self.get((x & 255) as usize + self.get((z & 255) as usize))
    }

    #[inline]
    fn dot(hash: usize, x: f64, z: f64) -> f64 {
        let g = Self::GRADIENTS[hash % 12];
        f64::from(g[0]) * x + f64::from(g[1]) * z
    }
}

/// 2D simplex noise.
///
/// Output is in `[-1, 1]`.
///
/// # Example
///
/// ```rust,ignore
/// let noise = SimplexNoise::new(WorldSeed::new(42));
/// let value = noise.sample(100.5, 200.3);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Clone, Debug)]
pub struct SimplexNoise {
    seed: WorldSeed,
    table: PermutationTable,
}

impl SimplexNoise {
    /// (sqrt(3) - 1) / 2
    const F2: f64 = 0.366_025_403_784_439;
    /// (3 - sqrt(3)) / 6
    const G2: f64 = 0.211_324_865_405_187;

    /// Creates a generator keyed by `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            seed,
            table: PermutationTable::new(seed),
        }
    }

    /// The seed this generator was built from.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Samples 2D simplex noise.
    #[must_use]
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        if !(x.is_finite() && z.is_finite()) {
            return 0.0;
        }

        // Skew into simplex space to find the containing cell
        let skew = (x + z) * Self::F2;
        let cell_x = (x + skew).floor();
        let cell_z = (z + skew).floor();

        let unskew = (cell_x + cell_z) * Self::G2;
        let x0 = x - (cell_x - unskew);
        let z0 = z - (cell_z - unskew);
        let i = lattice_index(cell_x);
        let j = lattice_index(cell_z);

        // Upper or lower triangle
        let (i1, j1) = if x0 > z0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - f64::from(i1) + Self::G2;
        let z1 = z0 - f64::from(j1) + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let z2 = z0 - 1.0 + 2.0 * Self::G2;

        let n0 = Self::corner(x0, z0, self.table.hash(i, j));
        let n1 = Self::corner(x1, z1, self.table.hash(i + i1, j + j1));
        let n2 = Self::corner(x2, z2, self.table.hash(i + 1, j + 1));

        // 70 maps the summed kernels onto [-1, 1]
        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    #[inline]
    fn corner(x: f64, z: f64, hash: usize) -> f64 {
        let t = 0.5 - x * x - z * z;
        if t < 0.0 {
            0.0
        } else {
            let t2 = t * t;
            t2 * t2 * PermutationTable::dot(hash, x, z)
        }
    }
}

impl NoiseSource for SimplexNoise {
    #[inline]
    fn sample(&self, x: f64, z: f64) -> f64 {
        Self::sample(self, x, z)
    }
}

/// 2D classic gradient (Perlin) noise, the base layer of fractal fields.
///
/// Output is in `[-1, 1]` and exactly zero on integer lattice points.
#[derive(Clone, Debug)]
pub struct PerlinNoise {
    seed: WorldSeed,
    table: PermutationTable,
}

impl PerlinNoise {
    /// Creates a generator keyed by `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            seed,
            table: PermutationTable::new(seed),
        }
    }

    /// The seed this generator was built from.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Samples 2D Perlin noise.
    #[must_use]
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        if !(x.is_finite() && z.is_finite()) {
            return 0.0;
        }

        let cell_x = x.floor();
        let cell_z = z.floor();
        let xf = x - cell_x;
        let zf = z - cell_z;
        let xi = lattice_index(cell_x);
        let zi = lattice_index(cell_z);

        let u = fade(xf);
        let v = fade(zf);

        let aa = PermutationTable::dot(self.table.hash(xi, zi), xf, zf);
        let ba = PermutationTable::dot(self.table.hash(xi + 1, zi), xf - 1.0, zf);
        let ab = PermutationTable::dot(self.table.hash(xi, zi + 1), xf, zf - 1.0);
        let bb = PermutationTable::dot(self.table.hash(xi + 1, zi + 1), xf - 1.0, zf - 1.0);

        lerp(lerp(aa, ba, u), lerp(ab, bb, u), v).clamp(-1.0, 1.0)
    }
}

impl NoiseSource for PerlinNoise {
    #[inline]
    fn sample(&self, x: f64, z: f64) -> f64 {
        Self::sample(self, x, z)
    }
}

/// Quintic smoothstep `6t^5 - 15t^4 + 10t^3`.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Integer cell `cell` wrapped onto the 256-entry permutation period.
///
/// The result is in `0..256`, so neighbour offsets (`+ 1`) never overflow
/// however far out the sample coordinate is.
#[inline]
fn lattice_index(cell: f64) -> i32 {
    cell.rem_euclid(256.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let simplex_a = SimplexNoise::new(seed);
        let simplex_b = SimplexNoise::new(seed);
        let perlin_a = PerlinNoise::new(seed);
        let perlin_b = PerlinNoise::new(seed);

        for i in 0..200 {
            let x = f64::from(i) * 0.37 - 20.0;
            let z = f64::from(i) * 0.19 + 5.0;
            assert_eq!(simplex_a.sample(x, z), simplex_b.sample(x, z), "simplex must be deterministic");
            assert_eq!(perlin_a.sample(x, z), perlin_b.sample(x, z), "perlin must be deterministic");
        }
    }

    #[test]
    fn test_order_independence() {
        let noise = SimplexNoise::new(WorldSeed::new(9));
        let forward: Vec<f64> = (0..64).map(|i| noise.sample(f64::from(i) * 0.3, 1.5)).collect();
        let mut backward: Vec<f64> = (0..64).rev().map(|i| noise.sample(f64::from(i) * 0.3, 1.5)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_different_seeds_different_results() {
        let a = SimplexNoise::new(WorldSeed::new(1));
        let b = SimplexNoise::new(WorldSeed::new(2));
        let differs = (0..32).any(|i| {
            let x = f64::from(i) * 1.7 + 0.3;
            a.sample(x, x * 0.5) != b.sample(x, x * 0.5)
        });
        assert!(differs, "different seeds should produce different noise");
    }

    #[test]
    fn test_range() {
        let simplex = SimplexNoise::new(WorldSeed::new(42));
        let perlin = PerlinNoise::new(WorldSeed::new(42));

        for i in 0..10_000 {
            let x = f64::from(i) * 0.1 - 500.0;
            let z = f64::from(i) * 0.13 - 650.0;
            let s = simplex.sample(x, z);
            let p = perlin.sample(x, z);
            assert!((-1.0..=1.0).contains(&s), "simplex {s} out of range at ({x}, {z})");
            assert!((-1.0..=1.0).contains(&p), "perlin {p} out of range at ({x}, {z})");
        }
    }

    #[test]
    fn test_continuity() {
        let noise = PerlinNoise::new(WorldSeed::new(42));
        let v1 = noise.sample(10.3, 4.7);
        let v2 = noise.sample(10.301, 4.7);
        assert!((v1 - v2).abs() < 0.01, "noise should be continuous");
    }

    #[test]
    fn test_perlin_zero_on_lattice() {
        let noise = PerlinNoise::new(WorldSeed::new(7));
        for x in -4..4 {
            for z in -4..4 {
                assert_eq!(noise.sample(f64::from(x), f64::from(z)), 0.0);
            }
        }
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        assert_ne!(base.derive(SIMPLEX_PURPOSE), base.derive(PERLIN_PURPOSE));
        assert_eq!(base.derive(SIMPLEX_PURPOSE), base.derive(SIMPLEX_PURPOSE));
        assert_ne!(base.derive(SIMPLEX_PURPOSE), base);
    }

    #[test]
    fn test_lattice_index_wraps() {
        assert_eq!(lattice_index((-0.5f64).floor()), 255);
        assert_eq!(lattice_index(-256.0), 0);
        assert_eq!(lattice_index(2.0), 2);
        assert_eq!(lattice_index(257.0), 1);
        assert_eq!(lattice_index(3.0e12), (3.0e12f64 % 256.0) as i32);
    }

    #[test]
    fn test_far_coordinates_stay_in_range() {
        let simplex = SimplexNoise::new(WorldSeed::new(42));
        let perlin = PerlinNoise::new(WorldSeed::new(42));

        // Past i32::MAX in both directions
        let coords = [
            (2.2e9, 0.5),
            (-2.2e9, 7.25),
            (3.0e12, -5.0e12),
            (f64::from(i32::MAX) + 0.5, f64::from(i32::MIN) - 0.5),
        ];
        for (x, z) in coords {
            let s = simplex.sample(x, z);
            let p = perlin.sample(x, z);
            assert!((-1.0..=1.0).contains(&s), "simplex {s} at ({x}, {z})");
            assert!((-1.0..=1.0).contains(&p), "perlin {p} at ({x}, {z})");
        }
    }

    #[test]
    fn test_perlin_repeats_every_256_cells() {
        let noise = PerlinNoise::new(WorldSeed::new(3));
        for i in 0..16 {
            let x = f64::from(i) * 0.25 + 0.125;
            let near = noise.sample(x, 1.5);
            let far = noise.sample(x + 256.0 * 1_000.0, 1.5);
            assert!((near - far).abs() < 1e-9, "period mismatch at {x}");
        }
    }

    #[test]
    fn test_non_finite_input_is_zero() {
        let simplex = SimplexNoise::new(WorldSeed::new(1));
        let perlin = PerlinNoise::new(WorldSeed::new(1));
        assert_eq!(simplex.sample(f64::INFINITY, 0.0), 0.0);
        assert_eq!(perlin.sample(0.0, f64::NAN), 0.0);
    }
}
