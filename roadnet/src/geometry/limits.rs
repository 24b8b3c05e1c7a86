// Centralized ingestion limits to harden against untrusted config files

// Network size caps
pub const MAX_NODES: usize = 2_000_000;
pub const MAX_MARKERS: usize = 100_000;
pub const MAX_LINKS_PER_NODE: usize = 1_024;

// Numeric bounds (world units; FS maps are at most 16x the base 2048 map)
pub const COORD_MIN: f64 = -1_000_000.0;
pub const COORD_MAX: f64 = 1_000_000.0;

#[inline]
pub fn in_coord_bounds(v: f64) -> bool {
    v.is_finite() && (COORD_MIN..=COORD_MAX).contains(&v)
}
