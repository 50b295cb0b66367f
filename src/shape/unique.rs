//! Tolerance-based deduplication of fixed-width float tuples.

use std::collections::HashMap;

/// Number of hash keys after which a resettable table forgets its index.
pub const RESET_THRESHOLD: usize = 4000;

/// An append-only list of `[f32; N]` values where near-equal values share an
/// index.
///
/// Values are bucketed by the rounded sum of their components so a lookup only
/// has to compare against a handful of candidates. Two values match when every
/// component is within `tolerance`.
///
/// A table created with [`UniqueTable::resetting`] drops its lookup index once
/// it grows past [`RESET_THRESHOLD`] keys. Values already stored keep their
/// indices, but later duplicates of them get fresh entries. This trades a
/// slightly larger output for bounded lookup cost on huge meshes.
#[derive(Debug, Clone)]
pub struct UniqueTable<const N: usize> {
    values: Vec<[f32; N]>,
    index: HashMap<i64, Vec<usize>>,
    scale: f64,
    tolerance: f32,
    /// How many neighbouring keys can hold a match.
    reach: i64,
    reset_threshold: Option<usize>,
}

impl<const N: usize> UniqueTable<N> {
    /// `precision` is the number of decimal places used for bucketing.
    pub fn new(precision: i32, tolerance: f32) -> Self {
        let scale = 10f64.powi(precision);
        let reach = (N as f64 * tolerance as f64 * scale).ceil().max(1.0) as i64;
        Self {
            values: Vec::new(),
            index: HashMap::new(),
            scale,
            tolerance,
            reach,
            reset_threshold: None,
        }
    }

    pub fn resetting(mut self, enabled: bool) -> Self {
        self.reset_threshold = enabled.then_some(RESET_THRESHOLD);
        self
    }

    fn key(&self, value: &[f32; N]) -> i64 {
        let sum: f64 = value.iter().map(|&c| c as f64).sum();
        (sum * self.scale).round() as i64
    }

    fn matches(&self, a: &[f32; N], b: &[f32; N]) -> bool {
        a.iter().zip(b).all(|(a, b)| (a - b).abs() <= self.tolerance)
    }

    pub fn find(&self, value: &[f32; N]) -> Option<usize> {
        let key = self.key(value);
        (key - self.reach..=key + self.reach)
            .filter_map(|k| self.index.get(&k))
            .flatten()
            .copied()
            .find(|&i| self.matches(&self.values[i], value))
    }

    /// Return the index of a stored value matching `value`, adding it if none does.
    pub fn insert(&mut self, value: [f32; N]) -> usize {
        if let Some(existing) = self.find(&value) {
            return existing;
        }

        if self
            .reset_threshold
            .is_some_and(|threshold| self.index.len() > threshold)
        {
            self.index.clear();
        }

        let idx = self.values.len();
        let key = self.key(&value);
        self.values.push(value);
        self.index.entry(key).or_default().push(idx);
        idx
    }

    /// Forget the lookup index without touching stored values.
    pub fn reset(&mut self) {
        self.index.clear();
    }

    pub fn values(&self) -> &[[f32; N]] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl UniqueTable<2> {
    pub fn uv_points() -> Self {
        Self::new(3, 1e-4)
    }
}

impl UniqueTable<3> {
    pub fn normals() -> Self {
        Self::new(2, 1e-3)
    }

    /// Point merging done by the final compaction pass.
    pub fn points() -> Self {
        Self::new(3, 1e-4)
    }
}

impl UniqueTable<4> {
    pub fn colours() -> Self {
        Self::new(3, 1e-4)
    }
}

impl UniqueTable<5> {
    /// Light materials hold four colour indices and a specular power.
    pub fn light_materials() -> Self {
        Self::new(1, 0.01)
    }
}
