use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffle `0..size` and cut it into groups of `batch_size`
///
/// Every index appears exactly once; all groups have `batch_size` entries
/// except possibly the last. A zero `batch_size` yields no groups.
pub fn batch_indices<R: Rng + ?Sized>(size: usize, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    if batch_size == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = (0..size).collect();
    indices.shuffle(rng);
    indices.chunks(batch_size).map(<[usize]>::to_vec).collect()
}
