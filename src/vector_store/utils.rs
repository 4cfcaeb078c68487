/// Vector width of the ingestion index.
pub const INDEX_DIMENSIONS: usize = 1024;

/// Resize an embedding to exactly `dimensions` entries: truncate if longer,
/// right-pad with zeros if shorter.
pub fn fit_to_dimensions(mut vector: Vec<f32>, dimensions: usize) -> Vec<f32> {
    vector.resize(dimensions, 0.0);
    vector
}
