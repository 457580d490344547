/// Frequency-domain view of a live microphone stream.
///
/// Only meaningful while the stream it was created from is live.
pub trait AnalysisTap: Send {
    /// Number of magnitude bins (half the transform size).
    fn frequency_bin_count(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Write the current byte magnitudes (0–255) into `out`. Writes at most
    /// `min(out.len(), frequency_bin_count())` bins.
    fn fill_byte_frequency_data(&mut self, out: &mut [u8]);
}
