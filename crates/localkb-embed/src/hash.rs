use std::hash::Hasher;

use localkb_core::traits::Encoder;
use twox_hash::XxHash64;

/// Feature-hashing encoder. Deterministic, model-free and fast, so it is the
/// encoder used by tests and by machines without model files.
///
/// Words are lowercased alphanumeric runs; words containing non-ASCII
/// characters also contribute each character so unsegmented scripts still
/// overlap on shared characters.
#[derive(Debug, Clone)]
pub struct HashEncoder {
    dim: usize,
    model_id: String,
}

impl HashEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), model_id: format!("hash-{}", dim.max(1)) }
    }

    pub fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        let words = lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty());
        for (i, word) in words.enumerate() {
            self.accumulate(&mut v, word, i);
            if !word.is_ascii() {
                let mut buf = [0u8; 4];
                for ch in word.chars() {
                    self.accumulate(&mut v, ch.encode_utf8(&mut buf), i);
                }
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn accumulate(&self, v: &mut [f32], feature: &str, position: usize) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(feature.as_bytes());
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
        v[idx] += val + (position % 3) as f32 * 0.01;
    }
}

impl Encoder for HashEncoder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}
