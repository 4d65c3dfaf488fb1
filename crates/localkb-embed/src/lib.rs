//! localkb-embed
//!
//! Text encoders for the vector branch: a candle BERT encoder for real
//! models and a feature-hashing encoder that needs no model files.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use localkb_core::config::{EncoderKind, KbConfig};
use localkb_core::traits::Encoder;

pub mod bert;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use bert::BertEncoder;
pub use device::select_device;
pub use hash::HashEncoder;
pub use pool::masked_mean_l2;

/// Build the encoder selected by `config.embed.encoder`.
pub fn load_encoder(config: &KbConfig, project_root: &Path) -> Result<Box<dyn Encoder>> {
    match config.embed.encoder {
        EncoderKind::Hash => {
            info!(dim = config.embed.hash_dim, "using hash encoder");
            Ok(Box::new(HashEncoder::new(config.embed.hash_dim)))
        }
        EncoderKind::Bert => {
            let dir = config.model_dir(project_root);
            Ok(Box::new(BertEncoder::load(
                &config.embed.model,
                &dir,
                config.embed.max_len,
                config.embed.batch_size,
            )?))
        }
    }
}
