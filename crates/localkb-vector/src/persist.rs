use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::{debug, instrument, warn};

use localkb_core::store::write_atomic;
use localkb_core::{KbError, Result};

use crate::codec;
use crate::flat::FlatIpIndex;

/// Stream the index into a temp file and publish it over `path`. If the
/// streamed write fails the whole blob is rendered in memory and published
/// with a single write instead.
#[instrument(skip(index), fields(rows = index.len(), dim = index.dim()))]
pub fn save_index(index: &FlatIpIndex, path: &Path) -> Result<()> {
    save_index_with(index, path, |idx, w| codec::write_to(idx, w))
}

fn save_index_with<F>(index: &FlatIpIndex, path: &Path, stream: F) -> Result<()>
where
    F: FnOnce(&FlatIpIndex, &mut BufWriter<&File>) -> io::Result<()>,
{
    match write_atomic(path, |w| stream(index, w)) {
        Ok(()) => Ok(()),
        Err(primary) => {
            warn!(error = %primary, path = %path.display(), "streamed index write failed, using byte buffer");
            save_index_bytes(index, path)
        }
    }
}

pub fn save_index_bytes(index: &FlatIpIndex, path: &Path) -> Result<()> {
    let bytes = codec::to_bytes(index)?;
    write_atomic(path, |w| w.write_all(&bytes))
}

/// `Ok(None)` when no index has been built. A blob that fails to stream is
/// read whole and decoded again before giving up.
#[instrument]
pub fn load_index(path: &Path) -> Result<Option<FlatIpIndex>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            warn!(error = %e, "opening index for streaming failed, using byte buffer");
            return load_index_bytes(path);
        }
    };
    match codec::read_from(&mut BufReader::new(file)) {
        Ok(index) => {
            debug!(rows = index.len(), dim = index.dim(), "loaded vector index");
            Ok(Some(index))
        }
        Err(e) => {
            warn!(error = %e, "streamed index read failed, using byte buffer");
            load_index_bytes(path)
        }
    }
}

pub fn load_index_bytes(path: &Path) -> Result<Option<FlatIpIndex>> {
    match std::fs::read(path) {
        Ok(bytes) => codec::from_bytes(&bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(KbError::io(path, e)),
    }
}
