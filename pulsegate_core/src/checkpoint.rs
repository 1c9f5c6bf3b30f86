//! Model blob persistence.
//!
//! The on-disk layout is a fixed 4-byte magic, the bincode-encoded
//! network snapshot under a deterministic codec, and a trailing
//! little-endian `f32` holding the accuracy measured at save time.
//! Anything that fails during load (missing file, wrong magic, decode
//! error, truncated trailer) degrades to "no usable model"; the caller
//! starts from a fresh network rather than aborting.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;

use crate::error::{EngineError, EngineResult};
use crate::neural::StressNetwork;

/// Magic prefix identifying a model blob.
pub const MODEL_MAGIC: [u8; 4] = *b"PGN1";

/// Deterministic binary codec shared by save and load.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_little_endian()
}

/// Writes the network and its measured accuracy to `path`.
pub fn save_model(network: &StressNetwork, accuracy: f32, path: &Path) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::storage(path, e))?;
        }
    }

    let file = File::create(path).map_err(|e| EngineError::storage(path, e))?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(&MODEL_MAGIC)
        .map_err(|e| EngineError::storage(path, e))?;
    codec()
        .serialize_into(&mut writer, network)
        .map_err(|e| match *e {
            bincode::ErrorKind::Io(io) => EngineError::storage(path, io),
            other => EngineError::model_unavailable(format!("encode failed: {other}")),
        })?;
    writer
        .write_all(&accuracy.to_le_bytes())
        .map_err(|e| EngineError::storage(path, e))?;
    writer.flush().map_err(|e| EngineError::storage(path, e))?;
    Ok(())
}

/// Reads a network and its stored accuracy back from `path`.
///
/// Every failure mode maps to [`EngineError::ModelUnavailable`] so the
/// caller can uniformly fall back to an untrained network.
pub fn load_model(path: &Path) -> EngineResult<(StressNetwork, f32)> {
    let file = File::open(path)
        .map_err(|e| EngineError::model_unavailable(format!("cannot open {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| EngineError::model_unavailable("blob too short for magic"))?;
    if magic != MODEL_MAGIC {
        return Err(EngineError::model_unavailable("magic mismatch"));
    }

    let network: StressNetwork = codec()
        .deserialize_from(&mut reader)
        .map_err(|e| EngineError::model_unavailable(format!("decode failed: {e}")))?;

    let mut accuracy_bytes = [0u8; 4];
    reader
        .read_exact(&mut accuracy_bytes)
        .map_err(|_| EngineError::model_unavailable("missing accuracy trailer"))?;
    let accuracy = f32::from_le_bytes(accuracy_bytes);

    Ok((network, accuracy))
}
