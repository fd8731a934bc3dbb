//! Stored filename generation.

use rand::RngCore;

/// Random bytes per generated name (128 bits).
pub const NAME_ENTROPY_BYTES: usize = 16;

/// Generate a stored name: 32 lowercase hex characters, a dot, then `extension`.
///
/// Uses the thread-local CSPRNG. Collisions are not checked for.
pub fn generate_name(extension: &str) -> String {
    let mut bytes = [0u8; NAME_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}.{}", hex::encode(bytes), extension)
}

/// Name of the sibling file that receives bytes until the upload is committed.
pub fn in_progress_name(generated_name: &str) -> String {
    format!(".{generated_name}.part")
}
