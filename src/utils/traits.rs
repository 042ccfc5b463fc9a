use bincode::{config, Decode, Encode};

use crate::fs::Result;

/// Trait for on-disk records that travel through bincode in the fixed legacy layout
/// # Note
/// This trait is implemented for all types implementing [Encode] and [Decode]
pub trait BlockCodec: Encode + Decode<()> + Sized {
    /// encode into the front of `buf`
    /// # Returns
    /// The number of bytes written if successful
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(bincode::encode_into_slice(self, buf, config::legacy())?)
    }

    /// decode from the front of `buf`
    /// # Returns
    /// A tuple containing the decoded object and the number of bytes read
    fn decode_from(buf: &[u8]) -> Result<(Self, usize)> {
        Ok(bincode::decode_from_slice(buf, config::legacy())?)
    }
}

impl<T> BlockCodec for T where T: Encode + Decode<()> {}
