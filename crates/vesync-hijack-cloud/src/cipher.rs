//! Vendor frame cipher: AES-128-CBC, fixed key and IV, null padding.
//!
//! Plaintext is padded with null bytes to a block multiple before
//! encryption (always at least one null, so an aligned message gains a full
//! block), and truncated at the first null after decryption.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CloudError, Result};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const AES_KEY: [u8; 16] = *b"llwantaeskey1.01";
pub const AES_IV: [u8; 16] = *b"llwantaesivv1.01";
pub const BLOCK_SIZE: usize = 16;

/// Null-pad and encrypt.
pub fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    let padded_len = (plaintext.len() / BLOCK_SIZE + 1) * BLOCK_SIZE;
    let mut buf = vec![0u8; padded_len];
    buf[..plaintext.len()].copy_from_slice(plaintext);

    Aes128CbcEnc::new(&AES_KEY.into(), &AES_IV.into()).encrypt_padded_vec_mut::<NoPadding>(&buf)
}

/// Decrypt and strip the null padding.
pub fn decrypt(ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = ciphertext.to_vec();
    Aes128CbcDec::new(&AES_KEY.into(), &AES_IV.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CloudError::Decrypt {
            len: ciphertext.len(),
            block: BLOCK_SIZE,
        })?;

    if let Some(end) = buf.iter().position(|&b| b == 0) {
        buf.truncate(end);
    }
    Ok(buf)
}
