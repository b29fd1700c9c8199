use anyhow::{Error, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blowfish::Blowfish;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Encryptor = cbc::Encryptor<Blowfish>;
type Decryptor = cbc::Decryptor<Blowfish>;

const BLOCK_SIZE: usize = 8;

/// Reversible, url-safe obfuscation of short identifiers such as
/// recall ids embedded in click urls.
///
/// Plaintext is always extended with `8 - len % 8` zero bytes, so an
/// already aligned input gains a full block of zeros. Decryption does
/// not strip that padding, callers trim trailing zero bytes when the
/// payload is textual (see [`RecallCodec::decode_recall_id`]).
///
/// The base64 alphabet is remapped `+ -> -`, `/ -> _` and `= -> .` so
/// tokens survive unescaped in query strings.
#[derive(Clone)]
pub struct RecallCodec {
    encryptor: Encryptor,
    decryptor: Decryptor,
}

impl RecallCodec {
    /// Build a codec from a blowfish key (4 to 56 bytes) and an 8 byte iv
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, Error> {
        if iv.len() != BLOCK_SIZE {
            bail!(
                "Recall codec iv must be exactly {} bytes, got {}",
                BLOCK_SIZE,
                iv.len()
            );
        }

        let encryptor = Encryptor::new_from_slices(key, iv)
            .map_err(|_| anyhow!("Invalid recall codec key length {}", key.len()))?;
        let decryptor = Decryptor::new_from_slices(key, iv)
            .map_err(|_| anyhow!("Invalid recall codec key length {}", key.len()))?;

        Ok(RecallCodec {
            encryptor,
            decryptor,
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let padded_len = plaintext.len() + BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;

        let mut buf = Vec::with_capacity(padded_len);
        buf.extend_from_slice(plaintext);
        buf.resize(padded_len, 0);

        let ciphertext = match self
            .encryptor
            .clone()
            .encrypt_padded_mut::<NoPadding>(&mut buf, padded_len)
        {
            Ok(ciphertext) => ciphertext,
            // unreachable, the buffer is always block aligned
            Err(_) => return String::new(),
        };

        to_url_safe(&STANDARD.encode(ciphertext))
    }

    /// Best effort decryption. Malformed base64 or a truncated
    /// trailing block never fail, they yield whatever whole blocks
    /// could be recovered, possibly nothing.
    pub fn decrypt(&self, token: &str) -> Vec<u8> {
        let mut buf = STANDARD.decode(from_url_safe(token)).unwrap_or_default();
        buf.truncate(buf.len() - buf.len() % BLOCK_SIZE);

        match self
            .decryptor
            .clone()
            .decrypt_padded_mut::<NoPadding>(&mut buf)
        {
            Ok(plaintext) => plaintext.to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// Encrypts the decimal form of a recall id
    pub fn encode_recall_id(&self, id: u64) -> String {
        self.encrypt(id.to_string().as_bytes())
    }

    /// Recovers a recall id from a click token, trimming the zero
    /// padding before parsing the decimal payload
    pub fn decode_recall_id(&self, token: &str) -> Option<u64> {
        let plaintext = self.decrypt(token);
        let end = plaintext
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |pos| pos + 1);

        std::str::from_utf8(&plaintext[..end]).ok()?.parse().ok()
    }
}

fn to_url_safe(encoded: &str) -> String {
    encoded
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            '=' => '.',
            c => c,
        })
        .collect()
}

fn from_url_safe(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            '.' => '=',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> RecallCodec {
        RecallCodec::new(b"hello", b"whatwhat").unwrap()
    }

    #[test]
    fn test_round_trip_keeps_zero_padding() {
        let codec = codec();
        let plaintext = b"Hello this is a test";

        let token = codec.encrypt(plaintext);
        let decrypted = codec.decrypt(&token);

        assert_eq!(decrypted.len(), 24);
        assert_eq!(&decrypted[..plaintext.len()], plaintext);
        assert!(decrypted[plaintext.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_aligned_input_gains_full_block() {
        let codec = codec();

        let decrypted = codec.decrypt(&codec.encrypt(b"12345678"));

        assert_eq!(decrypted.len(), 16);
        assert_eq!(&decrypted[..8], b"12345678");
        assert_eq!(&decrypted[8..], &[0u8; 8]);
    }

    #[test]
    fn test_token_is_url_safe() {
        let codec = codec();

        for id in 0..200u64 {
            let token = codec.encode_recall_id(id * 7_919_993);
            assert!(
                !token.contains(['+', '/', '=']),
                "token {} carries reserved characters",
                token
            );
        }
    }

    #[test]
    fn test_recall_id_round_trip() {
        let codec = codec();

        let token = codec.encode_recall_id(4_611_686_018_427_387_903);

        assert_eq!(
            codec.decode_recall_id(&token),
            Some(4_611_686_018_427_387_903)
        );
    }

    #[test]
    fn test_garbage_tokens_do_not_fail() {
        let codec = codec();

        assert!(codec.decrypt("").is_empty());
        assert!(codec.decrypt("!!not base64!!").is_empty());
        assert_eq!(codec.decode_recall_id("!!not base64!!"), None);

        let token = codec.encrypt(b"Hello this is a test");
        let truncated = &token[..token.len() - 4];
        assert!(codec.decrypt(truncated).len() <= 16);
    }

    #[test]
    fn test_distinct_keys_produce_distinct_tokens() {
        let other = RecallCodec::new(b"goodbye", b"whatwhat").unwrap();

        assert_ne!(codec().encrypt(b"42"), other.encrypt(b"42"));
    }

    #[test]
    fn test_rejects_bad_key_material() {
        assert!(RecallCodec::new(b"abc", b"whatwhat").is_err());
        assert!(RecallCodec::new(b"hello", b"short").is_err());
    }
}
