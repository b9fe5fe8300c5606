use rand::Rng;

pub const CERTIFICATE_ID_LEN: usize = 20;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random 20-character `A-Z0-9` identifier, drawn from the thread-local CSPRNG
pub fn generate_certificate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..CERTIFICATE_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_certificate_id(id: &str) -> bool {
    id.len() == CERTIFICATE_ID_LEN && id.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_shape() {
        for _ in 0..200 {
            let id = generate_certificate_id();
            assert_eq!(id.len(), 20);
            assert!(is_valid_certificate_id(&id), "bad id: {}", id);
        }
    }

    #[test]
    fn test_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..500).map(|_| generate_certificate_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_validation_rejects_lowercase_and_length() {
        assert!(!is_valid_certificate_id("abcdefghijklmnopqrst"));
        assert!(!is_valid_certificate_id("ABC123"));
        assert!(is_valid_certificate_id("ABCDEFGHIJ0123456789"));
    }
}
