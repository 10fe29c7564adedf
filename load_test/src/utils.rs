use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random ASCII letters, mixed case
pub fn random_name<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(Alphanumeric)
        .map(char::from)
        .filter(char::is_ascii_alphabetic)
        .take(len)
        .collect()
}

pub fn random_email(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_name_is_letters_only() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let name = random_name(&mut rng, 8);
            assert_eq!(name.len(), 8);
            assert!(name.chars().all(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_random_email() {
        assert_eq!(random_email("QwErTy"), "qwerty@example.com");
    }
}
