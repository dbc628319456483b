use rand::Rng;

/// Uppercase alphabet without the characters people misread over the phone
/// (I, L, O, 0, 1). Every output still matches `^[A-Z0-9]{6,8}$`.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Pure access-code generator. Uniqueness is the caller's problem.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Codes must stay short enough to read out loud; length is clamped
    /// to 6..=8 characters.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(6, 8),
        }
    }

    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Normalize a user-supplied code the way the viewer form does: trim
/// surrounding whitespace and uppercase for case-insensitive matching.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        let generator = CodeGenerator::new(8);
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), 8);
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
                "code {} outside [A-Z0-9]",
                code
            );
        }
    }

    #[test]
    fn test_length_clamped() {
        assert_eq!(CodeGenerator::new(3).generate().len(), 6);
        assert_eq!(CodeGenerator::new(20).generate().len(), 8);
    }

    #[test]
    fn test_no_ambiguous_characters() {
        let generator = CodeGenerator::new(8);
        for _ in 0..100 {
            let code = generator.generate();
            for c in ['I', 'L', 'O', '0', '1'] {
                assert!(!code.contains(c), "ambiguous char {} in {}", c, code);
            }
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab2cd3e \n"), "AB2CD3E");
        assert_eq!(normalize_code("XYZ42"), "XYZ42");
        assert_eq!(normalize_code("   "), "");
    }
}
