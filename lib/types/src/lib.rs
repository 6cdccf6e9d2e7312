/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mcemu Types library.

--*/

mod core_id;
mod macros;
mod mode;

pub use crate::core_id::CoreId;
pub use crate::mode::ArmMode;

/// ARM Data width
pub type ArmData = u32;

/// ARM Address width
pub type ArmAddr = u32;

arm_enum!(
    /// ARM bus operation size
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub ArmSize;
    usize;
    {
        Byte = 1,
        HalfWord = 2,
        Word = 4,
    };
    Invalid
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_conversions() {
        assert_eq!(usize::from(ArmSize::Byte), 1);
        assert_eq!(usize::from(ArmSize::HalfWord), 2);
        assert_eq!(usize::from(ArmSize::Word), 4);
        assert_eq!(ArmSize::from(2usize), ArmSize::HalfWord);
        assert_eq!(ArmSize::from(3usize), ArmSize::Invalid);
    }

    #[test]
    fn test_size_all_excludes_invalid() {
        assert_eq!(
            ArmSize::ALL,
            &[ArmSize::Byte, ArmSize::HalfWord, ArmSize::Word]
        );
    }

    #[test]
    fn test_size_display() {
        assert_eq!(ArmSize::Word.to_string(), "Word");
        assert_eq!(ArmSize::Invalid.to_string(), "Invalid");
    }

    #[test]
    #[should_panic(expected = "cannot encode ArmSize::Invalid")]
    fn test_invalid_size_cannot_be_encoded() {
        let _ = usize::from(ArmSize::Invalid);
    }
}
