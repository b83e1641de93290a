use std::path::Path;

/// Extension of `filename` including the leading dot, or `""`.
///
/// Dotfiles such as `.png` have no extension; only the last suffix counts.
pub fn extension_with_dot(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Build `<identifier><extension>` for an image.
pub fn build_identifier_name(identifier: &str, original_name: &str) -> String {
    format!("{}{}", identifier.trim(), extension_with_dot(original_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_with_dot() {
        assert_eq!(extension_with_dot("x.jpg"), ".jpg");
        assert_eq!(extension_with_dot("photo.JPEG"), ".JPEG");
        assert_eq!(extension_with_dot("archive.tar.gz"), ".gz");
        assert_eq!(extension_with_dot("noext"), "");
        assert_eq!(extension_with_dot(".png"), "");
    }

    #[test]
    fn test_build_identifier_name() {
        assert_eq!(build_identifier_name("1001", "x.jpg"), "1001.jpg");
        assert_eq!(build_identifier_name("SKU-42", "front view.png"), "SKU-42.png");
        assert_eq!(build_identifier_name("77", "noext"), "77");
    }

    #[test]
    fn test_identifier_whitespace_trimmed() {
        assert_eq!(build_identifier_name(" 1001 ", "x.jpg"), "1001.jpg");
    }

    #[test]
    fn test_keeps_extension_case() {
        assert_eq!(build_identifier_name("5", "IMG_0001.PNG"), "5.PNG");
    }
}
