use super::{decode, Section};

/// Plain text is a single untitled section.
pub fn extract_txt(bytes: &[u8]) -> Vec<Section> {
    vec![Section {
        title: None,
        text: decode(bytes).trim().to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_keeps_unicode() {
        let sections = extract_txt("  Zeek conn.log \u{2013} cheat sheet \n".as_bytes());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, "Zeek conn.log \u{2013} cheat sheet");
        assert!(sections[0].title.is_none());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let sections = extract_txt(b"ok \xff end");
        assert!(sections[0].text.starts_with("ok "));
        assert!(sections[0].text.ends_with(" end"));
    }
}
