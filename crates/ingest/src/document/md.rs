use super::{decode, Section};

/// Split Markdown at headings. Text before the first heading is an
/// untitled section.
pub fn extract_md(bytes: &[u8]) -> Vec<Section> {
    let text = decode(bytes);
    let mut sections = Vec::new();
    let mut title: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    let mut flush = |title: Option<String>, body: &mut Vec<&str>| {
        let text = body.join("\n").trim().to_string();
        body.clear();
        if title.is_some() || !text.is_empty() {
            let text = match &title {
                Some(t) if text.is_empty() => t.clone(),
                Some(t) => format!("{t}\n{text}"),
                None => text,
            };
            sections.push(Section { title, text });
        }
    };

    for line in text.lines() {
        if line.starts_with('#') {
            flush(title.take(), &mut body);
            title = Some(line.trim_start_matches('#').trim().to_string());
        } else {
            body.push(line);
        }
    }
    flush(title, &mut body);

    sections
}
