use crate::extract::ExtractedIdentity;

const FALLBACK_ARCHIVE_STEM: &str = "document";
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
// Two capped components plus the fixed parts stay well under the usual
// 255-byte file name limit.
const MAX_COMPONENT_BYTES: usize = 100;

/// `<name>_Mobile_<phone>_Page_<n>.pdf`, with `page_number` 1-based.
pub fn page_file_name(identity: &ExtractedIdentity, page_number: usize, sanitize: bool) -> String {
    let (name, phone) = if sanitize {
        (
            sanitize_component(&identity.display_name),
            sanitize_component(&identity.phone),
        )
    } else {
        (identity.display_name.clone(), identity.phone.clone())
    };
    format!("{}_Mobile_{}_Page_{}.pdf", name, phone, page_number)
}

/// Make extracted text safe to embed in a single path component.
pub fn sanitize_component(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let is_edge = |c: char| c.is_whitespace() || c == '.';
    let mut trimmed = replaced.trim_matches(is_edge);
    if trimmed.len() > MAX_COMPONENT_BYTES {
        let mut end = MAX_COMPONENT_BYTES;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed = trimmed[..end].trim_end_matches(is_edge);
    }
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Download name for the archive built from an upload called `upload_name`.
pub fn archive_file_name(upload_name: &str) -> String {
    // Browsers may send a full client-side path; keep only the last component.
    let base = upload_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(upload_name);

    let stem = base
        .len()
        .checked_sub(4)
        .filter(|&i| base.get(i..).is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf")))
        .map_or(base, |i| &base[..i]);

    let stem = sanitize_component(stem);
    if stem == "_" {
        format!("{}.zip", FALLBACK_ARCHIVE_STEM)
    } else {
        format!("{}.zip", stem)
    }
}
