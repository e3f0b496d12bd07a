use lopdf::Document;
use tracing::debug;

use crate::error::{Result, SplitError};

/// An uploaded PDF held in memory. Pages are addressed by 0-based index.
pub struct SourceDocument {
    doc: Document,
    // lopdf page numbers (1-based, as found in the page tree), in order.
    page_numbers: Vec<u32>,
}

impl SourceDocument {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SplitError::unreadable("empty upload"));
        }

        let doc = Document::load_mem(bytes).map_err(SplitError::unreadable)?;
        // lopdf opens files with an empty user password itself and keeps
        // `/Encrypt` in the trailer; only a missing state means it could not.
        if doc.is_encrypted() && doc.encryption_state.is_none() {
            return Err(SplitError::unreadable("document is password-protected"));
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        debug!("Loaded PDF with {} pages", page_numbers.len());
        Ok(Self { doc, page_numbers })
    }

    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_number(&self, index: usize) -> Result<u32> {
        self.page_numbers.get(index).copied().ok_or_else(|| {
            SplitError::unreadable(format!(
                "page {} out of range ({} pages)",
                index + 1,
                self.page_numbers.len()
            ))
        })
    }

    /// Plain text of one page.
    pub fn page_text(&self, index: usize) -> Result<String> {
        let number = self.page_number(index)?;
        self.doc
            .extract_text(&[number])
            .map_err(|e| SplitError::unreadable(format!("page {}: {}", index + 1, e)))
    }

    /// A standalone PDF containing only the given page.
    pub fn single_page(&self, index: usize) -> Result<Vec<u8>> {
        let keep = self.page_number(index)?;
        let others: Vec<u32> = self
            .page_numbers
            .iter()
            .copied()
            .filter(|&n| n != keep)
            .collect();

        let mut page_doc = self.doc.clone();
        // Objects are already decrypted in memory, so write the page in the clear.
        page_doc.trailer.remove(b"Encrypt");
        page_doc.encryption_state = None;
        page_doc.delete_pages(&others);
        page_doc.prune_objects();
        page_doc.renumber_objects();
        page_doc.compress();

        let mut out = Vec::new();
        page_doc
            .save_to(&mut out)
            .map_err(|e| SplitError::unreadable(format!("page {}: {}", index + 1, e)))?;
        Ok(out)
    }
}

// ── Test fixtures ──

/// Builds a PDF whose pages each show the given lines in Helvetica.
#[cfg(test)]
pub fn fixture_pdf(pages: &[&[&str]]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 750 - 20 * i as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

/// Same as `fixture_pdf`, encrypted with an owner password and the given user
/// password.
#[cfg(test)]
pub fn encrypted_fixture_pdf(pages: &[&[&str]], user_password: &str) -> Vec<u8> {
    use lopdf::{EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};

    let mut doc = Document::load_mem(&fixture_pdf(pages)).expect("reload fixture");
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(b"0123456789abcdef".to_vec(), StringFormat::Literal),
            Object::String(b"fedcba9876543210".to_vec(), StringFormat::Literal),
        ]),
    );
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner-secret",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).expect("encryption state");
    doc.encrypt(&state).expect("encrypt fixture");

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save encrypted fixture");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pages() {
        let bytes = fixture_pdf(&[&["one"], &["two"], &["three"]]);
        let doc = SourceDocument::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn reads_page_text_in_order() {
        let bytes = fixture_pdf(&[
            &["Name: DR. John Smith"],
            &["Mobile#: 1234567890"],
        ]);
        let doc = SourceDocument::load(&bytes).unwrap();
        assert!(doc.page_text(0).unwrap().contains("Name: DR. John Smith"));
        assert!(doc.page_text(1).unwrap().contains("Mobile#: 1234567890"));
    }

    #[test]
    fn single_page_keeps_only_that_page() {
        let bytes = fixture_pdf(&[&["first page"], &["second page"], &["third page"]]);
        let doc = SourceDocument::load(&bytes).unwrap();

        let page = doc.single_page(1).unwrap();
        let reloaded = SourceDocument::load(&page).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert!(reloaded.page_text(0).unwrap().contains("second page"));
    }

    #[test]
    fn out_of_range_page() {
        let bytes = fixture_pdf(&[&["only"]]);
        let doc = SourceDocument::load(&bytes).unwrap();
        assert!(matches!(doc.page_text(1), Err(SplitError::UnreadableDocument(_))));
        assert!(doc.single_page(5).is_err());
    }

    #[test]
    fn rejects_empty_upload() {
        assert!(matches!(
            SourceDocument::load(&[]),
            Err(SplitError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let err = SourceDocument::load(b"this is not a pdf").err().unwrap();
        assert!(err.to_string().starts_with("unreadable PDF"));
    }

    #[test]
    fn zero_page_document_loads() {
        let bytes = fixture_pdf(&[]);
        let doc = SourceDocument::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn opens_permission_restricted_pdf() {
        let bytes = encrypted_fixture_pdf(&[&["Name: DR. John Smith"], &["second page"]], "");
        let doc = SourceDocument::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(doc.page_text(0).unwrap().contains("Name: DR. John Smith"));
    }

    #[test]
    fn restricted_pdf_pages_are_written_unencrypted() {
        let bytes = encrypted_fixture_pdf(&[&["first page"], &["second page"]], "");
        let doc = SourceDocument::load(&bytes).unwrap();

        let page = doc.single_page(1).unwrap();
        let raw = Document::load_mem(&page).unwrap();
        assert!(!raw.is_encrypted());
        let reloaded = SourceDocument::load(&page).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert!(reloaded.page_text(0).unwrap().contains("second page"));
    }

    #[test]
    fn rejects_user_password_pdf() {
        let bytes = encrypted_fixture_pdf(&[&["secret page"]], "letmein");
        let err = SourceDocument::load(&bytes).err().unwrap();
        assert!(matches!(err, SplitError::UnreadableDocument(_)));
    }
}
