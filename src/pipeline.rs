use std::io::Cursor;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::write_archive;
use crate::document::SourceDocument;
use crate::error::Result;
use crate::extract::{extract_with, ExtractedIdentity, TitleRule};
use crate::naming::{archive_file_name, page_file_name};
use crate::staging::StagingDir;

#[derive(Debug, Clone, Copy)]
pub struct SplitOptions {
    pub title_rule: TitleRule,
    pub sanitize: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            title_rule: TitleRule::Literal,
            sanitize: true,
        }
    }
}

/// One written page.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub page_number: usize,
    #[serde(flatten)]
    pub identity: ExtractedIdentity,
    pub file_name: String,
}

pub struct SplitOutcome {
    pub archive_name: String,
    pub archive: Vec<u8>,
    pub pages: Vec<PageRecord>,
}

/// Split `bytes` into one PDF per page and zip them.
///
/// Pages are handled strictly in order. The first failure aborts the run and
/// no archive is returned; the staging directory is removed either way. A
/// document with no pages yields an archive with no entries.
pub fn split_document(
    bytes: &[u8],
    upload_name: &str,
    options: &SplitOptions,
    pb: &ProgressBar,
) -> Result<SplitOutcome> {
    let doc = SourceDocument::load(bytes)?;
    let total = doc.page_count();
    let archive_name = archive_file_name(upload_name);
    info!("Splitting {:?}: {} pages -> {}", upload_name, total, archive_name);
    if total == 0 {
        warn!("{:?} has no pages, archive will be empty", upload_name);
    }

    pb.set_length(total as u64);
    let staged = stage_and_archive(&doc, StagingDir::new()?, options, pb);
    pb.finish_and_clear();
    let (archive, pages) = staged?;
    info!("Archived {} pages into {}", pages.len(), archive_name);

    Ok(SplitOutcome {
        archive_name,
        archive,
        pages,
    })
}

// Takes the staging directory by value so every early return drops it.
fn stage_and_archive(
    doc: &SourceDocument,
    mut staging: StagingDir,
    options: &SplitOptions,
    pb: &ProgressBar,
) -> Result<(Vec<u8>, Vec<PageRecord>)> {
    let mut pages = Vec::with_capacity(doc.page_count());
    for index in 0..doc.page_count() {
        let record = describe_page(doc, index, options)?;
        let page_pdf = doc.single_page(index)?;
        staging.write(&record.file_name, &page_pdf)?;
        debug!("Page {} -> {}", record.page_number, record.file_name);
        pages.push(record);
        pb.inc(1);
    }

    let mut archive = Cursor::new(Vec::new());
    let entries = write_archive(staging.files(), &mut archive)?;
    debug!("Wrote {} archive entries", entries);
    staging.close()?;
    Ok((archive.into_inner(), pages))
}

/// Identities and file names for every page, without writing anything.
pub fn inspect_document(bytes: &[u8], options: &SplitOptions) -> Result<Vec<PageRecord>> {
    let doc = SourceDocument::load(bytes)?;
    (0..doc.page_count())
        .map(|index| describe_page(&doc, index, options))
        .collect()
}

fn describe_page(doc: &SourceDocument, index: usize, options: &SplitOptions) -> Result<PageRecord> {
    let text = doc.page_text(index)?;
    let identity = extract_with(&text, options.title_rule);
    let page_number = index + 1;
    let file_name = page_file_name(&identity, page_number, options.sanitize);
    Ok(PageRecord {
        page_number,
        identity,
        file_name,
    })
}

// ── Tests ──
