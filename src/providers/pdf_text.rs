use crate::core::extract::TextExtractor;
use anyhow::{Context, Result};
use lopdf::Document;
use tracing::debug;

/// Content-stream text extraction over the whole document via `pdf-extract`.
pub struct PdfExtractText;

impl TextExtractor for PdfExtractText {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        pdf_extract::extract_text_from_mem(bytes).context("pdf-extract could not read document")
    }
}

/// Page-by-page extraction via `lopdf`, pages joined with newlines.
pub struct LopdfText;

impl TextExtractor for LopdfText {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let doc = Document::load_mem(bytes).context("lopdf could not load document")?;

        let pages = doc.get_pages().into_keys().map(|page_num| {
            let text = doc.extract_text(&[page_num]).map_err(anyhow::Error::from);
            (page_num, text)
        });
        Ok(join_pages(pages))
    }
}

/// Joins the readable pages with newlines. Unreadable pages are skipped.
fn join_pages(pages: impl IntoIterator<Item = (u32, Result<String>)>) -> String {
    let mut chunks = Vec::new();
    for (page_num, text) in pages {
        match text {
            Ok(text) => chunks.push(text),
            Err(e) => debug!(page_num, error = %e, "Skipping unreadable page"),
        }
    }
    chunks.join("\n")
}

/// Primary strategy first, then the fallback.
pub fn default_strategies() -> Vec<Box<dyn TextExtractor>> {
    vec![Box::new(PdfExtractText), Box::new(LopdfText)]
}
