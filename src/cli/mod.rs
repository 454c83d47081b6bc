pub mod calc;
pub mod ratios;
pub mod session;
pub mod setup;
pub mod ui;

use crate::core::session::Session;
use crate::core::source::{DocumentSource, SourceError};
use std::path::PathBuf;

/// Where the user asked the ratio document to be read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceArg {
    #[default]
    Default,
    Url(String),
    File(PathBuf),
}

impl SourceArg {
    pub fn from_options(url: Option<String>, file: Option<PathBuf>) -> Self {
        match (url, file) {
            (_, Some(path)) => SourceArg::File(path),
            (Some(url), None) => SourceArg::Url(url),
            (None, None) => SourceArg::Default,
        }
    }

    pub fn to_document(&self) -> Result<DocumentSource, SourceError> {
        match self {
            SourceArg::Default => Ok(DocumentSource::Default),
            SourceArg::Url(url) => Ok(DocumentSource::Url(url.clone())),
            SourceArg::File(path) => DocumentSource::from_path(path),
        }
    }
}

/// Loads the ratio table into `session` behind a spinner and reports the
/// outcome. `refresh` bypasses the cached table. Returns whether a table is now loaded.
pub async fn load_ratios(session: &mut Session<'_>, source: &SourceArg, refresh: bool) -> bool {
    let document = match source.to_document() {
        Ok(document) => document,
        Err(e) => {
            println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            return false;
        }
    };

    let pb = ui::new_spinner("Loading BYMA ratio table...");
    let loaded = if refresh {
        session.reload(&document).await
    } else {
        session.load(&document).await
    };
    pb.finish_and_clear();

    match loaded {
        Ok(extracted) => {
            println!(
                "{} {} symbols {}",
                ui::style_text("Ratios:", ui::StyleType::Label),
                ui::style_text(&extracted.table.len().to_string(), ui::StyleType::Value),
                ui::style_text(&format!("(via {})", extracted.strategy), ui::StyleType::Subtle),
            );
            if extracted.low_quality {
                println!(
                    "{}",
                    ui::style_text(
                        "Few symbols detected; the document may have an unusual layout",
                        ui::StyleType::Warning
                    )
                );
            }
            true
        }
        Err(e) => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Could not load ratio table: {e}"),
                    ui::StyleType::Error
                )
            );
            false
        }
    }
}
