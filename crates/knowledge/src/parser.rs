//! Source discovery and text extraction.

use crate::types::{Document, META_FILENAME, META_PAGES, META_SOURCE};
use ragchat_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    PlainText,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match extension_of(path).as_deref() {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            _ => Self::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Finds and reads eligible source files in a corpus directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extensions: Vec<String>,
}

impl DocumentLoader {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// List eligible files directly inside `dir`, sorted by name.
    ///
    /// A missing directory or one without eligible files is `EmptyCorpus`.
    pub fn discover(&self, dir: &Path) -> AppResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            tracing::warn!("Corpus directory {:?} does not exist", dir);
            return Err(AppError::EmptyCorpus {
                dir: dir.to_path_buf(),
            });
        }

        let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.is_eligible(p))
            .collect();

        if files.is_empty() {
            return Err(AppError::EmptyCorpus {
                dir: dir.to_path_buf(),
            });
        }

        tracing::info!("Found {} source files in {:?}", files.len(), dir);
        Ok(files)
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        extension_of(path)
            .map(|ext| self.extensions.iter().any(|e| *e == ext))
            .unwrap_or(false)
    }

    /// Load one file.
    ///
    /// Returns `Ok(None)` when the file yields no text, and `SourceRead`
    /// when it cannot be opened or parsed at all.
    pub fn load(&self, path: &Path) -> AppResult<Option<Document>> {
        let content_type = ContentType::from_path(path);

        let (text, pages) = match content_type {
            ContentType::Pdf => extract_pdf(path)?,
            ContentType::Markdown => (clean_markdown(&read_text(path)?), 1),
            ContentType::PlainText => (read_text(path)?, 1),
        };

        if text.trim().is_empty() {
            tracing::warn!("No text extracted from {:?}", path);
            return Ok(None);
        }

        let source = path.display().to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.clone());

        let mut metadata = BTreeMap::new();
        metadata.insert(META_SOURCE.to_string(), source.clone());
        metadata.insert(META_PAGES.to_string(), pages.to_string());
        metadata.insert(META_FILENAME.to_string(), filename);

        tracing::debug!(
            "Loaded {:?} ({}, {} pages, {} bytes)",
            path,
            content_type.as_str(),
            pages,
            text.len()
        );

        Ok(Some(Document {
            source_id: source,
            raw_text: text,
            metadata,
        }))
    }
}

fn source_error(path: &Path, reason: impl ToString) -> AppError {
    AppError::SourceRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|e| source_error(path, e))
}

/// Extract text page by page. A page that fails is skipped with a warning.
fn extract_pdf(path: &Path) -> AppResult<(String, usize)> {
    let document = lopdf::Document::load(path).map_err(|e| source_error(path, e))?;
    let pages = document.get_pages();

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                tracing::warn!(
                    "Error extracting text from page {} of {:?}: {}",
                    page_number,
                    path,
                    e
                );
            }
        }
    }

    Ok((text, pages.len()))
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Rules and fences carry no content
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        result.push_str(trimmed);
        result.push('\n');
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader() -> DocumentLoader {
        DocumentLoader::new(&["pdf".to_string(), "txt".to_string(), "md".to_string()])
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("a.PDF")), ContentType::Pdf);
        assert_eq!(
            ContentType::from_path(Path::new("a.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("a.txt")),
            ContentType::PlainText
        );
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "b").unwrap();
        fs::write(temp.path().join("a.md"), "a").unwrap();
        fs::write(temp.path().join("image.png"), "x").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested").join("c.txt"), "c").unwrap();

        let files = loader().discover(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn test_discover_empty_and_missing() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            loader().discover(temp.path()),
            Err(AppError::EmptyCorpus { .. })
        ));
        assert!(matches!(
            loader().discover(&temp.path().join("missing")),
            Err(AppError::EmptyCorpus { .. })
        ));
    }

    #[test]
    fn test_load_text_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "Alpha Beta Gamma").unwrap();

        let doc = loader().load(&path).unwrap().unwrap();
        assert_eq!(doc.raw_text, "Alpha Beta Gamma");
        assert_eq!(doc.metadata[META_SOURCE], path.display().to_string());
        assert_eq!(doc.metadata[META_PAGES], "1");
        assert_eq!(doc.metadata[META_FILENAME], "notes.txt");
    }

    #[test]
    fn test_blank_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.txt");
        fs::write(&path, "  \n\n ").unwrap();
        assert!(loader().load(&path).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_pdf_is_source_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        fs::write(&path, "this is not a pdf").unwrap();

        let result = loader().load(&path);
        assert!(matches!(result, Err(AppError::SourceRead { .. })));
    }

    /// Write a PDF with one page per entry. `None` is a page whose content
    /// stream reference points at an object that does not exist.
    fn write_pdf(path: &Path, pages: &[Option<&str>]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let contents: Object = match page {
                Some(text) => {
                    let content = Content {
                        operations: vec![
                            Operation::new("BT", vec![]),
                            Operation::new("Tf", vec!["F1".into(), 12.into()]),
                            Operation::new("Td", vec![100.into(), 600.into()]),
                            Operation::new("Tj", vec![Object::string_literal(*text)]),
                            Operation::new("ET", vec![]),
                        ],
                    };
                    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
                        .into()
                }
                None => Object::Reference((9999, 0)),
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
                "Contents" => contents,
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
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_pdf_pages_are_extracted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manual.pdf");
        write_pdf(&path, &[Some("AlphaPage"), Some("BetaPage")]);

        let doc = loader().load(&path).unwrap().unwrap();
        assert!(doc.raw_text.contains("AlphaPage"));
        assert!(doc.raw_text.contains("BetaPage"));
        assert!(doc.raw_text.find("AlphaPage") < doc.raw_text.find("BetaPage"));
        assert_eq!(doc.metadata[META_PAGES], "2");
        assert_eq!(doc.metadata[META_FILENAME], "manual.pdf");
    }

    #[test]
    fn test_broken_pdf_page_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.pdf");
        write_pdf(&path, &[Some("GoodPage"), None]);

        let doc = loader().load(&path).unwrap().unwrap();
        assert!(doc.raw_text.contains("GoodPage"));
        assert_eq!(doc.metadata[META_PAGES], "2");
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\n---\nMore text";
        let output = clean_markdown(input);
        assert!(output.starts_with("Header\n\nSome text"));
        assert!(output.contains("code"));
        assert!(output.ends_with("More text"));
        assert!(!output.contains("```"));
        assert!(!output.contains("---"));
    }
}
