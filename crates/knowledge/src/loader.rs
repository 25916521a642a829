//! Markdown corpus loading and header-based splitting.

use crate::types::DocumentChunk;
use hybrid_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Deepest header level that starts a new section.
const MAX_SPLIT_LEVEL: usize = 3;

/// Load every `*.md` file under `dir` and split it into sections.
///
/// Files are visited in path order; each file's position in that order is
/// the `parent_id` of its sections.
pub fn load_markdown_corpus(dir: &Path) -> AppResult<Vec<DocumentChunk>> {
    if !dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Document directory not found: {:?}",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();

    let mut chunks = Vec::new();
    for (parent_id, path) in files.iter().enumerate() {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Knowledge(format!("Failed to read document {:?}: {}", path, e))
        })?;

        let source = path.to_string_lossy().to_string();
        let sections = split_markdown(&text);
        tracing::debug!("Split {} into {} sections", source, sections.len());

        chunks.extend(
            sections
                .into_iter()
                .enumerate()
                .map(|(chunk_id, section)| DocumentChunk {
                    content: section.content,
                    source: source.clone(),
                    parent_id,
                    chunk_id,
                    headers: section.headers,
                    score: None,
                }),
        );
    }

    tracing::info!(
        "Loaded {} chunks from {} documents under {:?}",
        chunks.len(),
        files.len(),
        dir
    );

    Ok(chunks)
}

/// A section of one markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownSection {
    pub content: String,
    pub headers: Vec<String>,
}

/// Split markdown text at `#`, `##` and `###` headers.
///
/// Header lines stay in the section text. A section holding nothing but
/// headers is folded into the next section. Headers inside fenced code
/// blocks are treated as body text.
pub fn split_markdown(text: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut path: [Option<String>; MAX_SPLIT_LEVEL] = Default::default();
    let mut lines: Vec<&str> = Vec::new();
    let mut has_body = false;
    let mut section_headers: Vec<String> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            lines.push(line);
            has_body = true;
            continue;
        }

        if let Some(marker) = fence_marker(trimmed) {
            fence = Some(marker);
            lines.push(line);
            has_body = true;
            continue;
        }

        if let Some((level, title)) = parse_header(trimmed) {
            if has_body {
                push_section(&mut sections, &lines, &section_headers);
                lines.clear();
                has_body = false;
            }

            path[level - 1] = Some(title);
            for deeper in path.iter_mut().skip(level) {
                *deeper = None;
            }
            section_headers = path.iter().flatten().cloned().collect();
            lines.push(line);
            continue;
        }

        if !line.trim().is_empty() {
            has_body = true;
        }
        lines.push(line);
    }

    push_section(&mut sections, &lines, &section_headers);
    sections
}

fn push_section(sections: &mut Vec<MarkdownSection>, lines: &[&str], headers: &[String]) {
    let content = lines.join("\n").trim().to_string();
    if content.is_empty() {
        return;
    }

    sections.push(MarkdownSection {
        content,
        headers: headers.to_vec(),
    });
}

fn fence_marker(line: &str) -> Option<&'static str> {
    if line.starts_with("```") {
        Some("```")
    } else if line.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Header level and title, for levels 1 to 3.
fn parse_header(line: &str) -> Option<(usize, String)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > MAX_SPLIT_LEVEL {
        return None;
    }

    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }

    Some((level, rest.trim().to_string()))
}
