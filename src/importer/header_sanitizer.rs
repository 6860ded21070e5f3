// ==========================================
// Catalog import - header sanitizer
// ==========================================
// Responsibility: trim / unquote header cells, drop blank and
// generated placeholder headers, remember source column indices
// ==========================================

use crate::domain::import::SanitizedHeaders;
use crate::domain::types::CellValue;
use crate::importer::file_parser::{clean_header_text, PLACEHOLDER_PREFIX};
use crate::importer::importer_trait::HeaderSanitizer as HeaderSanitizerTrait;

pub struct HeaderSanitizer;

impl HeaderSanitizerTrait for HeaderSanitizer {
    fn sanitize(&self, raw_headers: &[CellValue]) -> SanitizedHeaders {
        let mut out = SanitizedHeaders::default();

        for (idx, cell) in raw_headers.iter().enumerate() {
            let Some(text) = cell.as_text() else {
                continue;
            };
            let name = clean_header_text(&text);
            if name.is_empty() || name.starts_with(PLACEHOLDER_PREFIX) {
                continue;
            }
            out.names.push(name);
            out.source_indices.push(idx);
        }

        out
    }
}
