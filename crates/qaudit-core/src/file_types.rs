//! File type helpers shared by the scanner, extraction and orchestration layers.

use std::path::Path;

/// Extensions the text extraction engine accepts.
pub const OCR_SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "pdf",
];

/// Lower-case extension of `file_name` without the leading dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Normalize an extension as stored on records (`".PDF"` -> `"pdf"`).
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

pub fn is_ocr_supported_extension(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    OCR_SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Whether a file should go through text extraction, judged by MIME type or
/// extension.
pub fn is_ocr_eligible(mime_type: &str, ext: &str) -> bool {
    let mime = mime_type.trim().to_lowercase();
    mime.starts_with("image/") || mime == "application/pdf" || is_ocr_supported_extension(ext)
}

pub fn is_pdf(ext: &str) -> bool {
    normalize_extension(ext) == "pdf"
}

/// Best-effort MIME type from an extension, for callers that only have a path.
pub fn mime_from_extension(ext: &str) -> &'static str {
    match normalize_extension(ext).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
