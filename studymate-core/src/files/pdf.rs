//! PDF text extraction

/// Extract the text layer of a PDF document
#[cfg(feature = "pdf")]
pub fn extract_text(bytes: &[u8]) -> Result<String, String> {
    // the decoder panics on some malformed inputs
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(format!("unreadable pdf: {}", e)),
        Err(_) => Err("pdf decoder crashed on this document".to_string()),
    }
}

#[cfg(not(feature = "pdf"))]
pub fn extract_text(_bytes: &[u8]) -> Result<String, String> {
    Err("pdf support is not compiled in".to_string())
}
