/// Extension-based content-type lookup for downloads. Unknown
/// extensions fall back to the generic binary type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "txt" | "text" | "log" | "conf" => "text/plain",
        "md" => "text/markdown",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_are_mapped() {
        assert_eq!(guess_content_type("index.html"), "text/html");
        assert_eq!(guess_content_type("REPORT.PDF"), "application/pdf");
        assert_eq!(guess_content_type("archive.tar"), "application/x-tar");
    }

    #[test]
    fn unknown_and_missing_extensions_fall_back() {
        assert_eq!(guess_content_type("core.0001"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess_content_type("Makefile"), DEFAULT_CONTENT_TYPE);
    }
}
