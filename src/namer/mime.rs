//! MIME type → file extension lookup.

/// Image formats Evernote produces, with the extension we want for each.
///
/// Checked before [`GENERIC`] so that e.g. `image/jpeg` maps to `.jpg`
/// rather than one of its rarer aliases.
const IMAGES: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/bmp", ".bmp"),
    ("image/svg+xml", ".svg"),
    ("image/webp", ".webp"),
    ("image/tiff", ".tiff"),
    ("image/heic", ".heic"),
];

const GENERIC: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/zip", ".zip"),
    ("application/json", ".json"),
    ("application/xml", ".xml"),
    ("application/rtf", ".rtf"),
    ("application/msword", ".doc"),
    ("application/vnd.ms-excel", ".xls"),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("application/vnd.evernote.ink", ".ink"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
    ("text/css", ".css"),
    ("text/csv", ".csv"),
    ("text/calendar", ".ics"),
    ("text/vcard", ".vcf"),
    ("audio/mpeg", ".mp3"),
    ("audio/mp4", ".m4a"),
    ("audio/wav", ".wav"),
    ("audio/x-wav", ".wav"),
    ("audio/amr", ".amr"),
    ("audio/ogg", ".ogg"),
    ("video/mp4", ".mp4"),
    ("video/quicktime", ".mov"),
    ("video/webm", ".webm"),
];

/// Extension (with the leading dot) for a MIME type, or `""` if unknown.
///
/// Parameters such as `; charset=utf-8` are ignored and the comparison is
/// case-insensitive.
pub fn guess_ext(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    IMAGES
        .iter()
        .chain(GENERIC)
        .find(|(known, _)| *known == essence)
        .map_or("", |(_, ext)| ext)
}

/// Whether a MIME type denotes an image (`image/<subtype>`).
pub fn is_image(mime: &str) -> bool {
    mime.strip_prefix("image/")
        .and_then(|subtype| subtype.chars().next())
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}
