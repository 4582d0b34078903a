//! Content encoding helpers: the extension/language tables, `data:` URI
//! handling for binary pastes, and download filename assembly.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_LANGUAGE: &str = "text";

/// A paste's stored content, decoded for serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteBody {
    Text(String),
    Binary { mime: String, bytes: Vec<u8> },
}

/// Media uploads are stored inline as `data:<mime>;base64,<payload>`.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Split stored content back into text or decoded binary. Content that looks
/// like a `data:` URI but does not parse as one is served as plain text.
pub fn decode_body(content: &str) -> PasteBody {
    if let Some(rest) = content.strip_prefix("data:") {
        if let Some((header, payload)) = rest.split_once(',') {
            if let Some(mime) = header.strip_suffix(";base64") {
                if let Ok(bytes) = BASE64.decode(payload) {
                    return PasteBody::Binary {
                        mime: mime.to_owned(),
                        bytes,
                    };
                }
            }
        }
    }

    PasteBody::Text(content.to_owned())
}

/// Media types that get stored as `data:` URIs instead of UTF-8 text.
pub fn is_media_mime(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("video/") || mime.starts_with("audio/")
}

/// Infer a language tag from a filename's extension. Extensionless names
/// match on the whole lowercased name, which is how `Dockerfile` works.
pub fn language_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase();

    match ext.as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "go" => "go",
        "rs" => "rust",
        "sh" | "bash" | "zsh" | "fish" => "bash",
        "ps1" => "powershell",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "xml" => "xml",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" | "cfg" | "conf" => "ini",
        "md" | "markdown" => "markdown",
        "tex" => "latex",
        "r" => "r",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "clj" => "clojure",
        "hs" => "haskell",
        "ml" => "ocaml",
        "fs" => "fsharp",
        "erl" => "erlang",
        "ex" => "elixir",
        "lua" => "lua",
        "pl" => "perl",
        "vim" => "vim",
        "dockerfile" => "dockerfile",
        _ => DEFAULT_LANGUAGE,
    }
}

/// File extension used when downloading a text paste with this language tag.
pub fn extension_for_language(language: &str) -> &'static str {
    match language {
        "javascript" => "js",
        "typescript" => "ts",
        "python" => "py",
        "ruby" => "rb",
        "java" => "java",
        "c" => "c",
        "cpp" => "cpp",
        "csharp" => "cs",
        "php" => "php",
        "go" => "go",
        "rust" => "rs",
        "bash" | "shell" => "sh",
        "powershell" => "ps1",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "xml" => "xml",
        "json" => "json",
        "yaml" => "yml",
        "toml" => "toml",
        "ini" => "ini",
        "markdown" => "md",
        "latex" => "tex",
        "r" => "r",
        "swift" => "swift",
        "kotlin" => "kt",
        "scala" => "scala",
        "clojure" => "clj",
        "haskell" => "hs",
        "ocaml" => "ml",
        "fsharp" => "fs",
        "erlang" => "erl",
        "elixir" => "ex",
        "lua" => "lua",
        "perl" => "pl",
        "vim" => "vim",
        "dockerfile" => "dockerfile",
        _ => "txt",
    }
}

pub fn mime_for_extension(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first_or_text_plain()
        .essence_str()
        .to_owned()
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first())
        .copied()
        .unwrap_or("bin")
}

/// Build an attachment filename from a paste title, keeping only characters
/// that are safe inside a Content-Disposition header.
pub fn download_filename(title: &str, extension: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9.-]").unwrap());
    format!("{}.{extension}", unsafe_chars.replace_all(title, "_"))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
