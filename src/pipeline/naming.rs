// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Output naming
//!
//! Templates such as `images/[name]_[hash:base64:5].[ext]` are parsed once when the
//! pipeline is compiled, so an unknown token fails before any asset runs.
//! Rendering is a pure function of (identifier, final content, template).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::cache::ContentHasher;
use crate::errors::AssetflowError;

/// A parsed naming template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    source: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// File stem of the identifier
    Name,
    /// Extension without the dot
    Ext,
    /// Directory of the identifier with a trailing `/`, or empty
    Path,
    /// Digest of the final content
    Hash(Digest),
    /// Digest of identifier plus final content
    ChunkHash(Digest),
}

/// How a digest is spelled in a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Hex,
    /// URL-safe alphabet, no padding
    Base64,
}

impl Encoding {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "hex" => Some(Self::Hex),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    /// Characters in a full 32-byte BLAKE3 digest
    fn max_len(self) -> usize {
        match self {
            Self::Hex => 64,
            Self::Base64 => 43,
        }
    }

    fn encode(self, digest: &[u8; 32]) -> String {
        match self {
            Self::Hex => digest.iter().map(|b| format!("{:02x}", b)).collect(),
            Self::Base64 => URL_SAFE_NO_PAD.encode(digest),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Digest {
    encoding: Encoding,
    len: usize,
}

impl Digest {
    fn render(self, digest: Option<&[u8; 32]>) -> String {
        let Some(digest) = digest else {
            return String::new();
        };
        let mut encoded = self.encoding.encode(digest);
        encoded.truncate(self.len);
        encoded
    }
}

impl NamingTemplate {
    /// Parse a template string
    pub fn parse(template: &str) -> Result<Self, AssetflowError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('[') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find(']').ok_or_else(|| AssetflowError::InvalidTemplate {
                template: template.to_string(),
                reason: "unclosed '['".to_string(),
            })?;

            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Part::Token(parse_token(template, &after[..close])?));
            rest = &after[close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        if parts.is_empty() {
            return Err(AssetflowError::InvalidTemplate {
                template: template.to_string(),
                reason: "template is empty".to_string(),
            });
        }

        Ok(Self {
            source: template.to_string(),
            parts,
        })
    }

    /// Template as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the rendered name depends on content
    pub fn is_content_addressed(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::Token(Token::Hash(_) | Token::ChunkHash(_))))
    }

    /// Render the output name for an asset identifier and its final content
    pub fn render(&self, id: &str, content: &[u8]) -> String {
        let (dir, file) = match id.rsplit_once('/') {
            Some((dir, file)) => (format!("{}/", dir), file),
            None => (String::new(), id),
        };
        let (stem, ext) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext),
            _ => (file, ""),
        };

        let content_hash = self
            .needs(|t| matches!(t, Token::Hash(_)))
            .then(|| *blake3::hash(content).as_bytes());
        let chunk_hash = self
            .needs(|t| matches!(t, Token::ChunkHash(_)))
            .then(|| {
                let mut hasher = ContentHasher::new();
                hasher.update(id.as_bytes());
                hasher.update(&[0]);
                hasher.update(content);
                hasher.finalize_bytes()
            });

        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Token(Token::Name) => out.push_str(stem),
                Part::Token(Token::Path) => out.push_str(&dir),
                Part::Token(Token::Ext) => {
                    if ext.is_empty() {
                        // "name.[ext]" without an extension renders as "name"
                        if out.ends_with('.') {
                            out.pop();
                        }
                    } else {
                        out.push_str(ext);
                    }
                }
                Part::Token(Token::Hash(digest)) => {
                    out.push_str(&digest.render(content_hash.as_ref()))
                }
                Part::Token(Token::ChunkHash(digest)) => {
                    out.push_str(&digest.render(chunk_hash.as_ref()))
                }
            }
        }
        out
    }

    fn needs(&self, pred: impl Fn(&Token) -> bool) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::Token(t) if pred(t)))
    }
}

impl std::fmt::Display for NamingTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn parse_token(template: &str, raw: &str) -> Result<Token, AssetflowError> {
    let mut pieces = raw.split(':');
    let name = pieces.next().unwrap_or_default();
    let args: Vec<&str> = pieces.collect();

    let unknown = || AssetflowError::UnknownToken {
        template: template.to_string(),
        token: raw.to_string(),
    };

    match name {
        "name" | "ext" | "path" if !args.is_empty() => Err(unknown()),
        "name" => Ok(Token::Name),
        "ext" => Ok(Token::Ext),
        "path" => Ok(Token::Path),
        "hash" | "contenthash" | "chunkhash" => {
            let digest = parse_hash_args(template, &args)?;
            if name == "chunkhash" {
                Ok(Token::ChunkHash(digest))
            } else {
                Ok(Token::Hash(digest))
            }
        }
        _ => Err(unknown()),
    }
}

/// Accepts `[hash]`, `[hash:N]`, `[hash:hex:N]` and `[hash:base64:N]`
fn parse_hash_args(template: &str, args: &[&str]) -> Result<Digest, AssetflowError> {
    let invalid = |reason: String| AssetflowError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let (encoding, len) = match args {
        [] => {
            return Ok(Digest {
                encoding: Encoding::Hex,
                len: Encoding::Hex.max_len(),
            })
        }
        [len] => (Encoding::Hex, len),
        [encoding, len] => match Encoding::parse(encoding) {
            Some(encoding) => (encoding, len),
            None => {
                return Err(invalid(format!(
                    "unsupported digest encoding '{}' (expected 'hex' or 'base64')",
                    encoding
                )))
            }
        },
        _ => return Err(invalid("too many hash arguments".to_string())),
    };

    match len.parse::<usize>() {
        Ok(n) if (1..=encoding.max_len()).contains(&n) => Ok(Digest { encoding, len: n }),
        _ => Err(invalid(format!(
            "hash length '{}' must be between 1 and {}",
            len,
            encoding.max_len()
        ))),
    }
}

/// Computes final artifact names
#[derive(Debug, Clone)]
pub struct OutputNamer {
    default_template: NamingTemplate,
}

impl OutputNamer {
    pub fn new(default_template: NamingTemplate) -> Self {
        Self { default_template }
    }

    /// Template used when a rule declares none
    pub fn default_template(&self) -> &NamingTemplate {
        &self.default_template
    }

    /// Output name for an asset, using the rule's template if it has one
    pub fn name(&self, id: &str, content: &[u8], template: Option<&NamingTemplate>) -> String {
        template
            .unwrap_or(&self.default_template)
            .render(id, content)
    }

    /// Name of the source-map side artifact for an output name
    pub fn source_map_name(name: &str) -> String {
        format!("{}.map", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash_bytes;

    #[test]
    fn test_render_tokens() {
        let template = NamingTemplate::parse("images/[name]_[hash:5].[ext]").unwrap();
        let name = template.render("app/static/logo.png", b"png-bytes");

        let hash = hash_bytes(b"png-bytes");
        assert_eq!(name, format!("images/logo_{}.png", &hash[..5]));
    }

    #[test]
    fn test_naming_is_idempotent() {
        let template = NamingTemplate::parse("[path][name].[hash:8].[ext]").unwrap();
        let first = template.render("app/main.js", b"console.log(1)");
        let second = template.render("app/main.js", b"console.log(1)");

        assert_eq!(first, second);
        assert!(first.starts_with("app/main."));
        assert!(first.ends_with(".js"));
    }

    #[test]
    fn test_distinct_content_distinct_names() {
        let template = NamingTemplate::parse("media/[hash].[ext]").unwrap();
        assert_ne!(
            template.render("a.mp3", b"one"),
            template.render("a.mp3", b"two")
        );
    }

    #[test]
    fn test_chunkhash_depends_on_identifier() {
        let template = NamingTemplate::parse("[chunkhash:12].js").unwrap();
        assert_ne!(template.render("a.js", b"same"), template.render("b.js", b"same"));

        let content = NamingTemplate::parse("[contenthash:12].js").unwrap();
        assert_eq!(content.render("a.js", b"same"), content.render("b.js", b"same"));
    }

    #[test]
    fn test_missing_extension_drops_dot() {
        let template = NamingTemplate::parse("[name].[ext]").unwrap();
        assert_eq!(template.render("LICENSE", b""), "LICENSE");
        assert_eq!(template.render(".babelrc", b""), ".babelrc");
    }

    #[test]
    fn test_unknown_token_fails() {
        let err = NamingTemplate::parse("[name].[id].js").unwrap_err();
        match err {
            AssetflowError::UnknownToken { token, .. } => assert_eq!(token, "id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_templates_fail() {
        assert!(NamingTemplate::parse("[name").is_err());
        assert!(NamingTemplate::parse("").is_err());
        assert!(NamingTemplate::parse("[hash:0]").is_err());
        assert!(NamingTemplate::parse("[hash:base32:5]").is_err());
        assert!(NamingTemplate::parse("[hash:base64:44]").is_err());
        assert!(NamingTemplate::parse("[name:3]").is_err());
    }

    #[test]
    fn test_hex_encoding_accepted() {
        let template = NamingTemplate::parse("[hash:hex:6]").unwrap();
        assert_eq!(template.render("x", b"x").len(), 6);
        assert!(template.is_content_addressed());
        assert!(!NamingTemplate::parse("[name].[ext]").unwrap().is_content_addressed());
    }

    #[test]
    fn test_base64_encoding() {
        let template = NamingTemplate::parse("images/[name]_[hash:base64:5].[ext]").unwrap();
        let name = template.render("app/logo.png", b"png-bytes");

        let full = URL_SAFE_NO_PAD.encode(blake3::hash(b"png-bytes").as_bytes());
        assert_eq!(name, format!("images/logo_{}.png", &full[..5]));

        let longest = NamingTemplate::parse("[hash:base64:43]").unwrap();
        let rendered = longest.render("x", b"x");
        assert_eq!(rendered.len(), 43);
        assert!(rendered
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_encodings_share_the_digest() {
        let hex = NamingTemplate::parse("[contenthash:hex:64]").unwrap();
        let default = NamingTemplate::parse("[contenthash]").unwrap();
        assert_eq!(hex.render("a", b"body"), hash_bytes(b"body"));
        assert_eq!(default.render("a", b"body").len(), 64);

        let chunk = NamingTemplate::parse("[chunkhash:base64:8]").unwrap();
        assert_eq!(chunk.render("a.js", b"same").len(), 8);
        assert_ne!(chunk.render("a.js", b"same"), chunk.render("b.js", b"same"));
    }

    #[test]
    fn test_namer_prefers_rule_template() {
        let namer = OutputNamer::new(NamingTemplate::parse("[name].[ext]").unwrap());
        let rule = NamingTemplate::parse("fonts/[name].[ext]").unwrap();

        assert_eq!(namer.name("a/icons.woff", b"", None), "icons.woff");
        assert_eq!(namer.name("a/icons.woff", b"", Some(&rule)), "fonts/icons.woff");
        assert_eq!(OutputNamer::source_map_name("app.js"), "app.js.map");
    }
}
