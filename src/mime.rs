//! Message body selection and decoding for Gmail `format=full` payloads.

use std::sync::OnceLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use html2text::render::text_renderer::TrivialDecorator;
use regex::Regex;
use tracing::{debug, warn};

use crate::connectors::GmailPayload;

const HTML_MIME: &str = "text/html";
const PLAIN_MIME: &str = "text/plain";
// Wide enough that html2text never breaks a run of text.
const RENDER_WIDTH: usize = usize::MAX / 2;

// Body data arrives base64url-encoded, sometimes padded and sometimes not.
// Decoding runs after translating to the standard alphabet.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

struct SelectedBody<'a> {
    data: &'a str,
    is_html: bool,
}

/// Produce the display text for a message payload.
///
/// Multipart payloads are searched depth-first for a `text/html` part, then a
/// `text/plain` one. Single-part payloads use their inline body. HTML is
/// reduced to text and whitespace is collapsed. When no body data exists, or
/// it cannot be decoded, the snippet is returned instead.
pub fn extract_body(payload: &GmailPayload, snippet: &str) -> String {
    let Some(selected) = select_body(payload) else {
        return snippet.to_string();
    };

    let decoded = match decode_body_data(selected.data) {
        Ok(decoded) => decoded,
        Err(error) => {
            warn!("undecodable message body, using snippet: {error}");
            return snippet.to_string();
        }
    };

    let text = if selected.is_html {
        html_to_text(&decoded)
    } else {
        decoded
    };
    collapse_whitespace(&text)
}

fn select_body(payload: &GmailPayload) -> Option<SelectedBody<'_>> {
    match payload.parts.as_deref() {
        Some(parts) => {
            let part = find_part(parts, HTML_MIME).or_else(|| find_part(parts, PLAIN_MIME))?;
            body_data(part).map(|data| SelectedBody {
                data,
                is_html: has_mime_type(part, HTML_MIME),
            })
        }
        None => body_data(payload).map(|data| SelectedBody {
            data,
            is_html: has_mime_type(payload, HTML_MIME),
        }),
    }
}

fn find_part<'a>(parts: &'a [GmailPayload], mime_type: &str) -> Option<&'a GmailPayload> {
    for part in parts {
        if has_mime_type(part, mime_type) {
            return Some(part);
        }
        if let Some(children) = part.parts.as_deref() {
            if let Some(found) = find_part(children, mime_type) {
                return Some(found);
            }
        }
    }
    None
}

fn has_mime_type(part: &GmailPayload, mime_type: &str) -> bool {
    part.mime_type
        .as_deref()
        .and_then(|value| value.split(';').next())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(mime_type))
}

fn body_data(part: &GmailPayload) -> Option<&str> {
    part.body
        .as_ref()
        .and_then(|body| body.data.as_deref())
        .filter(|data| !data.is_empty())
}

/// Decode base64url body data to text.
///
/// Bytes that are not valid UTF-8 are read one byte per character.
pub fn decode_body_data(data: &str) -> Result<String, base64::DecodeError> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = BODY_ENGINE.decode(normalized)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => {
            debug!("message body is not utf-8, reading as latin-1");
            error.into_bytes().into_iter().map(char::from).collect()
        }
    })
}

/// Render HTML to plain text, falling back to a regex tag strip if the
/// renderer fails. Tables are flattened without borders.
pub fn html_to_text(html: &str) -> String {
    let rendered = std::panic::catch_unwind(|| {
        html2text::config::with_decorator(TrivialDecorator::new())
            .raw_mode(true)
            .no_table_borders()
            .string_from_read(html.as_bytes(), RENDER_WIDTH)
    });

    match rendered {
        Ok(Ok(text)) => text,
        Ok(Err(error)) => {
            warn!("html renderer rejected message body, stripping tags instead: {error}");
            strip_tags(html)
        }
        Err(_) => {
            warn!("html renderer failed on message body, stripping tags instead");
            strip_tags(html)
        }
    }
}

pub fn strip_tags(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>?").expect("compile html tag regex"))
        .replace_all(html, "")
        .into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
