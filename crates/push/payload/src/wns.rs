//! WNS payload construction.
//!
//! WNS notifications carry exactly one content kind per request, tagged by
//! the `X-WNS-Type` header: toast, tile, badge or raw.
//! <https://learn.microsoft.com/en-us/windows/apps/design/shell/tiles-and-notifications/>

use push_core::{Alert, Message, ValidationError};
use serde_json::Value;

/// The WNS notification kind, carried in the `X-WNS-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WnsKind {
    Toast,
    Tile,
    Badge,
    Raw,
}

impl WnsKind {
    pub fn wns_type(self) -> &'static str {
        match self {
            WnsKind::Toast => "wns/toast",
            WnsKind::Tile => "wns/tile",
            WnsKind::Badge => "wns/badge",
            WnsKind::Raw => "wns/raw",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            WnsKind::Raw => "application/octet-stream",
            _ => "text/xml",
        }
    }
}

/// A serialized WNS notification body plus its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WnsPayload {
    pub kind: WnsKind,
    pub body: Vec<u8>,
}

/// Build the WNS payload for `message`.
///
/// Content source, exactly one required: an alert (toast), the `tile`
/// extra (tile), the message badge (badge), or the `raw` extra (raw
/// bytes passed through unchanged).
pub fn build(message: &Message) -> Result<WnsPayload, ValidationError> {
    let tile = message.extra.get("tile");
    let raw = message.extra.get("raw");

    let sources = [
        message.alert.is_some(),
        tile.is_some(),
        message.badge.is_some(),
        raw.is_some(),
    ];
    if sources.iter().filter(|present| **present).count() != 1 {
        return Err(ValidationError::AmbiguousContent);
    }

    if let Some(alert) = &message.alert {
        return Ok(WnsPayload {
            kind: WnsKind::Toast,
            body: toast_xml(alert).into_bytes(),
        });
    }
    if let Some(tile) = tile {
        return Ok(WnsPayload {
            kind: WnsKind::Tile,
            body: tile_xml(tile)?.into_bytes(),
        });
    }
    if let Some(badge) = message.badge {
        return Ok(WnsPayload {
            kind: WnsKind::Badge,
            body: format!(r#"<badge value="{badge}"/>"#).into_bytes(),
        });
    }
    if let Some(raw) = raw {
        let body = match raw {
            Value::String(s) => s.clone().into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        };
        return Ok(WnsPayload {
            kind: WnsKind::Raw,
            body,
        });
    }

    unreachable!("exactly one source was verified above")
}

fn toast_xml(alert: &Alert) -> String {
    // A bare string becomes a one-line ToastText01; title + body use the
    // two-line ToastText02 template.
    let (template, lines): (&str, Vec<&str>) = match alert {
        Alert::Plain(body) => ("ToastText01", vec![body]),
        Alert::Structured { title, body, .. } => match (title.as_deref(), body.as_deref()) {
            (Some(title), Some(body)) => ("ToastText02", vec![title, body]),
            (Some(single), None) | (None, Some(single)) => ("ToastText01", vec![single]),
            (None, None) => ("ToastText01", vec![]),
        },
    };

    let mut xml = format!(r#"<toast><visual><binding template="{template}">"#);
    for (i, line) in lines.iter().enumerate() {
        let id = i + 1;
        xml.push_str(&format!(r#"<text id="{id}">{}</text>"#, escape(line)));
    }
    xml.push_str("</binding></visual></toast>");
    xml
}

fn tile_xml(tile: &Value) -> Result<String, ValidationError> {
    let obj = tile
        .as_object()
        .ok_or_else(|| ValidationError::InvalidField("tile must be an object".into()))?;

    let template = obj
        .get("template")
        .and_then(Value::as_str)
        .unwrap_or("TileSquareText01");

    let mut xml = format!(r#"<tile><visual><binding template="{}">"#, escape(template));
    for (element, key) in [("text", "text"), ("image", "image")] {
        if let Some(items) = obj.get(key) {
            let items = items.as_array().ok_or_else(|| {
                ValidationError::InvalidField(format!("tile {key} must be a list of strings"))
            })?;
            for (i, item) in items.iter().enumerate() {
                let id = i + 1;
                let text = item.as_str().ok_or_else(|| {
                    ValidationError::InvalidField(format!("tile {key} must be a list of strings"))
                })?;
                if element == "image" {
                    xml.push_str(&format!(r#"<image id="{id}" src="{}"/>"#, escape(text)));
                } else {
                    xml.push_str(&format!(r#"<text id="{id}">{}</text>"#, escape(text)));
                }
            }
        }
    }
    xml.push_str("</binding></visual></tile>");
    Ok(xml)
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
