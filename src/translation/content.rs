//! Content-part codecs for both wire vocabularies.
//!
//! A Chat part list uses `text` / `image_url` / `input_audio` / `file` /
//! `video_url`; a Responses part list uses `input_text` (or `output_text` for
//! assistant turns) / `input_image` / `input_audio` / `input_file` /
//! `input_video`. Both decode into [`ContentPart`] first.

use serde_json::{Map, Value};

use crate::types::{AudioRef, ChatContent, ContentPart, FileRef, ImageRef, Role, VideoRef};

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn put(obj: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        obj.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// A reference that is either a bare URL string or `{"url": ..., "detail": ...}`.
fn url_ref(value: Option<&Value>) -> (Option<String>, Option<String>) {
    match value {
        Some(Value::String(url)) => (Some(url.clone()), None),
        Some(Value::Object(obj)) => (str_field(obj, "url"), str_field(obj, "detail")),
        _ => (None, None),
    }
}

fn part_kind(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
}

impl ContentPart {
    /// Decodes one Chat-vocabulary part. Non-objects and untyped objects yield `None`.
    pub fn from_chat_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = part_kind(obj)?;
        let part = match kind {
            "text" => Self::Text {
                text: str_field(obj, "text").unwrap_or_default(),
            },
            "image_url" => {
                let (url, detail) = url_ref(obj.get("image_url"));
                Self::Image(ImageRef {
                    url,
                    detail,
                    file_id: None,
                })
            }
            "input_audio" => {
                let audio = obj.get("input_audio").and_then(Value::as_object);
                Self::Audio(AudioRef {
                    data: audio.and_then(|audio| str_field(audio, "data")),
                    format: audio.and_then(|audio| str_field(audio, "format")),
                })
            }
            "file" => {
                let file = obj.get("file").and_then(Value::as_object);
                let field = |key: &str| file.and_then(|file| str_field(file, key));
                Self::File(FileRef {
                    file_id: field("file_id"),
                    file_data: field("file_data"),
                    filename: field("filename"),
                    file_url: field("file_url"),
                })
            }
            "video_url" => {
                let (url, _) = url_ref(obj.get("video_url"));
                Self::Video(VideoRef { url })
            }
            other => Self::Unknown {
                kind: other.to_string(),
            },
        };
        Some(part)
    }

    pub fn to_chat_value(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::Text { text } => {
                out.insert("type".to_string(), Value::String("text".to_string()));
                out.insert("text".to_string(), Value::String(text.clone()));
            }
            Self::Image(image) => {
                let mut inner = Map::new();
                put(&mut inner, "url", &image.url);
                put(&mut inner, "detail", &image.detail);
                out.insert("type".to_string(), Value::String("image_url".to_string()));
                out.insert("image_url".to_string(), Value::Object(inner));
            }
            Self::Audio(audio) => {
                let mut inner = Map::new();
                put(&mut inner, "data", &audio.data);
                put(&mut inner, "format", &audio.format);
                out.insert("type".to_string(), Value::String("input_audio".to_string()));
                out.insert("input_audio".to_string(), Value::Object(inner));
            }
            Self::File(file) => {
                let mut inner = Map::new();
                put(&mut inner, "file_id", &file.file_id);
                put(&mut inner, "file_data", &file.file_data);
                put(&mut inner, "filename", &file.filename);
                put(&mut inner, "file_url", &file.file_url);
                out.insert("type".to_string(), Value::String("file".to_string()));
                out.insert("file".to_string(), Value::Object(inner));
            }
            Self::Video(video) => {
                let mut inner = Map::new();
                put(&mut inner, "url", &video.url);
                out.insert("type".to_string(), Value::String("video_url".to_string()));
                out.insert("video_url".to_string(), Value::Object(inner));
            }
            Self::Unknown { kind } => {
                out.insert("type".to_string(), Value::String(kind.clone()));
            }
        }
        Value::Object(out)
    }

    /// Decodes one Responses-vocabulary part.
    pub fn from_responses_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = part_kind(obj)?;
        let part = match kind {
            "input_text" | "output_text" | "text" => Self::Text {
                text: str_field(obj, "text").unwrap_or_default(),
            },
            "input_image" => {
                let (url, nested_detail) = url_ref(obj.get("image_url"));
                Self::Image(ImageRef {
                    url,
                    detail: str_field(obj, "detail").or(nested_detail),
                    file_id: str_field(obj, "file_id"),
                })
            }
            "input_audio" => {
                let audio = obj.get("input_audio").and_then(Value::as_object);
                Self::Audio(AudioRef {
                    data: audio.and_then(|audio| str_field(audio, "data")),
                    format: audio.and_then(|audio| str_field(audio, "format")),
                })
            }
            "input_file" => {
                let nested = obj.get("file").and_then(Value::as_object);
                let field = |key: &str| {
                    str_field(obj, key).or_else(|| nested.and_then(|file| str_field(file, key)))
                };
                Self::File(FileRef {
                    file_id: field("file_id"),
                    file_data: field("file_data"),
                    filename: field("filename"),
                    file_url: field("file_url"),
                })
            }
            "input_video" => {
                let (url, _) = url_ref(obj.get("video_url"));
                Self::Video(VideoRef { url })
            }
            other => Self::Unknown {
                kind: other.to_string(),
            },
        };
        Some(part)
    }

    /// Encodes for a Responses message authored by `role`.
    pub fn to_responses_value(&self, role: Role) -> Value {
        let mut out = Map::new();
        match self {
            Self::Text { text } => {
                let kind = if role == Role::Assistant {
                    "output_text"
                } else {
                    "input_text"
                };
                out.insert("type".to_string(), Value::String(kind.to_string()));
                out.insert("text".to_string(), Value::String(text.clone()));
            }
            Self::Image(image) => {
                out.insert("type".to_string(), Value::String("input_image".to_string()));
                put(&mut out, "image_url", &image.url);
                put(&mut out, "detail", &image.detail);
                put(&mut out, "file_id", &image.file_id);
            }
            Self::Audio(audio) => {
                let mut inner = Map::new();
                put(&mut inner, "data", &audio.data);
                put(&mut inner, "format", &audio.format);
                out.insert("type".to_string(), Value::String("input_audio".to_string()));
                out.insert("input_audio".to_string(), Value::Object(inner));
            }
            Self::File(file) => {
                out.insert("type".to_string(), Value::String("input_file".to_string()));
                put(&mut out, "file_id", &file.file_id);
                put(&mut out, "file_data", &file.file_data);
                put(&mut out, "filename", &file.filename);
                put(&mut out, "file_url", &file.file_url);
            }
            Self::Video(video) => {
                out.insert("type".to_string(), Value::String("input_video".to_string()));
                put(&mut out, "video_url", &video.url);
            }
            Self::Unknown { kind } => {
                out.insert("type".to_string(), Value::String(kind.clone()));
            }
        }
        Value::Object(out)
    }
}

impl ChatContent {
    /// Lenient decode of a Chat `content` value.
    pub fn from_chat_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => {
                let parts: Vec<ContentPart> =
                    items.iter().filter_map(ContentPart::from_chat_value).collect();
                if parts.is_empty() {
                    Self::default()
                } else {
                    Self::Parts(parts)
                }
            }
            other => Self::Text(other.to_string()),
        }
    }
}

/// Maps a Responses message `content` value into Chat content.
///
/// Strings pass through; part lists are re-tagged; an empty result collapses
/// to `""`. Any other JSON becomes its text form.
pub fn responses_content_to_chat(content: &Value) -> ChatContent {
    match content {
        Value::Null => ChatContent::default(),
        Value::String(text) => ChatContent::Text(text.clone()),
        Value::Array(items) => {
            let parts: Vec<ContentPart> = items
                .iter()
                .filter_map(ContentPart::from_responses_value)
                .collect();
            if parts.is_empty() {
                ChatContent::default()
            } else {
                ChatContent::Parts(parts)
            }
        }
        other => ChatContent::Text(other.to_string()),
    }
}

/// Maps Chat content into a Responses message `content` value for `role`.
pub fn chat_content_to_responses(content: &ChatContent, role: Role) -> Value {
    match content {
        ChatContent::Text(text) => Value::String(text.clone()),
        ChatContent::Parts(parts) if parts.is_empty() => Value::String(String::new()),
        ChatContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|part| part.to_responses_value(role))
                .collect(),
        ),
    }
}
