// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook payload model and nested-envelope unwrapping.
//!
//! WhatsApp nests the actual content inside up to five wrapper kinds
//! (ephemeral, view-once v1/v2/v2-extension, document-with-caption,
//! edited), and a single message can carry several at once. The unwrapping
//! loop peels one layer at a time until a content-bearing payload is
//! reached or the depth cap trips.

use serde::Deserialize;

/// Hard cap on wrapper unwrapping, guarding against pathological nesting.
const MAX_UNWRAP_DEPTH: usize = 5;

/// The webhook event envelope delivered by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub instance: String,
    #[serde(default)]
    pub data: Option<EventData>,
}

/// Per-message webhook data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub key: MessageKey,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<MessagePayload>,
}

/// The message key: conversation id, direction flag, and message id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub remote_jid_alt: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: Option<String>,
}

impl MessageKey {
    /// Resolve the usable sender JID.
    ///
    /// Linked-device (`@lid`) JIDs cannot be matched against stored phone
    /// numbers; they are only usable when the gateway supplies the
    /// `@s.whatsapp.net` alternative. Returns `None` when no usable JID
    /// exists (callers drop the event with an error log).
    pub fn sender_jid(&self) -> Option<&str> {
        let jid = self.remote_jid.as_deref()?;
        if jid.contains("@lid") {
            self.remote_jid_alt
                .as_deref()
                .filter(|alt| alt.contains("@s.whatsapp.net"))
        } else {
            Some(jid)
        }
    }
}

/// The digits of a JID, without the domain part or a leading `+`.
pub fn jid_digits(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid).trim_start_matches('+')
}

/// The extracted body of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Plain text, extended text, or a media caption (with placeholder
    /// text for caption-less media).
    Text(String),
    /// A voice note; the payload must be fetched and transcribed.
    Audio,
}

/// A wrapper layer holding another message payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wrapped {
    #[serde(default)]
    pub message: Option<Box<MessagePayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioContent {}

/// The polymorphic message payload: either one of the known wrapper kinds
/// or a content-bearing variant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    // Wrapper layers.
    #[serde(default)]
    pub ephemeral_message: Option<Wrapped>,
    #[serde(default)]
    pub view_once_message: Option<Wrapped>,
    #[serde(default)]
    pub view_once_message_v2: Option<Wrapped>,
    #[serde(default)]
    pub view_once_message_v2_extension: Option<Wrapped>,
    #[serde(default)]
    pub document_with_caption_message: Option<Wrapped>,
    #[serde(default)]
    pub edited_message: Option<Wrapped>,

    // Content variants.
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub extended_text_message: Option<ExtendedText>,
    #[serde(default)]
    pub image_message: Option<MediaContent>,
    #[serde(default)]
    pub video_message: Option<MediaContent>,
    #[serde(default)]
    pub document_message: Option<MediaContent>,
    #[serde(default)]
    pub audio_message: Option<AudioContent>,
}

impl MessagePayload {
    /// Peel one wrapper layer, if any is present.
    fn unwrap_one(&self) -> Option<&MessagePayload> {
        let wrappers = [
            &self.ephemeral_message,
            &self.view_once_message,
            &self.view_once_message_v2,
            &self.view_once_message_v2_extension,
            &self.document_with_caption_message,
            &self.edited_message,
        ];
        wrappers
            .into_iter()
            .flatten()
            .find_map(|w| w.message.as_deref())
    }

    /// Apply [`unwrap_one`](Self::unwrap_one) until a content-bearing
    /// payload is reached or the depth cap trips.
    pub fn unwrap_layers(&self) -> &MessagePayload {
        let mut current = self;
        for _ in 0..MAX_UNWRAP_DEPTH {
            match current.unwrap_one() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Extract the message body after unwrapping.
    ///
    /// Media without a caption yields a placeholder marker so the
    /// conversation history still records that something arrived. Returns
    /// `None` for unsupported content (stickers, locations, ...).
    pub fn body(&self) -> Option<MessageBody> {
        let inner = self.unwrap_layers();

        if let Some(text) = &inner.conversation {
            return Some(MessageBody::Text(text.clone()));
        }
        if let Some(extended) = &inner.extended_text_message {
            return extended.text.clone().map(MessageBody::Text);
        }
        if let Some(image) = &inner.image_message {
            return Some(MessageBody::Text(caption_or(image, "[Imagem enviada]")));
        }
        if let Some(video) = &inner.video_message {
            return Some(MessageBody::Text(caption_or(video, "[Vídeo enviado]")));
        }
        if let Some(document) = &inner.document_message {
            return Some(MessageBody::Text(caption_or(
                document,
                "[Documento enviado]",
            )));
        }
        if inner.audio_message.is_some() {
            return Some(MessageBody::Audio);
        }

        None
    }
}

fn caption_or(media: &MediaContent, placeholder: &str) -> String {
    match media.caption.as_deref() {
        Some(caption) if !caption.is_empty() => caption.to_string(),
        _ => placeholder.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> MessagePayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn plain_conversation_text() {
        let p = payload(serde_json::json!({"conversation": "sim, sou eu"}));
        assert_eq!(p.body(), Some(MessageBody::Text("sim, sou eu".into())));
    }

    #[test]
    fn extended_text() {
        let p = payload(serde_json::json!({
            "extendedTextMessage": {"text": "quem fala?"}
        }));
        assert_eq!(p.body(), Some(MessageBody::Text("quem fala?".into())));
    }

    #[test]
    fn ephemeral_wrapping_is_unwrapped() {
        let p = payload(serde_json::json!({
            "ephemeralMessage": {
                "message": {"conversation": "oi"}
            }
        }));
        assert_eq!(p.body(), Some(MessageBody::Text("oi".into())));
    }

    #[test]
    fn ephemeral_view_once_double_wrapping() {
        // A message can be temporary AND view-once at the same time.
        let p = payload(serde_json::json!({
            "ephemeralMessage": {
                "message": {
                    "viewOnceMessageV2": {
                        "message": {"imageMessage": {"caption": "olha isso"}}
                    }
                }
            }
        }));
        assert_eq!(p.body(), Some(MessageBody::Text("olha isso".into())));
    }

    #[test]
    fn unwrap_depth_is_capped() {
        // Six ephemeral layers: the cap stops at five, leaving one wrapper
        // unpeeled, so no content is found and the message is dropped.
        let mut inner = serde_json::json!({"conversation": "deep"});
        for _ in 0..6 {
            inner = serde_json::json!({"ephemeralMessage": {"message": inner}});
        }
        let p = payload(inner);
        assert_eq!(p.body(), None);
    }

    #[test]
    fn captionless_media_yields_placeholder() {
        let p = payload(serde_json::json!({"imageMessage": {}}));
        assert_eq!(p.body(), Some(MessageBody::Text("[Imagem enviada]".into())));

        let p = payload(serde_json::json!({"documentMessage": {"caption": ""}}));
        assert_eq!(
            p.body(),
            Some(MessageBody::Text("[Documento enviado]".into()))
        );
    }

    #[test]
    fn audio_requests_transcription() {
        let p = payload(serde_json::json!({"audioMessage": {"seconds": 12}}));
        assert_eq!(p.body(), Some(MessageBody::Audio));
    }

    #[test]
    fn unsupported_content_is_none() {
        let p = payload(serde_json::json!({"stickerMessage": {"isAnimated": false}}));
        assert_eq!(p.body(), None);
    }

    #[test]
    fn lid_jid_requires_alternative() {
        let key: MessageKey = serde_json::from_value(serde_json::json!({
            "remoteJid": "123456@lid",
            "remoteJidAlt": "5532991749187@s.whatsapp.net",
            "fromMe": false,
            "id": "MSG-1"
        }))
        .unwrap();
        assert_eq!(key.sender_jid(), Some("5532991749187@s.whatsapp.net"));

        let no_alt: MessageKey = serde_json::from_value(serde_json::json!({
            "remoteJid": "123456@lid",
            "fromMe": false,
            "id": "MSG-2"
        }))
        .unwrap();
        assert_eq!(no_alt.sender_jid(), None);
    }

    #[test]
    fn jid_digits_strips_domain_and_plus() {
        assert_eq!(jid_digits("5532991749187@s.whatsapp.net"), "5532991749187");
        assert_eq!(jid_digits("+5532991749187@s.whatsapp.net"), "5532991749187");
    }

    #[test]
    fn full_webhook_event_deserializes() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "event": "messages.upsert",
            "instance": "inst-1",
            "data": {
                "key": {
                    "remoteJid": "5532991749187@s.whatsapp.net",
                    "fromMe": false,
                    "id": "MSG-1"
                },
                "pushName": "Gustavo",
                "message": {"conversation": "não sou eu não"}
            }
        }))
        .unwrap();

        assert_eq!(event.event, "messages.upsert");
        let data = event.data.unwrap();
        assert_eq!(data.push_name.as_deref(), Some("Gustavo"));
        assert!(!data.key.from_me);
        assert_eq!(
            data.message.unwrap().body(),
            Some(MessageBody::Text("não sou eu não".into()))
        );
    }
}
