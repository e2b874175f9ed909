use crate::responses::select_response;
use crate::types::{EncodedImage, Message, MessageId, Role};
use rand::Rng;
use serde::Serialize;
use time::OffsetDateTime;

pub const GREETING: &str = "Hello! I'm your CropCare assistant 🌱\n\nI can help you identify pests, diseases, and provide solutions for your crops. You can:\n\n📸 Take a photo of your plant\n💬 Describe your crop issue\n\nHow can I help you today?";

/// Shown in place of the text for a photo sent without a caption.
pub const PHOTO_PLACEHOLDER: &str = "Here's a photo of my plant";

const STATUS_TYPING: &str = "Analyzing...";
const STATUS_READY: &str = "Online • Ready to help";

fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A user turn that still owes a bot reply.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingReply {
    pub trigger: MessageId,
    pub text: String,
    pub has_image: bool,
}

/// What the rendering layer receives.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub is_typing: bool,
    pub is_camera_open: bool,
    pub status: &'static str,
}

/// Append-only conversation plus the typing and camera flags.
#[derive(Debug)]
pub struct Session {
    messages: Vec<Message>,
    next_id: u64,
    pending_replies: usize,
    camera_open: bool,
    closed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::new(),
            next_id: 1,
            pending_replies: 0,
            camera_open: false,
            closed: false,
        };
        session.append(Role::Bot, GREETING.to_string(), None, None);
        session
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.pending_replies > 0
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera_open
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn status_line(&self) -> &'static str {
        if self.is_typing() {
            STATUS_TYPING
        } else {
            STATUS_READY
        }
    }

    /// Returns `true` when the flag actually flipped.
    pub fn set_camera_open(&mut self, open: bool) -> bool {
        let changed = self.camera_open != open;
        self.camera_open = open;
        changed
    }

    /// Records a user turn. Blank text without an image is ignored, as is
    /// anything sent after the session was closed. Text is stored as sent; an
    /// uncaptioned photo gets the placeholder.
    pub fn submit_user_turn(
        &mut self,
        text: &str,
        image: Option<EncodedImage>,
    ) -> Option<PendingReply> {
        if self.closed {
            return None;
        }
        if text.trim().is_empty() && image.is_none() {
            return None;
        }

        let has_image = image.is_some();
        let display = if text.is_empty() {
            PHOTO_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        };
        let trigger = self.append(Role::User, display, image, None);
        self.pending_replies += 1;

        Some(PendingReply {
            trigger,
            text: text.to_string(),
            has_image,
        })
    }

    /// Appends the bot answer for `pending`. Returns `None` once closed.
    pub fn deliver_reply<R: Rng + ?Sized>(
        &mut self,
        pending: PendingReply,
        rng: &mut R,
    ) -> Option<&Message> {
        if self.closed {
            return None;
        }
        let reply = select_response(&pending.text, pending.has_image, rng);
        self.pending_replies = self.pending_replies.saturating_sub(1);
        self.append(Role::Bot, reply.to_string(), None, Some(pending.trigger));
        self.messages.last()
    }

    /// Drops any outstanding replies and refuses further turns.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending_replies = 0;
        self.camera_open = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            is_typing: self.is_typing(),
            is_camera_open: self.camera_open,
            status: self.status_line(),
        }
    }

    fn append(
        &mut self,
        role: Role,
        text: String,
        image: Option<EncodedImage>,
        in_reply_to: Option<MessageId>,
    ) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            text,
            image,
            timestamp: current_time(),
            in_reply_to,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::{IMAGE_ANALYSIS_TEMPLATES, MORE_DETAIL_TEMPLATE, PEST_CONTROL_TEMPLATE};
    use rand::rngs::mock::StepRng;

    fn photo() -> EncodedImage {
        EncodedImage::from_bytes("image/jpeg", &[0xff, 0xd8, 0xff])
    }

    #[test]
    fn test_new_session_is_seeded_with_greeting() {
        let session = Session::new();
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_bot());
        assert_eq!(messages[0].id, MessageId(1));
        assert_eq!(messages[0].text, GREETING);
        assert!(!session.is_typing());
        assert!(!session.is_camera_open());
        assert_eq!(session.status_line(), "Online • Ready to help");
    }

    #[test]
    fn test_blank_turn_without_image_is_ignored() {
        let mut session = Session::new();
        assert!(session.submit_user_turn("", None).is_none());
        assert!(session.submit_user_turn("  \n\t", None).is_none());
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_typing());
    }

    #[test]
    fn test_text_turn_then_reply() {
        let mut session = Session::new();
        let pending = session.submit_user_turn("hi", None).expect("turn accepted");

        let user = session.messages().last().unwrap();
        assert_eq!(user.text, "hi");
        assert!(!user.is_bot());
        assert!(user.image.is_none());
        assert!(session.is_typing());
        assert_eq!(session.status_line(), "Analyzing...");

        let reply = session
            .deliver_reply(pending.clone(), &mut StepRng::new(0, 0))
            .unwrap();
        assert!(reply.is_bot());
        assert_eq!(reply.text, MORE_DETAIL_TEMPLATE);
        assert_eq!(reply.in_reply_to, Some(pending.trigger));
        assert_eq!(session.messages().len(), 3);
        assert!(!session.is_typing());
    }

    #[test]
    fn test_photo_without_caption_uses_placeholder() {
        let mut session = Session::new();
        let pending = session.submit_user_turn("", Some(photo())).unwrap();
        assert!(pending.has_image);

        let user = session.messages().last().unwrap();
        assert_eq!(user.text, PHOTO_PLACEHOLDER);
        assert_eq!(user.image, Some(photo()));

        let reply = session.deliver_reply(pending, &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(reply.text, IMAGE_ANALYSIS_TEMPLATES[0]);
    }

    #[test]
    fn test_user_text_is_kept_as_sent() {
        let mut session = Session::new();
        session.submit_user_turn("  yellow leaves \n", None).unwrap();
        assert_eq!(session.messages()[1].text, "  yellow leaves \n");

        session.submit_user_turn("   ", Some(photo())).unwrap();
        assert_eq!(session.messages()[2].text, "   ");
        assert_eq!(session.messages()[2].image, Some(photo()));
    }

    #[test]
    fn test_camera_flag_reports_flips() {
        let mut session = Session::new();
        assert!(session.set_camera_open(true));
        assert!(!session.set_camera_open(true));
        assert!(session.set_camera_open(false));
        assert!(!session.set_camera_open(false));
    }

    #[test]
    fn test_ids_increase_and_typing_tracks_outstanding_replies() {
        let mut session = Session::new();
        let first = session.submit_user_turn("pest", None).unwrap();
        let second = session.submit_user_turn("hello", None).unwrap();
        assert!(second.trigger > first.trigger);

        let mut rng = StepRng::new(0, 0);
        session.deliver_reply(first, &mut rng);
        assert!(session.is_typing());
        session.deliver_reply(second, &mut rng);
        assert!(!session.is_typing());

        let ids: Vec<u64> = session.messages().iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(session.messages()[3].text, PEST_CONTROL_TEMPLATE);
    }

    #[test]
    fn test_closed_session_appends_nothing() {
        let mut session = Session::new();
        let pending = session.submit_user_turn("bug", None).unwrap();
        session.set_camera_open(true);
        session.close();

        assert!(!session.is_typing());
        assert!(!session.is_camera_open());
        assert!(session.deliver_reply(pending, &mut StepRng::new(0, 0)).is_none());
        assert!(session.submit_user_turn("again", None).is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_snapshot_serializes_roles() {
        let mut session = Session::new();
        session.submit_user_turn("hi", None);
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["messages"][0]["role"], "bot");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["is_typing"], true);
        assert!(json["messages"][1].get("image").is_none());
    }
}
