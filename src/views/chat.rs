use crate::config;
use crate::controller::SessionController;
use crate::types::{EncodedImage, Message};
use crate::views::camera::CameraCapture;
use crate::views::shared::{format_message_timestamp, markdown_to_html};
use dioxus::events::Key;
use dioxus::prelude::*;

fn send_text(controller: &SessionController, mut input: Signal<String>) {
    let text = input();
    if controller.submit_user_turn(&text, None) {
        input.set(String::new());
    }
}

#[component]
pub fn DiagnosisChat() -> Element {
    let controller = use_hook(|| SessionController::new(config::current()));
    let mut revision = use_signal(|| 0u64);
    let mut input = use_signal(String::new);

    use_future({
        let controller = controller.clone();
        move || {
            let mut updates = controller.subscribe();
            async move {
                while updates.changed().await.is_ok() {
                    let current = *updates.borrow_and_update();
                    revision.set(current);
                }
            }
        }
    });

    use_drop({
        let controller = controller.clone();
        move || controller.close()
    });

    // Re-render whenever the controller publishes a change.
    let _ = revision();
    let snapshot = controller.snapshot();

    let enter_ctl = controller.clone();
    let click_ctl = controller.clone();
    let camera_ctl = controller.clone();
    let capture_ctl = controller.clone();
    let close_ctl = controller.clone();

    rsx! {
        div { class: "chat-screen",
            div { class: "chat-header",
                div { class: "avatar bot", "🌱" }
                div { class: "chat-title",
                    h1 { "CropCare Assistant" }
                    p { class: "chat-status", "{snapshot.status}" }
                }
            }

            div { class: "chat-list",
                for message in snapshot.messages.iter() {
                    ChatBubble { key: "{message.id}", message: message.clone() }
                }
                if snapshot.is_typing {
                    TypingIndicator {}
                }
            }

            form { class: "composer",
                div { class: "composer-inner",
                    button {
                        class: "btn btn-secondary", r#type: "button", title: "Take a photo",
                        onclick: move |_| camera_ctl.open_camera(),
                        "📷"
                    }
                    input {
                        r#type: "text",
                        placeholder: "Describe your crop issue...",
                        value: "{input}",
                        oninput: move |ev| input.set(ev.value()),
                        onkeydown: move |ev| {
                            if ev.key() == Key::Enter {
                                ev.prevent_default();
                                send_text(&enter_ctl, input);
                            }
                        },
                    }
                    button {
                        class: "btn btn-primary", r#type: "button",
                        disabled: input().trim().is_empty(),
                        onclick: move |_| send_text(&click_ctl, input),
                        "Send"
                    }
                }
            }

            if snapshot.is_camera_open {
                CameraCapture {
                    on_capture: move |image: EncodedImage| {
                        capture_ctl.handle_capture(image);
                    },
                    on_close: move |_| close_ctl.close_camera(),
                }
            }
        }
    }
}

#[component]
fn ChatBubble(message: Message) -> Element {
    let side = if message.is_bot() { "bot" } else { "user" };
    let timestamp = format_message_timestamp(message.timestamp);
    let body_html = message.is_bot().then(|| markdown_to_html(&message.text));

    rsx! {
        div { class: "message-row {side}",
            div { class: "avatar {side}", if message.is_bot() { "🌱" } else { "🧑‍🌾" } }
            div { class: "message-stack",
                if let Some(image) = message.image.as_ref() {
                    img { class: "message-image", src: "{image}", alt: "Plant capture" }
                }
                div { class: "bubble {side}",
                    if let Some(html) = body_html {
                        div { class: "md", dangerous_inner_html: "{html}" }
                    } else {
                        p { class: "plain", "{message.text}" }
                    }
                }
                span { class: "message-timestamp", "{timestamp}" }
            }
        }
    }
}

#[component]
fn TypingIndicator() -> Element {
    rsx! {
        div { class: "message-row bot",
            div { class: "avatar bot", "🌱" }
            div { class: "bubble bot typing",
                span { class: "dot" }
                span { class: "dot" }
                span { class: "dot" }
            }
        }
    }
}
