use crate::capture::{CaptureError, CaptureProvider, CaptureSession, OpenAttempt, SelectedFile};
use crate::config;
use crate::types::EncodedImage;
use dioxus::prelude::*;
use std::sync::Arc;

/// Capture provider shared through context by the app root.
#[derive(Clone)]
pub struct CaptureHandle(pub Arc<dyn CaptureProvider>);

fn start_camera(mut capture: Signal<CaptureSession>) {
    let attempt = capture.write().begin_open();
    acquire_stream(capture, attempt);
}

fn retake_photo(mut capture: Signal<CaptureSession>) {
    let attempt = capture.write().retake();
    acquire_stream(capture, attempt);
}

fn acquire_stream(mut capture: Signal<CaptureSession>, attempt: OpenAttempt) {
    let provider = capture.peek().provider();
    spawn(async move {
        let result = provider.acquire_stream(&attempt.constraints).await;
        capture.write().finish_open(attempt, result);
    });
}

#[component]
pub fn CameraCapture(on_capture: EventHandler<EncodedImage>, on_close: EventHandler<()>) -> Element {
    let provider = use_context::<CaptureHandle>();
    let mut capture = use_signal(move || {
        let config = config::current();
        CaptureSession::new(provider.0.clone(), config.camera, config.snapshot_quality)
    });

    let (error, loading, live, preview) = {
        let session = capture.read();
        (
            session.error().map(|err| err.to_string()),
            session.is_loading(),
            session.is_live(),
            session.captured().map(|image| image.as_str().to_string()),
        )
    };

    rsx! {
        div { class: "camera-overlay",
            div { class: "camera-header",
                h2 { class: "camera-title", "Capture Plant Image" }
                button {
                    class: "btn btn-ghost", r#type: "button", title: "Close",
                    onclick: move |_| {
                        capture.write().close();
                        on_close.call(());
                    },
                    "✕"
                }
            }

            div { class: "camera-body",
                if let Some(src) = preview.clone() {
                    img { class: "camera-preview", src: "{src}", alt: "Captured plant" }
                } else if loading {
                    div { class: "camera-loading", div { class: "spinner" } }
                } else if live {
                    div { class: "camera-live",
                        span { class: "camera-live-label", "Camera ready" }
                        if let Some(message) = error.clone() {
                            p { class: "camera-error", "{message}" }
                        }
                        button {
                            class: "shutter", r#type: "button", title: "Take photo",
                            // A failure lands in the session's error slot.
                            onclick: move |_| {
                                let _ = capture.write().take_photo();
                            },
                            div { class: "shutter-inner" }
                        }
                    }
                } else {
                    div { class: "camera-start",
                        div { class: "camera-icon", "📷" }
                        if let Some(message) = error {
                            p { class: "camera-error", "{message}" }
                        }
                        div { class: "camera-actions",
                            button {
                                class: "btn btn-primary", r#type: "button",
                                onclick: move |_| start_camera(capture),
                                "Open Camera"
                            }
                            label { class: "btn btn-outline",
                                "Upload Image"
                                input {
                                    class: "hidden", r#type: "file", accept: "image/*",
                                    onchange: move |evt: FormEvent| {
                                        let Some(engine) = evt.files() else { return };
                                        let provider = capture.peek().provider();
                                        spawn(async move {
                                            let Some(name) = engine.files().into_iter().next() else {
                                                return;
                                            };
                                            let Some(bytes) = engine.read_file(&name).await else {
                                                capture.write().reject_upload(CaptureError::UnreadableFile {
                                                    name,
                                                    message: "the file could not be opened".to_string(),
                                                });
                                                return;
                                            };
                                            let file = SelectedFile::Loaded { name, bytes };
                                            match provider.read_file_as_encoded_image(file).await {
                                                Ok(image) => capture.write().accept_upload(image),
                                                Err(err) => capture.write().reject_upload(err),
                                            }
                                        });
                                    },
                                }
                            }
                        }
                    }
                }
            }

            if preview.is_some() {
                div { class: "camera-footer",
                    button {
                        class: "btn btn-outline", r#type: "button",
                        onclick: move |_| retake_photo(capture),
                        "Retake"
                    }
                    button {
                        class: "btn btn-primary", r#type: "button",
                        onclick: move |_| {
                            let confirmed = capture.write().confirm();
                            if let Some(image) = confirmed {
                                on_capture.call(image);
                            }
                        },
                        "Use Photo"
                    }
                }
            }
        }
    }
}
