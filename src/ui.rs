use crate::capture::DesktopCapture;
use crate::views::{CaptureHandle, DiagnosisChat};
use dioxus::prelude::*;
use std::sync::Arc;

const CROPCARE_CSS: Asset = asset!("/assets/cropcare.css");

#[component]
pub fn App() -> Element {
    // TODO: install a getUserMedia-backed provider for the `web` feature.
    use_context_provider(|| CaptureHandle(Arc::new(DesktopCapture)));

    rsx! {
        document::Link { rel: "stylesheet", href: CROPCARE_CSS }
        DiagnosisChat {}
    }
}
