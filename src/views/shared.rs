use comrak::ComrakOptions;
use once_cell::sync::Lazy;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    // Replies use single newlines between list lines.
    options.render.hardbreaks = true;
    options
});

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour padding:zero]:[minute padding:zero]");

pub fn markdown_to_html(md: &str) -> String {
    comrak::markdown_to_html(md, &MARKDOWN_OPTIONS)
}

/// Hour and minute in the device's local offset when it can be determined.
pub fn format_message_timestamp(timestamp: OffsetDateTime) -> String {
    let datetime = match UtcOffset::current_local_offset() {
        Ok(offset) => timestamp.to_offset(offset),
        Err(_) => timestamp,
    };
    format_clock(datetime)
}

fn format_clock(datetime: OffsetDateTime) -> String {
    datetime.format(MESSAGE_TIME_FORMAT).unwrap_or_default()
}
