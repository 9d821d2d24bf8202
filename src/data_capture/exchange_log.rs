use std::borrow::Cow;

use log::info;

/// Builds a callback logging each captured exchange at INFO.
///
/// `in` is logged as the request and `out` as the response, decoded lossily
/// as UTF-8. With `preview_bytes > 0` each side is cut to that many bytes
/// and suffixed with `...`.
pub fn log_exchange(preview_bytes: usize) -> impl Fn(&[u8], &[u8]) + Send + Sync + 'static {
    move |inb: &[u8], outb: &[u8]| {
        info!("request:\n{}", render(inb, preview_bytes));
        info!("response:\n{}", render(outb, preview_bytes));
    }
}

pub(crate) fn render(bytes: &[u8], preview_bytes: usize) -> Cow<'_, str> {
    if preview_bytes == 0 || bytes.len() <= preview_bytes {
        return String::from_utf8_lossy(bytes);
    }
    let mut text = String::from_utf8_lossy(&bytes[..preview_bytes]).into_owned();
    text.push_str("...");
    Cow::Owned(text)
}
