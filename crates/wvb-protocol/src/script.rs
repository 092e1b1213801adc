//! JavaScript snippets injected into the page.

use crate::encoding::percent_encode_query;
use crate::error::CodecError;
use crate::message::{CallInfo, Envelope};
use crate::wire;

/// Script delivering a native-initiated call to the page dispatcher.
pub fn dispatch_script(call: &CallInfo) -> Result<String, CodecError> {
    Ok(format!("{}({})", wire::NATIVE_DISPATCH_FUNCTION, call.to_json()?))
}

/// Check that a callback stub is a plain JavaScript identifier.
///
/// The stub is spliced into evaluated code, so anything else is refused.
pub fn is_valid_callback_stub(stub: &str) -> bool {
    let mut chars = stub.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Script invoking a page callback stub with a reply, then deleting the stub.
///
/// The stub receives the envelope's `data`. Returns `None` if the stub is
/// not a valid identifier.
pub fn callback_script(stub: &str, envelope: &Envelope) -> Option<String> {
    if !is_valid_callback_stub(stub) {
        return None;
    }
    let encoded = percent_encode_query(&envelope.to_json_string());
    Some(format!(
        "try {{\n    {stub}(JSON.parse(decodeURIComponent(\"{encoded}\")).data);\n    delete window.{stub};\n}} catch(e) {{\n    console.error('Bridge callback error:', e);\n}}"
    ))
}

/// Extract the percent-encoded envelope from a script built by [`callback_script`].
pub fn extract_encoded_reply(script: &str) -> Option<&str> {
    let start = script.find("decodeURIComponent(\"")? + "decodeURIComponent(\"".len();
    let len = script[start..].find('"')?;
    Some(&script[start..start + len])
}
