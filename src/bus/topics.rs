//! Topic layout: `{base}/{device_id}/set` and `{base}/{device_id}/state`.

/// Control topic a device listens on.
pub fn control_topic(base: &str, device_id: &str) -> String {
    format!("{base}/{device_id}/set")
}

/// State topic a device reports on.
pub fn state_topic(base: &str, device_id: &str) -> String {
    format!("{base}/{device_id}/state")
}

/// Extract the device id from a control topic.
///
/// Only three-segment topics ending in `set` qualify; the broker-side
/// subscription filter is what pins the base segment.
pub fn parse_control_topic(topic: &str) -> Option<&str> {
    let mut parts = topic.split('/');
    let _base = parts.next()?;
    let device_id = parts.next()?;
    let verb = parts.next()?;
    if verb == "set" && parts.next().is_none() {
        Some(device_id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        assert_eq!(control_topic("homepage", "lamp1"), "homepage/lamp1/set");
        assert_eq!(state_topic("homepage", "lamp1"), "homepage/lamp1/state");
    }

    #[test]
    fn test_parse_control_topic() {
        assert_eq!(parse_control_topic("homepage/lamp1/set"), Some("lamp1"));
        assert_eq!(parse_control_topic("homepage/lamp1/get"), None);
        assert_eq!(parse_control_topic("homepage/lamp1/set/extra"), None);
        assert_eq!(parse_control_topic("lamp1/set"), None);
        assert_eq!(parse_control_topic("homepage/lamp1"), None);
    }
}
