//! Provider addressing helpers

/// Format a transfer target the way the provider expects it
///
/// With a SIP domain the number becomes `sip:<number>@<domain>`; without
/// one it becomes a `tel:` URI. Anything that already carries a host is
/// only given a `sip:` scheme if it lacks one.
pub fn format_transfer_destination(destination: &str, sip_domain: Option<&str>) -> String {
    if destination.contains('@') {
        if destination.starts_with("sip:") {
            return destination.to_string();
        }
        return format!("sip:{}", destination);
    }

    match sip_domain.filter(|domain| !domain.trim().is_empty()) {
        Some(domain) => {
            let number = destination.replace("tel:", "").replace("sip:", "");
            format!("sip:{}@{}", number, domain)
        }
        None if destination.starts_with("tel:") || destination.starts_with("sip:") => {
            destination.to_string()
        }
        None => format!("tel:{}", destination),
    }
}

/// Participant identity for the far end of a dialed number
pub fn participant_identity(number: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        "sip_unknown".to_string()
    } else {
        format!("sip_{}", digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_with_domain() {
        assert_eq!(
            format_transfer_destination("+15551234567", Some("abc.sip.vobiz.ai")),
            "sip:+15551234567@abc.sip.vobiz.ai"
        );
        assert_eq!(
            format_transfer_destination("tel:+15551234567", Some("abc.sip.vobiz.ai")),
            "sip:+15551234567@abc.sip.vobiz.ai"
        );
    }

    #[test]
    fn test_format_without_domain() {
        assert_eq!(format_transfer_destination("+15551234567", None), "tel:+15551234567");
        assert_eq!(format_transfer_destination("+15551234567", Some(" ")), "tel:+15551234567");
        assert_eq!(format_transfer_destination("tel:+15551234567", None), "tel:+15551234567");
    }

    #[test]
    fn test_format_keeps_existing_host() {
        assert_eq!(
            format_transfer_destination("agent@pbx.example.com", Some("other.example.com")),
            "sip:agent@pbx.example.com"
        );
        assert_eq!(
            format_transfer_destination("sip:agent@pbx.example.com", None),
            "sip:agent@pbx.example.com"
        );
    }

    #[test]
    fn test_participant_identity() {
        assert_eq!(participant_identity("+91 99887-76655"), "sip_919988776655");
        assert_eq!(participant_identity(""), "sip_unknown");
        assert_eq!(participant_identity("n/a"), "sip_unknown");
    }
}
