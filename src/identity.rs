use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const UNKNOWN_REQUESTER: &str = "unknown";

/// Derives the rate-limit bucketing key for a request. Total: always returns
/// something, never validates. Priority: authenticated identity header,
/// first proxy-forwarded address, transport peer address, sentinel.
pub fn requester_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(user) = extract_header(headers, "x-user-id") {
        return user;
    }
    if let Some(forwarded) = extract_header(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(peer) = peer {
        return peer.ip().to_string();
    }
    UNKNOWN_REQUESTER.to_string()
}

fn extract_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.1.2.3:55555".parse().expect("socket addr")
    }

    #[test]
    fn user_id_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "user-42".parse().unwrap());
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        assert_eq!(requester_key(&headers, Some(peer())), "user-42");
    }

    #[test]
    fn forwarded_for_takes_first_entry_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", " 1.2.3.4 , 5.6.7.8".parse().unwrap());
        assert_eq!(requester_key(&headers, Some(peer())), "1.2.3.4");
    }

    #[test]
    fn falls_back_to_peer_ip() {
        assert_eq!(requester_key(&HeaderMap::new(), Some(peer())), "10.1.2.3");
    }

    #[test]
    fn falls_back_to_sentinel_when_nothing_available() {
        assert_eq!(requester_key(&HeaderMap::new(), None), UNKNOWN_REQUESTER);
    }

    #[test]
    fn blank_headers_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "  ".parse().unwrap());
        headers.insert("x-forwarded-for", " ,5.6.7.8".parse().unwrap());
        assert_eq!(requester_key(&headers, None), UNKNOWN_REQUESTER);
    }
}
