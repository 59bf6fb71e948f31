pub const IPFS_SCHEME: &str = "ipfs://";
pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Rewrite an `ipfs://<cid>` URI into a fetchable gateway URL.
///
/// Only a leading `ipfs://` is rewritten. Anything else (already-HTTP URLs,
/// bare CIDs, empty strings) is returned unchanged so callers always get a
/// usable value back.
pub fn gateway_url(uri: &str) -> String {
    match ipfs_path(uri) {
        Some(rest) => format!("{IPFS_GATEWAY}{rest}"),
        None => uri.to_string(),
    }
}

/// Everything after `ipfs://`, or `None` for any other scheme.
pub fn ipfs_path(uri: &str) -> Option<&str> {
    uri.strip_prefix(IPFS_SCHEME)
}

#[cfg(test)]
mod tests {
    use super::{gateway_url, ipfs_path, IPFS_GATEWAY};

    #[test]
    fn rewrites_ipfs_scheme_to_gateway() {
        assert_eq!(
            gateway_url("ipfs://bafybeigdyr/image.png"),
            "https://ipfs.io/ipfs/bafybeigdyr/image.png"
        );
    }

    #[test]
    fn keeps_remainder_after_scheme() {
        for rest in ["bafy", "bafy/nested/path.png", "", "a?b=c#frag"] {
            let out = gateway_url(&format!("ipfs://{rest}"));
            assert!(out.starts_with(IPFS_GATEWAY));
            assert_eq!(&out[IPFS_GATEWAY.len()..], rest);
        }
    }

    #[test]
    fn passes_through_other_uris() {
        assert_eq!(
            gateway_url("https://example.com/a.png"),
            "https://example.com/a.png"
        );
        assert_eq!(gateway_url("bafybeigdyr"), "bafybeigdyr");
        assert_eq!(gateway_url(""), "");
    }

    #[test]
    fn only_leading_scheme_is_rewritten() {
        assert_eq!(
            gateway_url("https://host/?next=ipfs://cid"),
            "https://host/?next=ipfs://cid"
        );
        assert_eq!(
            gateway_url("ipfs://cid/ipfs://again"),
            "https://ipfs.io/ipfs/cid/ipfs://again"
        );
    }

    #[test]
    fn splits_ipfs_path() {
        assert_eq!(ipfs_path("ipfs://cid/image.png"), Some("cid/image.png"));
        assert_eq!(ipfs_path("ipfs://"), Some(""));
        assert_eq!(ipfs_path("IPFS://cid"), None);
        assert_eq!(ipfs_path("https://ipfs.io/ipfs/cid"), None);
    }
}
