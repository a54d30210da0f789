use std::fmt;

/// 60 цифр: по 30 от каждой стороны, склеенные в отсортированном порядке,
/// поэтому обе стороны видят одну и ту же строку
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayableFingerprint {
    local: String,
    remote: String,
}

impl DisplayableFingerprint {
    pub(crate) fn new(local_fingerprint: &[u8], remote_fingerprint: &[u8]) -> Self {
        Self {
            local: display_string_for(local_fingerprint),
            remote: display_string_for(remote_fingerprint),
        }
    }

    pub fn display_text(&self) -> String {
        if self.local <= self.remote {
            format!("{}{}", self.local, self.remote)
        } else {
            format!("{}{}", self.remote, self.local)
        }
    }
}

impl fmt::Display for DisplayableFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

fn display_string_for(fingerprint: &[u8]) -> String {
    (0..30)
        .step_by(5)
        .map(|offset| format!("{:05}", encoded_chunk(fingerprint, offset)))
        .collect()
}

/// Big-endian 5 байт по смещению, mod 100000
fn encoded_chunk(hash: &[u8], offset: usize) -> u64 {
    let chunk = hash[offset..offset + 5]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    chunk % 100_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_chunk() {
        let hash = [0x00, 0x00, 0x01, 0x86, 0xA1];
        // 0x186A1 = 100001
        assert_eq!(encoded_chunk(&hash, 0), 1);
    }

    #[test]
    fn test_display_text_is_order_independent() {
        let a = [0x11u8; 32];
        let b = [0xEEu8; 32];

        let ours = DisplayableFingerprint::new(&a, &b);
        let theirs = DisplayableFingerprint::new(&b, &a);

        assert_eq!(ours.display_text(), theirs.display_text());
        assert_eq!(ours.display_text().len(), 60);
        assert!(ours.display_text().chars().all(|c| c.is_ascii_digit()));
    }
}
