//! Session credentials.

/// The token set acquired by a completed login.
///
/// Immutable once built: the client stores it behind an `Arc` and hands a
/// clone to the poll task, so authenticated calls and the poll loop always
/// see a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Cookie-derived intermediate token (login stage 3). May be empty when
    /// the server withholds the cookie.
    pub ptwebqq: String,

    /// Verification token required by nearly all authenticated calls
    /// (stage 4).
    pub vfwebqq: String,

    /// Numeric account identifier, input to the signing hash (stage 5).
    pub uin: i64,

    /// Server-assigned session handle (stage 5).
    pub psessionid: String,
}

impl Session {
    /// The signing hash for list-fetching calls, derived from the account
    /// id and the `ptwebqq` token.
    #[must_use]
    pub fn signature(&self) -> String {
        webqq_core::hash::signature(self.uin, &self.ptwebqq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_uses_uin_and_ptwebqq() {
        let session = Session {
            ptwebqq: "ptwebqq-secret".to_owned(),
            vfwebqq: "vf".to_owned(),
            uin: 2_735_191_957,
            psessionid: "ps".to_owned(),
        };
        assert_eq!(session.signature(), "04E6144465F83ADE");
    }
}
