use crate::digest::ContentHasher;
use crate::domain::Digest;

const SEPARATOR: char = '_';

/// Derives `feature_uid` values for one GFF3 file.
///
/// The uid is the digest of `seq_id`, `start`, `end`, `feature_type`, the
/// GFF3 file digest and, when present, the declared `ID`, joined with `_`.
/// It never depends on row order, so reruns over the same file agree, while
/// two different files never share a uid for the same coordinates.
#[derive(Debug, Clone)]
pub struct FeatureIdentityAssigner {
    file_digest: Digest,
}

impl FeatureIdentityAssigner {
    pub fn new(file_digest: Digest) -> Self {
        Self { file_digest }
    }

    pub fn file_digest(&self) -> &Digest {
        &self.file_digest
    }

    pub fn assign(
        &self,
        seq_id: &str,
        start: i64,
        end: i64,
        feature_type: &str,
        declared_id: Option<&str>,
    ) -> Digest {
        ContentHasher::digest_str(&identity_string(
            seq_id,
            start,
            end,
            feature_type,
            &self.file_digest,
            declared_id,
        ))
    }
}

pub fn identity_string(
    seq_id: &str,
    start: i64,
    end: i64,
    feature_type: &str,
    file_digest: &Digest,
    declared_id: Option<&str>,
) -> String {
    let mut identity =
        format!("{seq_id}{SEPARATOR}{start}{SEPARATOR}{end}{SEPARATOR}{feature_type}{SEPARATOR}{file_digest}");
    if let Some(declared) = declared_id.filter(|value| !value.is_empty()) {
        identity.push(SEPARATOR);
        identity.push_str(declared);
    }
    identity
}
